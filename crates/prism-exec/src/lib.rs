mod deps;
mod error;
mod executor;
pub mod expression;
mod matcher;
mod modified_paths;
pub mod path;
mod value;

pub use bson::{Bson, Document};
pub use deps::DepsTracker;
pub use error::ProjectionError;
pub use executor::{
    ProjectionExecutor, ProjectionExecutorBuilder, build_projection_executor, compile_projection,
};
pub use expression::{EvalContext, Variables};
pub use matcher::matches;
pub use modified_paths::ModifiedPaths;
pub use value::Value;
