mod expression;
mod parse_predicate;
mod parse_projection;
mod path;
mod policies;
mod predicate;
mod projection;

pub use expression::{Expression, Positional, Slice, Variable};
pub use parse_predicate::{PredicateParseError, parse_predicate};
pub use parse_projection::{ProjectionParseError, parse_projection};
pub use path::{FieldPath, InvalidPath};
pub use policies::{ArrayRecursionPolicy, DefaultIdPolicy, ProjectionPolicies};
pub use predicate::Predicate;
pub use projection::{Projection, ProjectionFields, ProjectionNode, ProjectionType, SliceSpec};
