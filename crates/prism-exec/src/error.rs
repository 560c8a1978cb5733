use prism_query::ProjectionParseError;

/// Errors raised while compiling a projection executor.
///
/// Applying an executor never fails; shape mismatches in documents degrade to
/// missing fields or pass-through instead.
#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("root replacement expression must produce a document, got {0}")]
    InvalidRootReplacement(String),
    #[error("invalid projection: {0}")]
    InvalidProjection(String),
    #[error(transparent)]
    Parse(#[from] ProjectionParseError),
}
