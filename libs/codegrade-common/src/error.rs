use thiserror::Error;

/// Error taxonomy for the grading pipeline.
///
/// Time and memory limit breaches are not errors; they are verdicts.
#[derive(Debug, Error)]
pub enum GraderError {
    /// Unknown language, missing template, malformed question or oversized input
    #[error("validation failed: {0}")]
    Validation(String),

    /// Judge unreachable, non-success response or unparsable payload
    #[error("judge service error: {0}")]
    ExternalService(String),

    #[error("{0} not found")]
    NotFound(String),

    /// Lifecycle precondition failed, e.g. scoring a completed interview
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraderError {
    /// Infrastructure failures whose details must not reach API clients
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            GraderError::ExternalService(_) | GraderError::Storage(_) | GraderError::Serialization(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, GraderError>;
