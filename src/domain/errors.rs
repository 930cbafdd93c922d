//! Domain errors for the switchyard routing pipeline.
//!
//! Only caller mistakes (an unknown domain or collection id, invalid input)
//! and local storage failures are meant to surface as hard errors. Everything a downstream model or store can do
//! wrong is mapped to a [`Degradation`](crate::domain::models::Degradation)
//! by the service that made the call.

use thiserror::Error;

/// Domain-level errors that can occur in the pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Call timed out after {0}ms")]
    Timeout(u64),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

impl DomainError {
    /// Whether this error is a caller/configuration mistake rather than a
    /// runtime failure of a downstream service.
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownDomain(_) | Self::UnknownCollection(_) | Self::ValidationFailed(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
