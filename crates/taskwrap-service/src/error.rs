//! Error types for the scheduling-service boundary.

use thiserror::Error;

/// Errors reported by a scheduling service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The definition failed structural validation.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// No job is registered under the given name.
    #[error("no job named `{0}`")]
    NotFound(String),

    /// The service refused the operation.
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// The service could not be reached or is in a bad state.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}
