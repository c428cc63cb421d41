//! Error types for the task facade.

use thiserror::Error;

use taskwrap_service::ServiceError;

/// Errors that can occur in facade operations.
///
/// Only construction and commit surface errors; run, stop, delete, and the
/// convenience lookup downgrade failures to boolean or `Option` outcomes.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task name was empty at construction.
    #[error("task name must not be empty")]
    InvalidName,

    /// No task with the given name is registered and creation was not
    /// requested.
    #[error("no task named `{0}` is registered")]
    NotFound(String),

    /// The draft failed validation or the service rejected registration.
    #[error("failed to register task `{name}`: {source}")]
    Registration {
        name: String,
        #[source]
        source: ServiceError,
    },

    /// A mutating call was made after disposal.
    #[error("task `{0}` has been disposed")]
    Disposed(String),

    /// Service failure during construction.
    #[error("scheduling service error: {0}")]
    Service(#[from] ServiceError),
}
