//! Error types for the remote store.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur while talking to the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote answered with a non-success status.
    #[error("remote returned status {status}: {message}")]
    Status {
        /// HTTP-style status code.
        status: u16,
        /// Message from the response body.
        message: String,
    },

    /// Response body could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Credential is missing or unreadable.
    #[error("credential error: {0}")]
    Credential(String),

    /// The requested database does not exist.
    #[error("database not found: {0}")]
    DatabaseNotFound(String),
}

impl RemoteError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Transport { retryable, .. } => *retryable,
            RemoteError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
