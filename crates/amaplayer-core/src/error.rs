//! Error types for amaplayer-core.

use thiserror::Error;

/// Result type alias using amaplayer-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for backend operations
#[derive(Error, Debug)]
pub enum Error {
    // Auth errors
    #[error("User not authenticated")]
    NotAuthenticated,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    // Transport errors
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a non-success HTTP response
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// Whether the failure is about the caller's identity rather than the request.
    ///
    /// Identity failures are never retried.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::PermissionDenied(_))
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
