//! SDK Error Types
//!
//! Defines error types for the AmaPlayer SDK.

use thiserror::Error;

use crate::utils::ValidationError;

/// SDK Result type alias
pub type SDKResult<T> = Result<T, SDKError>;

/// SDK errors
#[derive(Debug, Error)]
pub enum SDKError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Config file could not be parsed
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Invalid input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No signed-in user; never retried
    #[error("User not authenticated")]
    NotAuthenticated,

    /// Remote call failed in a way that may succeed on retry
    #[error("transient remote failure: {message}")]
    TransientRemoteFailure { message: String },

    /// Retry budget spent
    #[error("failed after {attempts} attempts: {message}")]
    ExhaustedRetries { attempts: u32, message: String },

    /// Backend error from amaplayer-core
    #[error("backend error: {0}")]
    Core(#[from] amaplayer_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SDKError {
    /// Classify a failed remote call
    pub fn from_remote(err: amaplayer_core::Error) -> Self {
        if err.is_auth_failure() {
            Self::NotAuthenticated
        } else {
            Self::TransientRemoteFailure {
                message: err.to_string(),
            }
        }
    }

    /// Create an exhausted-retries error
    pub fn exhausted(attempts: u32, message: impl Into<String>) -> Self {
        Self::ExhaustedRetries {
            attempts,
            message: message.into(),
        }
    }

    /// Whether the retry policy applies to this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientRemoteFailure { .. })
    }

    /// Check if this error is an authentication error
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }

    /// Underlying cause, without the classification prefix.
    pub fn cause(&self) -> String {
        match self {
            Self::TransientRemoteFailure { message } | Self::ExhaustedRetries { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
