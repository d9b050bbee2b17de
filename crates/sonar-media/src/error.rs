//! Error types for media operations.

use sonar_models::ErrorKind;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while downloading or analyzing audio.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("HTTP {status}: {url}")]
    NotFound { status: u16, url: String },

    #[error("Cannot connect to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a transport error.
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Client-visible kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) | Self::Decode(_) => ErrorKind::Validation,
            Self::Transport { .. } | Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}
