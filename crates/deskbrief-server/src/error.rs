//! Server-side error types.

use std::io;

use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors raised at the transport boundary.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (session records, credential files).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ServerError::config("missing signing key");
        assert!(format!("{}", err).contains("missing signing key"));
    }

    #[test]
    fn io_error_converts() {
        let err: ServerError = io::Error::other("disk full").into();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
