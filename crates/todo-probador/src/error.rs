//! Error types for the CLI

use thiserror::Error;
use todo_probar::ProbeError;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Harness error (configuration, login, transport, ...)
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// One or more scenarios failed
    #[error("{failed} of {total} scenarios failed")]
    SuiteFailed {
        /// Failed scenario count
        failed: usize,
        /// Total scenario count
        total: usize,
    },

    /// A load run did not meet its thresholds
    #[error("Load profile {profile} did not pass: {reason}")]
    LoadFailed {
        /// Profile name
        profile: String,
        /// What went wrong
        reason: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Async runtime could not start
    #[error("Failed to create async runtime: {0}")]
    Runtime(String),
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_is_transparent() {
        let err = CliError::from(ProbeError::config("BASE_URL is not defined"));
        assert_eq!(
            err.to_string(),
            "Configuration error: BASE_URL is not defined"
        );
    }

    #[test]
    fn test_suite_failed_message() {
        let err = CliError::SuiteFailed {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 scenarios failed");
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CliError = io.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
