//! Result and error types for the harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for harness operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the ToDo service
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Required configuration is missing or invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// The persisted token could not be used
    #[error("Authentication token not found at {path}. Run the login step first. Details: {reason}")]
    TokenUnavailable {
        /// Token file path
        path: PathBuf,
        /// Why the token could not be read
        reason: String,
    },

    /// Login call did not produce a token
    #[error("Login failed with status {status}: {message}")]
    LoginFailed {
        /// HTTP status code (0 when no response was received)
        status: u16,
        /// Error message
        message: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A step received a status it did not expect
    #[error("[{step}] expected status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        /// Step that issued the request
        step: String,
        /// Human-readable expectation
        expected: String,
        /// Actual status code
        actual: u16,
        /// Response body (truncated)
        body: String,
    },

    /// The service answered with a 5xx status
    #[error("[{step}] server error status {status}")]
    ServerError {
        /// Step that issued the request
        step: String,
        /// Actual status code
        status: u16,
    },

    /// A response-body invariant did not hold
    #[error("[{step}] assertion failed: {message}")]
    AssertionFailed {
        /// Step that performed the check
        step: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("[{step}] timed out after {ms}ms")]
    Timeout {
        /// Step or scenario that timed out
        step: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Load profile is malformed
    #[error("Invalid load profile: {message}")]
    InvalidProfile {
        /// Error message
        message: String,
    },
}

impl ProbeError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an assertion failure attributed to a step
    #[must_use]
    pub fn assertion(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            step: step.into(),
            message: message.into(),
        }
    }

    /// Create a token error for the given path
    #[must_use]
    pub fn token_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::TokenUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid profile error
    #[must_use]
    pub fn invalid_profile(message: impl Into<String>) -> Self {
        Self::InvalidProfile {
            message: message.into(),
        }
    }

    /// Whether this error means a precondition of the run is missing,
    /// as opposed to the service misbehaving.
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::TokenUnavailable { .. } | Self::LoginFailed { .. }
        )
    }

    /// Step name this error is attributed to, if any
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::UnexpectedStatus { step, .. }
            | Self::ServerError { step, .. }
            | Self::AssertionFailed { step, .. }
            | Self::Timeout { step, .. } => Some(step.as_str()),
            _ => None,
        }
    }
}
