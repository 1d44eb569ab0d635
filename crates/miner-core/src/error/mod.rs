//! Error types and result aliases for npm-miner operations.
//!
//! Provides a unified error type that covers all possible error conditions
//! across the miner with actionable error messages.

use miner_queue::QueueError;
use thiserror::Error;

/// Unified error type for all npm-miner operations
#[derive(Error, Debug)]
pub enum MinerError {
    // Config errors
    #[error("Failed to parse miner.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Input errors
    #[error("Failed to parse {what}: {message}")]
    JsonParse { what: String, message: String },

    // Registry errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Queue errors
    #[error("Request queue error: {0}")]
    Queue(#[from] QueueError),

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for npm-miner operations
pub type MinerResult<T> = Result<T, MinerError>;

impl MinerError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is worth retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MinerError::Network { .. } | MinerError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            MinerError::TomlParse { .. } => Some("Fix the syntax error in miner.toml and try again"),
            MinerError::ConfigValidation { .. } => {
                Some("Run 'npm-miner check-config' to see the effective configuration")
            },
            MinerError::JsonParse { .. } => {
                Some("Names files are either one package name per line or a JSON array of strings")
            },
            MinerError::Network { .. } => Some("Check your internet connection and try again"),
            MinerError::Queue(QueueError::InvalidPolicy { .. }) => {
                Some("Check the [retry] section of miner.toml")
            },
            _ => None,
        }
    }
}
