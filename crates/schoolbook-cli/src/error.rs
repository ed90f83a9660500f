//! Error types for the schoolbook CLI

use schoolbook::observability::ObservabilityError;
use schoolbook::server::ServerError;
use schoolbook::{ConfigError, JwtSecretError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be initialized
    #[error("{0}")]
    Logging(#[from] ObservabilityError),

    /// The server failed to start or stopped with an error
    #[error("{0}")]
    Server(#[from] ServerError),

    /// Async runtime could not be built
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Generated or supplied secret does not satisfy the policy
    #[error("Secret rejected: {0}")]
    Secret(#[from] JwtSecretError),

    /// Invalid command-line value
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create an invalid value error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
