//! Error types for core identifiers and configuration

use thiserror::Error;

/// Main error type for the core crate
#[derive(Error, Debug)]
pub enum CoreError {
    /// Caller or party identity could not be parsed
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Account identifier could not be parsed
    #[error("Invalid account id: {0}")]
    InvalidAccountId(#[from] uuid::Error),

    /// Settings could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl CoreError {
    /// Create an invalid identity error
    pub fn invalid_identity<S: Into<String>>(msg: S) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
