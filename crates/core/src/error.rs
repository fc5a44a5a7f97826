//! Core error types

use thiserror::Error;

/// Core error type for AutoRecon
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is missing a required key or carries an invalid value
    #[error("Config error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
