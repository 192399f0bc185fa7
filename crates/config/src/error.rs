//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize configuration
    #[error("Failed to serialize config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A duration that must be positive is zero
    #[error("Invalid duration: {name} must be positive, got {value}ms")]
    InvalidDuration {
        /// Field name
        name: &'static str,
        /// Configured value
        value: u64,
    },

    /// A count that must be positive is zero
    #[error("Invalid value: {0} must be at least 1")]
    ZeroValue(&'static str),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid log level
    #[error("Invalid log level: {0}. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0}. Valid values: json, pretty, compact")]
    InvalidLogFormat(String),

    /// The global tracing subscriber could not be installed
    #[error("Failed to initialise logging: {0}")]
    LoggingInit(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
