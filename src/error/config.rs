// Engine configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 2001-2004
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Config file could not be read
    pub const UNREADABLE: i32 = 2001;

    /// Config JSON did not match the schema
    pub const INVALID_JSON: i32 = 2002;

    /// Composite weights do not sum to one
    pub const INVALID_WEIGHTS: i32 = 2003;

    /// A numeric parameter is outside its allowed range
    pub const OUT_OF_RANGE: i32 = 2004;
}

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=EngineConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised when loading or validating an [`EngineConfig`](crate::config::EngineConfig)
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// File read failed
    Unreadable { path: String, details: String },

    /// JSON parse failed
    InvalidJson { details: String },

    /// Composite weights sum is not 1.0
    InvalidWeights { sum: f64 },

    /// Parameter outside the allowed range
    OutOfRange { field: String, value: f64 },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Unreadable { .. } => ConfigErrorCodes::UNREADABLE,
            ConfigError::InvalidJson { .. } => ConfigErrorCodes::INVALID_JSON,
            ConfigError::InvalidWeights { .. } => ConfigErrorCodes::INVALID_WEIGHTS,
            ConfigError::OutOfRange { .. } => ConfigErrorCodes::OUT_OF_RANGE,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Unreadable { path, details } => {
                format!("Failed to read config {}: {}", path, details)
            }
            ConfigError::InvalidJson { details } => format!("Invalid config JSON: {}", details),
            ConfigError::InvalidWeights { sum } => {
                format!("Composite weights must sum to 1.0 (got {:.4})", sum)
            }
            ConfigError::OutOfRange { field, value } => {
                format!("Config field {} out of range: {}", field, value)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::InvalidJson {
            details: err.to_string(),
        }
    }
}
