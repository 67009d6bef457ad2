// Error types for the 4B scoring engine
//
// This module defines coded error types for table ingestion, engine
// configuration and player calibration. The scoring path itself never fails;
// these errors surface only at the edges (parsing raw bytes, loading config,
// validating calibration overrides).

mod calibration;
mod config;
mod ingest;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use ingest::{log_ingest_error, IngestError, IngestErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling for callers
/// that persist or forward failures (the CLI, the fixture harness).
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
