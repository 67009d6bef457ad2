// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 3001-3003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration record has no player id
    pub const MISSING_PLAYER_ID: i32 = 3001;

    /// A coefficient is outside its plausible range
    pub const INVALID_COEFFICIENT: i32 = 3002;

    /// Calibration JSON could not be parsed
    pub const INVALID_RECORD: i32 = 3003;
}

/// Log a calibration error with structured context
///
/// This function logs calibration errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=PlayerCalibration, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover per-player coefficient overrides supplied by the
/// upstream calibration store.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Player id is empty
    MissingPlayerId,

    /// Coefficient out of range
    InvalidCoefficient { field: String, reason: String },

    /// Record could not be decoded
    InvalidRecord { details: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::MissingPlayerId => CalibrationErrorCodes::MISSING_PLAYER_ID,
            CalibrationError::InvalidCoefficient { .. } => {
                CalibrationErrorCodes::INVALID_COEFFICIENT
            }
            CalibrationError::InvalidRecord { .. } => CalibrationErrorCodes::INVALID_RECORD,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::MissingPlayerId => "Calibration player id is empty".to_string(),
            CalibrationError::InvalidCoefficient { field, reason } => {
                format!("Invalid coefficient {}: {}", field, reason)
            }
            CalibrationError::InvalidRecord { details } => {
                format!("Invalid calibration record: {}", details)
            }
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(CalibrationError::MissingPlayerId.code(), 3001);
        assert_eq!(
            CalibrationError::InvalidCoefficient {
                field: "speed_coefficient".to_string(),
                reason: "must be > 0".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(
            CalibrationError::InvalidRecord {
                details: "eof".to_string()
            }
            .code(),
            3003
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::InvalidCoefficient {
            field: "baseline_bat_speed_mph".to_string(),
            reason: "must be within [20, 110]".to_string(),
        };
        assert_eq!(
            err.message(),
            "Invalid coefficient baseline_bat_speed_mph: must be within [20, 110]"
        );

        let err = CalibrationError::MissingPlayerId;
        assert!(err.message().contains("player id"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::MissingPlayerId;
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
