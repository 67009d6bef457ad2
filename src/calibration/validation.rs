// Calibration record validation
//
// Per-player overrides arrive from an external calibration store. Each
// supplied coefficient is range-checked before it is allowed to touch the
// engine configuration.

use super::state::PlayerCalibration;
use crate::error::{CalibrationError, ErrorCode};

/// Plausible range for the energy-to-speed coefficient K
pub const SPEED_COEFFICIENT_RANGE: (f64, f64) = (0.5, 10.0);

/// Plausible range for a measured baseline bat speed (mph)
pub const BASELINE_BAT_SPEED_RANGE: (f64, f64) = (20.0, 120.0);

/// Validator for player calibration records
pub struct CalibrationValidator;

impl CalibrationValidator {
    /// Validate a calibration record
    ///
    /// # Arguments
    /// * `calibration` - Record to validate
    ///
    /// # Returns
    /// * `Ok(())` - Every supplied override is usable
    /// * `Err(CalibrationError)` - First failing field
    ///
    /// # Validation Rules
    /// * Player id must be non-blank
    /// * `speed_coefficient` must be finite and within [0.5, 10]
    /// * `baseline_bat_speed_mph` must be finite and within [20, 120]
    /// * `dimension_weights` must be non-negative and sum to 1
    pub fn validate(calibration: &PlayerCalibration) -> Result<(), CalibrationError> {
        if calibration.player_id.trim().is_empty() {
            return Err(CalibrationError::MissingPlayerId);
        }

        if let Some(k) = calibration.speed_coefficient {
            check_range("speed_coefficient", k, SPEED_COEFFICIENT_RANGE)?;
        }

        if let Some(baseline) = calibration.baseline_bat_speed_mph {
            check_range("baseline_bat_speed_mph", baseline, BASELINE_BAT_SPEED_RANGE)?;
        }

        if let Some(weights) = &calibration.dimension_weights {
            weights
                .validate()
                .map_err(|err| CalibrationError::InvalidCoefficient {
                    field: "dimension_weights".to_string(),
                    reason: err.message(),
                })?;
        }

        Ok(())
    }
}

fn check_range(field: &str, value: f64, (min, max): (f64, f64)) -> Result<(), CalibrationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(CalibrationError::InvalidCoefficient {
            field: field.to_string(),
            reason: format!("{} out of range [{}, {}]", value, min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::CompositeWeights;

    fn record() -> PlayerCalibration {
        PlayerCalibration::new("player-7")
    }

    #[test]
    fn test_validate_empty_overrides() {
        assert!(CalibrationValidator::validate(&record()).is_ok());
    }

    #[test]
    fn test_validate_missing_player_id() {
        let calibration = PlayerCalibration::new("  ");
        assert_eq!(
            CalibrationValidator::validate(&calibration),
            Err(CalibrationError::MissingPlayerId)
        );
    }

    #[test]
    fn test_validate_speed_coefficient_range() {
        let mut calibration = record();
        calibration.speed_coefficient = Some(3.8);
        assert!(CalibrationValidator::validate(&calibration).is_ok());

        calibration.speed_coefficient = Some(0.0);
        match CalibrationValidator::validate(&calibration).unwrap_err() {
            CalibrationError::InvalidCoefficient { field, reason } => {
                assert_eq!(field, "speed_coefficient");
                assert!(reason.contains("out of range"));
            }
            other => panic!("Expected InvalidCoefficient, got {:?}", other),
        }

        calibration.speed_coefficient = Some(f64::NAN);
        assert!(CalibrationValidator::validate(&calibration).is_err());
    }

    #[test]
    fn test_validate_baseline_range() {
        let mut calibration = record();
        calibration.baseline_bat_speed_mph = Some(150.0);
        assert!(CalibrationValidator::validate(&calibration).is_err());
        calibration.baseline_bat_speed_mph = Some(68.0);
        assert!(CalibrationValidator::validate(&calibration).is_ok());
    }

    #[test]
    fn test_validate_weights() {
        let mut calibration = record();
        calibration.dimension_weights = Some(CompositeWeights {
            body: 0.4,
            bat: 0.4,
            brain: 0.1,
            ball: 0.1,
        });
        assert!(CalibrationValidator::validate(&calibration).is_ok());

        calibration.dimension_weights = Some(CompositeWeights {
            body: 0.4,
            bat: 0.4,
            brain: 0.4,
            ball: 0.1,
        });
        match CalibrationValidator::validate(&calibration).unwrap_err() {
            CalibrationError::InvalidCoefficient { field, .. } => {
                assert_eq!(field, "dimension_weights")
            }
            other => panic!("Expected InvalidCoefficient, got {:?}", other),
        }
    }
}
