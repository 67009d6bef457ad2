// PlayerCalibration - per-player coefficient overrides
//
// The calibration store upstream of the engine may know things a single
// session cannot: a player's fitted energy-to-speed coefficient, a radar
// baseline bat speed, or a coach's preferred dimension weighting. A record
// only overrides what it supplies; everything else stays at the engine
// configuration's value.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::validation::CalibrationValidator;
use crate::config::EngineConfig;
use crate::error::CalibrationError;
use crate::scoring::CompositeWeights;

/// Calibration overrides for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCalibration {
    pub player_id: String,
    /// Energy-to-bat-speed coefficient K
    #[serde(default)]
    pub speed_coefficient: Option<f64>,
    /// Measured bat speed used when a session has no delivered energy
    #[serde(default)]
    pub baseline_bat_speed_mph: Option<f64>,
    #[serde(default)]
    pub dimension_weights: Option<CompositeWeights>,
}

impl PlayerCalibration {
    /// Create a record with no overrides
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            speed_coefficient: None,
            baseline_bat_speed_mph: None,
            dimension_weights: None,
        }
    }

    /// Decode and validate a calibration record
    pub fn from_json(contents: &str) -> Result<Self, CalibrationError> {
        let calibration: PlayerCalibration =
            serde_json::from_str(contents).map_err(|err| CalibrationError::InvalidRecord {
                details: err.to_string(),
            })?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Load a calibration record from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibrationError> {
        let contents =
            fs::read_to_string(&path).map_err(|err| CalibrationError::InvalidRecord {
                details: format!("{}: {}", path.as_ref().display(), err),
            })?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<(), CalibrationError> {
        CalibrationValidator::validate(self)
    }

    /// Whether the record overrides anything at all
    pub fn is_empty(&self) -> bool {
        self.speed_coefficient.is_none()
            && self.baseline_bat_speed_mph.is_none()
            && self.dimension_weights.is_none()
    }

    /// Overlay the overrides on an engine configuration
    ///
    /// # Arguments
    /// * `config` - Configuration to modify in place
    ///
    /// # Returns
    /// * `Ok(())` - Overrides applied
    /// * `Err(CalibrationError)` - Record invalid; `config` is left untouched
    pub fn apply_to(&self, config: &mut EngineConfig) -> Result<(), CalibrationError> {
        self.validate()?;

        if let Some(k) = self.speed_coefficient {
            config.projection.speed_coefficient = k;
        }
        if let Some(baseline) = self.baseline_bat_speed_mph {
            config.projection.baseline_bat_speed_mph = Some(baseline);
        }
        if let Some(weights) = self.dimension_weights {
            config.weights = weights;
        }

        log::info!(
            "[Calibration] Applied overrides for player {} (k={:?}, baseline={:?}, weights={})",
            self.player_id,
            self.speed_coefficient,
            self.baseline_bat_speed_mph,
            self.dimension_weights.is_some()
        );
        Ok(())
    }
}
