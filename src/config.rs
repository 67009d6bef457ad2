//! Versioned engine configuration
//!
//! Every coaching parameter the engine uses (threshold bands, composite
//! weights, leak thresholds and captions, level clamps, segmentation
//! fractions) lives in [`EngineConfig`] rather than in module constants, so
//! tuning never requires a code change. Configuration loads from JSON; any
//! omitted section falls back to its default.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::analysis::features::AngleUnitPolicy;
use crate::analysis::leak::LeakConfig;
use crate::error::ConfigError;
use crate::prediction::projection::ProjectionConfig;
use crate::prediction::sensor::SensorConfig;
use crate::scoring::composite::CompositeWeights;
use crate::scoring::normalizer::ThresholdTable;

/// Version tag stamped on every score object produced with the defaults.
pub const CONFIG_VERSION: &str = "4b-engine/2024.3";

/// Default config location for the CLI.
pub const DEFAULT_CONFIG_PATH: &str = "assets/engine_config.json";

static SHARED_DEFAULT: Lazy<EngineConfig> = Lazy::new(EngineConfig::default);

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version: String,
    pub ingest: IngestConfig,
    pub segmentation: SegmentationConfig,
    pub features: FeatureConfig,
    pub aggregation: AggregationConfig,
    pub thresholds: ThresholdTable,
    pub weights: CompositeWeights,
    pub leak: LeakConfig,
    pub projection: ProjectionConfig,
    pub sensor: SensorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            ingest: IngestConfig::default(),
            segmentation: SegmentationConfig::default(),
            features: FeatureConfig::default(),
            aggregation: AggregationConfig::default(),
            thresholds: ThresholdTable::default(),
            weights: CompositeWeights::default(),
            leak: LeakConfig::default(),
            projection: ProjectionConfig::default(),
            sensor: SensorConfig::default(),
        }
    }
}

/// How unparsable numeric cells are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicy {
    /// Replace the cell with 0.0 and count it
    CoerceZero,
    /// Drop the whole row and count it
    DropRow,
}

/// Frame table normalizer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub parse_policy: ParsePolicy,
    /// Sample rate used to synthesise a time axis when the export has none
    pub default_sample_rate_hz: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parse_policy: ParsePolicy::CoerceZero,
            default_sample_rate_hz: 240.0,
        }
    }
}

/// Swing segmenter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Tracks shorter than this are discarded before feature extraction
    pub min_swing_frames: usize,
    /// Contact candidates earlier than this fraction of the track are rejected
    pub implausible_fraction: f64,
    /// Stride frame fallback as a fraction of the track
    pub stride_fraction: f64,
    /// Terminal contact fallback as a fraction of the track
    pub contact_fraction: f64,
    /// Contact is the first frame below this fraction of peak hand/bat speed
    pub deceleration_ratio: f64,
    /// Torso-peak contact estimate multiplier
    pub torso_nudge: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_swing_frames: 10,
            implausible_fraction: 0.40,
            stride_fraction: 0.20,
            contact_fraction: 0.80,
            deceleration_ratio: 0.88,
            torso_nudge: 1.05,
        }
    }
}

/// Feature extractor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub angle_units: AngleUnitPolicy,
    /// Angle channels peaking below this magnitude are read as radians
    pub radian_peak_limit: f64,
    /// Percentile used for segment energies inside the swing window
    pub energy_percentile: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            angle_units: AngleUnitPolicy::Auto,
            radian_peak_limit: 8.0,
            energy_percentile: 95.0,
        }
    }
}

/// Session aggregator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Minimum swings before any CV-based score is computed
    pub min_swings_for_variance: usize,
    /// A swing's bat energy counts as measured at or above this value (J)
    pub meaningful_bat_energy_j: f64,
    /// Fraction of swings with measured bat energy needed to trust it
    pub bat_coverage_min_fraction: f64,
    /// Arm-to-bat transfer ratio used for the delivered-energy proxy
    pub arm_transfer_ratio: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            min_swings_for_variance: 3,
            meaningful_bat_energy_j: 5.0,
            bat_coverage_min_fraction: 0.5,
            arm_transfer_ratio: 0.65,
        }
    }
}

/// Competitive level used to select clamp tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerLevel {
    Youth,
    HighSchool,
    College,
    Pro,
}

impl PlayerLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerLevel::Youth => "youth",
            PlayerLevel::HighSchool => "high_school",
            PlayerLevel::College => "college",
            PlayerLevel::Pro => "pro",
        }
    }
}

impl Default for PlayerLevel {
    fn default() -> Self {
        PlayerLevel::HighSchool
    }
}

impl fmt::Display for PlayerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlayerLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "youth" | "youthbaseball" | "littleleague" | "ll" | "12u" | "14u" => {
                Ok(PlayerLevel::Youth)
            }
            "hs" | "highschool" | "high" | "varsity" => Ok(PlayerLevel::HighSchool),
            "college" | "ncaa" | "collegiate" | "d1" => Ok(PlayerLevel::College),
            "pro" | "professional" | "milb" | "mlb" => Ok(PlayerLevel::Pro),
            _ => Err(format!("unknown player level '{}'", s)),
        }
    }
}

impl EngineConfig {
    /// Shared default configuration
    pub fn shared_default() -> &'static EngineConfig {
        &SHARED_DEFAULT
    }

    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults when the file is missing,
    /// unparsable or fails validation (a warning is logged in each case)
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load(&path) {
            Ok(config) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                config
            }
            Err(err) => {
                log::warn!(
                    "[Config] Failed to load {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load and validate configuration, surfacing every failure
    pub fn try_load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|err| ConfigError::Unreadable {
            path: path.as_ref().display().to_string(),
            details: err.to_string(),
        })?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string and validate it
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration for the CLI from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;

        let seg = &self.segmentation;
        if seg.min_swing_frames < 3 {
            return Err(out_of_range(
                "segmentation.min_swing_frames",
                seg.min_swing_frames as f64,
            ));
        }
        for (field, value) in [
            ("segmentation.implausible_fraction", seg.implausible_fraction),
            ("segmentation.stride_fraction", seg.stride_fraction),
            ("segmentation.contact_fraction", seg.contact_fraction),
            ("segmentation.deceleration_ratio", seg.deceleration_ratio),
            ("aggregation.bat_coverage_min_fraction", self.aggregation.bat_coverage_min_fraction),
            ("aggregation.arm_transfer_ratio", self.aggregation.arm_transfer_ratio),
            ("projection.target_efficiency", self.projection.target_efficiency),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(out_of_range(field, value));
            }
        }
        if seg.stride_fraction >= seg.contact_fraction {
            return Err(out_of_range(
                "segmentation.stride_fraction",
                seg.stride_fraction,
            ));
        }
        if !(seg.torso_nudge >= 1.0 && seg.torso_nudge < 2.0) {
            return Err(out_of_range("segmentation.torso_nudge", seg.torso_nudge));
        }
        if !(self.features.energy_percentile > 0.0 && self.features.energy_percentile <= 100.0) {
            return Err(out_of_range(
                "features.energy_percentile",
                self.features.energy_percentile,
            ));
        }
        if !(self.features.radian_peak_limit > 0.0) {
            return Err(out_of_range(
                "features.radian_peak_limit",
                self.features.radian_peak_limit,
            ));
        }
        if self.aggregation.min_swings_for_variance < 2 {
            return Err(out_of_range(
                "aggregation.min_swings_for_variance",
                self.aggregation.min_swings_for_variance as f64,
            ));
        }
        if !(self.ingest.default_sample_rate_hz > 0.0) {
            return Err(out_of_range(
                "ingest.default_sample_rate_hz",
                self.ingest.default_sample_rate_hz,
            ));
        }
        if !(self.projection.speed_coefficient > 0.0) {
            return Err(out_of_range(
                "projection.speed_coefficient",
                self.projection.speed_coefficient,
            ));
        }
        if self.projection.min_severe_gap_mph < 0.0 {
            return Err(out_of_range(
                "projection.min_severe_gap_mph",
                self.projection.min_severe_gap_mph,
            ));
        }
        self.projection.levels.validate()?;
        self.thresholds.validate()?;
        Ok(())
    }
}

fn out_of_range(field: &str, value: f64) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.segmentation.min_swing_frames, 10);
        assert_eq!(config.aggregation.min_swings_for_variance, 3);
        assert_eq!(config.features.energy_percentile, 95.0);
        assert_eq!(config.weights.body, 0.35);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed =
            EngineConfig::from_json(r#"{"segmentation": {"min_swing_frames": 20}}"#).unwrap();
        assert_eq!(parsed.segmentation.min_swing_frames, 20);
        assert_eq!(parsed.segmentation.contact_fraction, 0.80);
        assert_eq!(parsed.weights, CompositeWeights::default());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let err = EngineConfig::from_json(
            r#"{"weights": {"body": 0.5, "bat": 0.5, "brain": 0.5, "ball": 0.5}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWeights { .. }));
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        let mut config = EngineConfig::default();
        config.segmentation.implausible_fraction = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_load_from_missing_file_falls_back() {
        let config = EngineConfig::load_from_file("/definitely/not/here.json");
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_try_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"projection": {{"speed_coefficient": 3.8}}}}"#).unwrap();
        let config = EngineConfig::try_load(file.path()).unwrap();
        assert_eq!(config.projection.speed_coefficient, 3.8);
    }

    #[test]
    fn test_player_level_parsing() {
        assert_eq!("HS".parse::<PlayerLevel>(), Ok(PlayerLevel::HighSchool));
        assert_eq!("high-school".parse::<PlayerLevel>(), Ok(PlayerLevel::HighSchool));
        assert_eq!("MLB".parse::<PlayerLevel>(), Ok(PlayerLevel::Pro));
        assert_eq!("youth".parse::<PlayerLevel>(), Ok(PlayerLevel::Youth));
        assert!("beer league".parse::<PlayerLevel>().is_err());
        assert_eq!(PlayerLevel::College.to_string(), "college");
    }
}
