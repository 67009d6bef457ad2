// Threshold normalizer - raw aggregate to 20-80 scouting scale
//
// Each scored metric owns a (min, max, invert) band. The raw value is
// clamped into the band, optionally inverted for lower-is-better metrics,
// and mapped linearly onto 20..=80:
//
//   normalized = clamp((value - min) / (max - min), 0, 1)
//   score      = round(20 + normalized * 60)
//
// A degenerate band (min == max) returns the midpoint score.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lowest display score
pub const SCORE_MIN: u8 = 20;
/// Highest display score
pub const SCORE_MAX: u8 = 80;
/// Neutral display score used for gated and unavailable metrics
pub const NEUTRAL_SCORE: u8 = 50;

/// Every metric that has a threshold band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    PelvisVelocity,
    TorsoVelocity,
    Separation,
    SeparationRate,
    LegsEnergy,
    ArmsEnergy,
    DeliveredEnergy,
    DeliveryEfficiency,
    PelvisVelocityCv,
    TorsoVelocityCv,
    SwingDurationCv,
    DeliveredEnergyCv,
    SequenceRate,
    ReleaseRatio,
    ContactTimeCv,
    BatSpeedCv,
    UpstreamContribution,
}

impl MetricKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::PelvisVelocity => "pelvis_velocity",
            MetricKey::TorsoVelocity => "torso_velocity",
            MetricKey::Separation => "separation",
            MetricKey::SeparationRate => "separation_rate",
            MetricKey::LegsEnergy => "legs_energy",
            MetricKey::ArmsEnergy => "arms_energy",
            MetricKey::DeliveredEnergy => "delivered_energy",
            MetricKey::DeliveryEfficiency => "delivery_efficiency",
            MetricKey::PelvisVelocityCv => "pelvis_velocity_cv",
            MetricKey::TorsoVelocityCv => "torso_velocity_cv",
            MetricKey::SwingDurationCv => "swing_duration_cv",
            MetricKey::DeliveredEnergyCv => "delivered_energy_cv",
            MetricKey::SequenceRate => "sequence_rate",
            MetricKey::ReleaseRatio => "release_ratio",
            MetricKey::ContactTimeCv => "contact_time_cv",
            MetricKey::BatSpeedCv => "bat_speed_cv",
            MetricKey::UpstreamContribution => "upstream_contribution",
        }
    }

    /// Whether the metric is a coefficient of variation (needs enough swings)
    pub fn is_variability(self) -> bool {
        matches!(
            self,
            MetricKey::PelvisVelocityCv
                | MetricKey::TorsoVelocityCv
                | MetricKey::SwingDurationCv
                | MetricKey::DeliveredEnergyCv
                | MetricKey::ContactTimeCv
                | MetricKey::BatSpeedCv
        )
    }
}

/// Threshold band for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBand {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub invert: bool,
}

impl MetricBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            invert: false,
        }
    }

    pub const fn inverted(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            invert: true,
        }
    }

    /// Position of `value` inside the band on 0..=1, after inversion
    ///
    /// Returns `None` for a degenerate band or a non-finite value.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || self.max == self.min {
            return None;
        }
        let fraction = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        Some(if self.invert { 1.0 - fraction } else { fraction })
    }

    /// 20-80 score for a raw value
    pub fn score(&self, value: f64) -> u8 {
        if !value.is_finite() {
            return NEUTRAL_SCORE;
        }
        match self.normalize(value) {
            Some(fraction) => to_display_score(fraction),
            None => NEUTRAL_SCORE,
        }
    }
}

/// Map a 0..=1 fraction onto 20..=80
pub fn to_display_score(fraction: f64) -> u8 {
    let score = (20.0 + fraction.clamp(0.0, 1.0) * 60.0).round();
    (score as u8).clamp(SCORE_MIN, SCORE_MAX)
}

/// Versioned table of metric bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    pub version: String,
    /// Peak pelvis angular velocity (deg/s)
    pub pelvis_velocity: MetricBand,
    /// Peak torso angular velocity (deg/s)
    pub torso_velocity: MetricBand,
    /// Peak torso-pelvis separation (deg)
    pub separation: MetricBand,
    /// Peak separation rate (deg/s)
    pub separation_rate: MetricBand,
    /// Legs kinetic energy p95 (J)
    pub legs_energy: MetricBand,
    /// Arms kinetic energy p95 (J)
    pub arms_energy: MetricBand,
    /// Energy delivered to the bat (J)
    pub delivered_energy: MetricBand,
    /// Delivered / total energy (%)
    pub delivery_efficiency: MetricBand,
    pub pelvis_velocity_cv: MetricBand,
    pub torso_velocity_cv: MetricBand,
    pub swing_duration_cv: MetricBand,
    pub delivered_energy_cv: MetricBand,
    /// Proper-sequence rate (%)
    pub sequence_rate: MetricBand,
    /// Bat speed / hand speed
    pub release_ratio: MetricBand,
    pub contact_time_cv: MetricBand,
    pub bat_speed_cv: MetricBand,
    /// Estimated lower-body shortfall (mph, lower is better)
    pub upstream_contribution: MetricBand,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            version: "thresholds/2024.3".to_string(),
            pelvis_velocity: MetricBand::new(300.0, 800.0),
            torso_velocity: MetricBand::new(500.0, 1200.0),
            separation: MetricBand::new(10.0, 60.0),
            separation_rate: MetricBand::new(200.0, 1200.0),
            legs_energy: MetricBand::new(100.0, 600.0),
            arms_energy: MetricBand::new(50.0, 300.0),
            delivered_energy: MetricBand::new(150.0, 600.0),
            delivery_efficiency: MetricBand::new(20.0, 60.0),
            pelvis_velocity_cv: MetricBand::inverted(3.0, 20.0),
            torso_velocity_cv: MetricBand::inverted(3.0, 20.0),
            swing_duration_cv: MetricBand::inverted(3.0, 20.0),
            delivered_energy_cv: MetricBand::inverted(5.0, 30.0),
            sequence_rate: MetricBand::new(20.0, 100.0),
            release_ratio: MetricBand::new(2.2, 3.4),
            contact_time_cv: MetricBand::inverted(3.0, 20.0),
            bat_speed_cv: MetricBand::inverted(2.0, 12.0),
            upstream_contribution: MetricBand::inverted(0.0, 5.0),
        }
    }
}

impl ThresholdTable {
    pub fn band(&self, key: MetricKey) -> &MetricBand {
        match key {
            MetricKey::PelvisVelocity => &self.pelvis_velocity,
            MetricKey::TorsoVelocity => &self.torso_velocity,
            MetricKey::Separation => &self.separation,
            MetricKey::SeparationRate => &self.separation_rate,
            MetricKey::LegsEnergy => &self.legs_energy,
            MetricKey::ArmsEnergy => &self.arms_energy,
            MetricKey::DeliveredEnergy => &self.delivered_energy,
            MetricKey::DeliveryEfficiency => &self.delivery_efficiency,
            MetricKey::PelvisVelocityCv => &self.pelvis_velocity_cv,
            MetricKey::TorsoVelocityCv => &self.torso_velocity_cv,
            MetricKey::SwingDurationCv => &self.swing_duration_cv,
            MetricKey::DeliveredEnergyCv => &self.delivered_energy_cv,
            MetricKey::SequenceRate => &self.sequence_rate,
            MetricKey::ReleaseRatio => &self.release_ratio,
            MetricKey::ContactTimeCv => &self.contact_time_cv,
            MetricKey::BatSpeedCv => &self.bat_speed_cv,
            MetricKey::UpstreamContribution => &self.upstream_contribution,
        }
    }

    /// Bands must be finite; min == max is allowed (scores the midpoint)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = [
            MetricKey::PelvisVelocity,
            MetricKey::TorsoVelocity,
            MetricKey::Separation,
            MetricKey::SeparationRate,
            MetricKey::LegsEnergy,
            MetricKey::ArmsEnergy,
            MetricKey::DeliveredEnergy,
            MetricKey::DeliveryEfficiency,
            MetricKey::PelvisVelocityCv,
            MetricKey::TorsoVelocityCv,
            MetricKey::SwingDurationCv,
            MetricKey::DeliveredEnergyCv,
            MetricKey::SequenceRate,
            MetricKey::ReleaseRatio,
            MetricKey::ContactTimeCv,
            MetricKey::BatSpeedCv,
            MetricKey::UpstreamContribution,
        ];
        for key in keys {
            let band = self.band(key);
            if !band.min.is_finite() || !band.max.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field: format!("thresholds.{}", key.as_str()),
                    value: if band.min.is_finite() { band.max } else { band.min },
                });
            }
            if band.min > band.max {
                return Err(ConfigError::OutOfRange {
                    field: format!("thresholds.{}.min", key.as_str()),
                    value: band.min,
                });
            }
        }
        Ok(())
    }
}

/// How a component score was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Computed from data
    Scored,
    /// Withheld because too few swings; neutral score
    Gated,
    /// Input channel missing; neutral score, excluded from flow averages
    Unavailable,
}

/// One normalized sub-score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub metric: MetricKey,
    pub raw: Option<f64>,
    pub band: MetricBand,
    /// 0..=100 position inside the band
    pub internal: f64,
    /// 20..=80 display score
    pub score: u8,
    pub status: ComponentStatus,
}

/// Applies a [`ThresholdTable`] to raw aggregates
pub struct ThresholdNormalizer<'a> {
    table: &'a ThresholdTable,
}

impl<'a> ThresholdNormalizer<'a> {
    pub fn new(table: &'a ThresholdTable) -> Self {
        Self { table }
    }

    /// Score a metric, or mark it unavailable when the raw value is missing
    pub fn score(&self, metric: MetricKey, raw: Option<f64>) -> ScoreComponent {
        let band = *self.table.band(metric);
        match raw.filter(|v| v.is_finite()) {
            Some(value) => {
                let fraction = band.normalize(value).unwrap_or(0.5);
                ScoreComponent {
                    metric,
                    raw: Some(value),
                    band,
                    internal: fraction * 100.0,
                    score: band.score(value),
                    status: ComponentStatus::Scored,
                }
            }
            None => self.neutral(metric, ComponentStatus::Unavailable),
        }
    }

    /// Score a consistency metric, gating it when the sample is too small
    pub fn score_gated(&self, metric: MetricKey, raw: Option<f64>, gated: bool) -> ScoreComponent {
        if gated {
            self.neutral(metric, ComponentStatus::Gated)
        } else {
            self.score(metric, raw)
        }
    }

    fn neutral(&self, metric: MetricKey, status: ComponentStatus) -> ScoreComponent {
        ScoreComponent {
            metric,
            raw: None,
            band: *self.table.band(metric),
            internal: 50.0,
            score: NEUTRAL_SCORE,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_mapping() {
        let band = MetricBand::new(0.0, 100.0);
        assert_eq!(band.score(0.0), 20);
        assert_eq!(band.score(50.0), 50);
        assert_eq!(band.score(100.0), 80);
        assert_eq!(band.score(25.0), 35);
    }

    #[test]
    fn test_clamping_outside_band() {
        let band = MetricBand::new(300.0, 800.0);
        assert_eq!(band.score(-1000.0), 20);
        assert_eq!(band.score(5000.0), 80);
    }

    #[test]
    fn test_inverted_band() {
        let band = MetricBand::inverted(3.0, 20.0);
        assert_eq!(band.score(3.0), 80);
        assert_eq!(band.score(20.0), 20);
        assert!(band.score(5.0) > band.score(15.0));
    }

    #[test]
    fn test_degenerate_band_scores_midpoint() {
        let band = MetricBand::new(10.0, 10.0);
        assert_eq!(band.score(10.0), 50);
        assert_eq!(band.score(99.0), 50);
        assert!(band.normalize(10.0).is_none());
    }

    #[test]
    fn test_non_finite_value_is_neutral() {
        let band = MetricBand::new(0.0, 1.0);
        assert_eq!(band.score(f64::NAN), 50);
        assert_eq!(band.score(f64::INFINITY), 50);
    }

    #[test]
    fn test_normalizer_statuses() {
        let table = ThresholdTable::default();
        let normalizer = ThresholdNormalizer::new(&table);

        let scored = normalizer.score(MetricKey::PelvisVelocity, Some(550.0));
        assert_eq!(scored.status, ComponentStatus::Scored);
        assert_eq!(scored.score, 50);
        assert!((scored.internal - 50.0).abs() < 1e-9);

        let missing = normalizer.score(MetricKey::PelvisVelocity, None);
        assert_eq!(missing.status, ComponentStatus::Unavailable);
        assert_eq!(missing.score, NEUTRAL_SCORE);

        let gated = normalizer.score_gated(MetricKey::PelvisVelocityCv, Some(4.0), true);
        assert_eq!(gated.status, ComponentStatus::Gated);
        assert_eq!(gated.score, NEUTRAL_SCORE);
        assert!(gated.raw.is_none());
    }

    #[test]
    fn test_default_table_validates() {
        assert!(ThresholdTable::default().validate().is_ok());
        let mut table = ThresholdTable::default();
        table.separation = MetricBand::new(60.0, 10.0);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_variability_keys() {
        assert!(MetricKey::PelvisVelocityCv.is_variability());
        assert!(!MetricKey::PelvisVelocity.is_variability());
    }
}
