// Confidence-tiered predictor for sensor-only sessions
//
// Three independent predictions, each tagged with how much it can be trusted:
//
//   release  (HIGH)    bat/hand speed ratio against the optimal band
//   timing   (MEDIUM)  time-to-contact CV; adjustability is an inference
//   upstream (LOW)     lower-body contribution guessed from ratio shortfall
//                      and attack-angle spread; needs confirmation
//
// Their potential unlocks (mph) sum to the kinetic potential; the overall
// tier is whichever contributes the largest share.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::aggregator::{coefficient_of_variation, mean};
use crate::ingest::SensorSwing;
use crate::scoring::normalizer::{MetricKey, ScoreComponent, ThresholdNormalizer, ThresholdTable};

/// How much a prediction can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfidenceTier::High => "HIGH",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::Low => "LOW",
        })
    }
}

/// Timing adjustability inferred from contact-time variance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustability {
    Rigid,
    Adaptable,
    Fluid,
}

/// Predictor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Optimal bat/hand speed ratio band
    pub release_optimal_min: f64,
    pub release_optimal_max: f64,
    pub release_potential_cap_mph: f64,
    /// CV (%) above which timing costs speed
    pub timing_free_cv: f64,
    pub timing_mph_per_cv: f64,
    pub timing_potential_cap_mph: f64,
    pub rigid_cv_max: f64,
    pub adaptable_cv_max: f64,
    /// mph per unit of release-ratio shortfall
    pub upstream_shortfall_mph: f64,
    /// Attack-angle spread (deg) tolerated before it counts against the swing
    pub path_free_std_deg: f64,
    pub upstream_mph_per_deg: f64,
    pub upstream_potential_cap_mph: f64,
    /// Measurements that would confirm the upstream estimate
    pub upstream_confirmations: Vec<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            release_optimal_min: 2.9,
            release_optimal_max: 3.4,
            release_potential_cap_mph: 8.0,
            timing_free_cv: 8.0,
            timing_mph_per_cv: 0.25,
            timing_potential_cap_mph: 3.0,
            rigid_cv_max: 5.0,
            adaptable_cv_max: 12.0,
            upstream_shortfall_mph: 4.0,
            path_free_std_deg: 4.0,
            upstream_mph_per_deg: 0.15,
            upstream_potential_cap_mph: 5.0,
            upstream_confirmations: vec![
                "side-view video of the lower half".to_string(),
                "full-body motion capture".to_string(),
                "ground reaction force data".to_string(),
            ],
        }
    }
}

/// Which prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    Release,
    Timing,
    Upstream,
}

impl PredictionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PredictionKind::Release => "release",
            PredictionKind::Timing => "timing",
            PredictionKind::Upstream => "upstream",
        }
    }

    pub fn tier(self) -> ConfidenceTier {
        match self {
            PredictionKind::Release => ConfidenceTier::High,
            PredictionKind::Timing => ConfidenceTier::Medium,
            PredictionKind::Upstream => ConfidenceTier::Low,
        }
    }
}

/// One tiered prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub kind: PredictionKind,
    pub confidence: ConfidenceTier,
    pub component: ScoreComponent,
    /// Speed this area could unlock (mph)
    pub potential_mph: f64,
    /// Labelled as an inference rather than a measurement
    pub inference: bool,
    pub adjustability: Option<Adjustability>,
    pub note: String,
    pub confirmations_needed: Vec<String>,
}

/// Summed potential and its dominant tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticPotential {
    pub total_mph: f64,
    pub by_prediction: BTreeMap<String, f64>,
    pub share_by_tier: BTreeMap<String, f64>,
    pub overall_confidence: ConfidenceTier,
}

/// Everything the predictor derives from a sensor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAssessment {
    pub swing_count: usize,
    pub mean_bat_speed_mph: f64,
    pub mean_hand_speed_mph: f64,
    pub release_ratio: f64,
    pub time_to_contact_cv: Option<f64>,
    pub bat_speed_cv: Option<f64>,
    pub attack_angle_std_deg: Option<f64>,
    pub variance_gated: bool,
    pub release: Prediction,
    pub timing: Prediction,
    pub upstream: Prediction,
    pub kinetic_potential: KineticPotential,
}

/// ConfidencePredictor builds the three tiered predictions
pub struct ConfidencePredictor<'a> {
    config: &'a SensorConfig,
    thresholds: &'a ThresholdTable,
    min_swings_for_variance: usize,
}

impl<'a> ConfidencePredictor<'a> {
    pub fn new(
        config: &'a SensorConfig,
        thresholds: &'a ThresholdTable,
        min_swings_for_variance: usize,
    ) -> Self {
        Self {
            config,
            thresholds,
            min_swings_for_variance,
        }
    }

    /// Assess a sensor session
    ///
    /// # Returns
    /// `None` for an empty session
    pub fn assess(&self, swings: &[SensorSwing]) -> Option<SensorAssessment> {
        let bat_speeds: Vec<f64> = swings.iter().map(|s| s.bat_speed_mph).collect();
        let hand_speeds: Vec<f64> = swings.iter().map(|s| s.hand_speed_mph).collect();
        let mean_bat = mean(&bat_speeds)?;
        let mean_hand = mean(&hand_speeds)?;
        if !(mean_hand > 0.0) {
            return None;
        }
        let ratio = mean_bat / mean_hand;
        let n = swings.len();
        let gated = n < self.min_swings_for_variance;

        let ttc: Vec<f64> = swings.iter().filter_map(|s| s.time_to_contact_ms).collect();
        let ttc_cv = (ttc.len() >= self.min_swings_for_variance)
            .then(|| coefficient_of_variation(&ttc))
            .flatten();
        let bat_speed_cv = (!gated)
            .then(|| coefficient_of_variation(&bat_speeds))
            .flatten();
        let attack: Vec<f64> = swings.iter().filter_map(|s| s.attack_angle_deg).collect();
        let attack_std = population_std(&attack);

        let normalizer = ThresholdNormalizer::new(self.thresholds);
        let release = self.release(&normalizer, ratio, mean_hand);
        let timing = self.timing(&normalizer, ttc_cv);
        let upstream = self.upstream(&normalizer, ratio, attack_std);
        let kinetic_potential = kinetic_potential(&[&release, &timing, &upstream]);

        tracing::debug!(
            swings = n,
            ratio,
            potential = kinetic_potential.total_mph,
            tier = %kinetic_potential.overall_confidence,
            "sensor session assessed"
        );

        Some(SensorAssessment {
            swing_count: n,
            mean_bat_speed_mph: mean_bat,
            mean_hand_speed_mph: mean_hand,
            release_ratio: ratio,
            time_to_contact_cv: ttc_cv,
            bat_speed_cv,
            attack_angle_std_deg: attack_std,
            variance_gated: gated,
            release,
            timing,
            upstream,
            kinetic_potential,
        })
    }

    fn release(&self, normalizer: &ThresholdNormalizer<'_>, ratio: f64, mean_hand: f64) -> Prediction {
        let c = self.config;
        let potential = ((c.release_optimal_min - ratio).max(0.0) * mean_hand)
            .min(c.release_potential_cap_mph);
        let note = if ratio < c.release_optimal_min {
            format!(
                "bat/hand ratio {:.2} is below the {:.1}-{:.1} band; the barrel is not whipping past the hands",
                ratio, c.release_optimal_min, c.release_optimal_max
            )
        } else if ratio > c.release_optimal_max {
            format!(
                "bat/hand ratio {:.2} is above the {:.1}-{:.1} band",
                ratio, c.release_optimal_min, c.release_optimal_max
            )
        } else {
            format!("bat/hand ratio {:.2} is in the optimal band", ratio)
        };
        Prediction {
            kind: PredictionKind::Release,
            confidence: PredictionKind::Release.tier(),
            component: normalizer.score(MetricKey::ReleaseRatio, Some(ratio)),
            potential_mph: round2(potential),
            inference: false,
            adjustability: None,
            note,
            confirmations_needed: Vec::new(),
        }
    }

    fn timing(&self, normalizer: &ThresholdNormalizer<'_>, cv: Option<f64>) -> Prediction {
        let c = self.config;
        let Some(cv) = cv else {
            return Prediction {
                kind: PredictionKind::Timing,
                confidence: PredictionKind::Timing.tier(),
                component: normalizer.score_gated(MetricKey::ContactTimeCv, None, true),
                potential_mph: 0.0,
                inference: true,
                adjustability: None,
                note: format!(
                    "need {}+ swings with time to contact for timing analysis",
                    self.min_swings_for_variance
                ),
                confirmations_needed: Vec::new(),
            };
        };

        let adjustability = if cv < c.rigid_cv_max {
            Adjustability::Rigid
        } else if cv <= c.adaptable_cv_max {
            Adjustability::Adaptable
        } else {
            Adjustability::Fluid
        };
        let potential = ((cv - c.timing_free_cv).max(0.0) * c.timing_mph_per_cv)
            .min(c.timing_potential_cap_mph);
        Prediction {
            kind: PredictionKind::Timing,
            confidence: PredictionKind::Timing.tier(),
            component: normalizer.score(MetricKey::ContactTimeCv, Some(cv)),
            potential_mph: round2(potential),
            inference: true,
            adjustability: Some(adjustability),
            note: format!(
                "time-to-contact CV {:.1}%; adjustability is inferred from variance alone",
                cv
            ),
            confirmations_needed: Vec::new(),
        }
    }

    fn upstream(
        &self,
        normalizer: &ThresholdNormalizer<'_>,
        ratio: f64,
        attack_std: Option<f64>,
    ) -> Prediction {
        let c = self.config;
        let shortfall = (c.release_optimal_min - ratio).max(0.0);
        let path_excess = (attack_std.unwrap_or(0.0) - c.path_free_std_deg).max(0.0);
        let potential = (c.upstream_shortfall_mph * shortfall + c.upstream_mph_per_deg * path_excess)
            .min(c.upstream_potential_cap_mph);
        Prediction {
            kind: PredictionKind::Upstream,
            confidence: PredictionKind::Upstream.tier(),
            component: normalizer.score(MetricKey::UpstreamContribution, Some(potential)),
            potential_mph: round2(potential),
            inference: true,
            adjustability: None,
            note: "speculative: lower-body contribution estimated from release ratio and path variance only"
                .to_string(),
            confirmations_needed: c.upstream_confirmations.clone(),
        }
    }
}

/// Sum potentials and pick the dominant tier (ties favour higher confidence)
pub fn kinetic_potential(predictions: &[&Prediction]) -> KineticPotential {
    let total: f64 = predictions.iter().map(|p| p.potential_mph).sum();

    let mut by_tier: BTreeMap<ConfidenceTier, f64> = BTreeMap::new();
    for p in predictions {
        *by_tier.entry(p.confidence).or_insert(0.0) += p.potential_mph;
    }

    // BTreeMap iterates High, Medium, Low; strict > keeps the earlier tier on ties.
    let mut overall = ConfidenceTier::High;
    let mut best = f64::NEG_INFINITY;
    for (tier, value) in &by_tier {
        if *value > best {
            best = *value;
            overall = *tier;
        }
    }
    if total <= 0.0 {
        overall = ConfidenceTier::High;
    }

    KineticPotential {
        total_mph: round2(total),
        by_prediction: predictions
            .iter()
            .map(|p| (p.kind.as_str().to_string(), p.potential_mph))
            .collect(),
        share_by_tier: by_tier
            .iter()
            .map(|(tier, value)| {
                let share = if total > 0.0 { value / total } else { 0.0 };
                (tier.to_string(), round2(share))
            })
            .collect(),
        overall_confidence: overall,
    }
}

fn population_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::normalizer::ComponentStatus;

    fn swing(bat: f64, hand: f64, ttc: Option<f64>, attack: Option<f64>) -> SensorSwing {
        SensorSwing {
            swing_id: "x".to_string(),
            bat_speed_mph: bat,
            hand_speed_mph: hand,
            time_to_contact_ms: ttc,
            attack_angle_deg: attack,
        }
    }

    fn assess(swings: &[SensorSwing]) -> SensorAssessment {
        let config = SensorConfig::default();
        let table = ThresholdTable::default();
        ConfidencePredictor::new(&config, &table, 3)
            .assess(swings)
            .unwrap()
    }

    #[test]
    fn test_release_in_band() {
        let a = assess(&[swing(66.0, 21.0, None, None)]);
        // 66 / 21 = 3.14
        assert_eq!(a.release.confidence, ConfidenceTier::High);
        assert_eq!(a.release.potential_mph, 0.0);
        assert!(!a.release.inference);
        assert!(a.release.component.score > 50);
    }

    #[test]
    fn test_release_shortfall_potential_capped() {
        let a = assess(&[swing(50.0, 25.0, None, None)]);
        // ratio 2.0: (2.9 - 2.0) * 25 = 22.5 -> capped at 8
        assert_eq!(a.release.potential_mph, 8.0);
        assert_eq!(a.release.component.score, 20);
        // upstream: min(5, 4 * 0.9) = 3.6
        assert!((a.upstream.potential_mph - 3.6).abs() < 1e-9);
        assert_eq!(a.upstream.confidence, ConfidenceTier::Low);
        assert_eq!(a.upstream.confirmations_needed.len(), 3);
    }

    #[test]
    fn test_timing_gated_below_three_swings() {
        let a = assess(&[
            swing(66.0, 21.0, Some(150.0), None),
            swing(67.0, 21.0, Some(160.0), None),
        ]);
        assert!(a.variance_gated);
        assert_eq!(a.timing.component.status, ComponentStatus::Gated);
        assert_eq!(a.timing.component.score, 50);
        assert_eq!(a.timing.potential_mph, 0.0);
        assert!(a.timing.inference);
        assert!(a.bat_speed_cv.is_none());
    }

    #[test]
    fn test_timing_adjustability() {
        let a = assess(&[
            swing(66.0, 21.0, Some(100.0), None),
            swing(66.0, 21.0, Some(150.0), None),
            swing(66.0, 21.0, Some(200.0), None),
        ]);
        // CV = 40.82 / 150 = 27.2% -> fluid, potential capped at 3
        assert_eq!(a.timing.adjustability, Some(Adjustability::Fluid));
        assert_eq!(a.timing.potential_mph, 3.0);
        assert_eq!(a.timing.component.score, 20);

        let steady = assess(&[
            swing(66.0, 21.0, Some(148.0), None),
            swing(66.0, 21.0, Some(150.0), None),
            swing(66.0, 21.0, Some(152.0), None),
        ]);
        assert_eq!(steady.timing.adjustability, Some(Adjustability::Rigid));
        assert_eq!(steady.timing.potential_mph, 0.0);
    }

    #[test]
    fn test_overall_tier_is_largest_share() {
        let a = assess(&[
            swing(50.0, 25.0, Some(100.0), None),
            swing(50.0, 25.0, Some(150.0), None),
            swing(50.0, 25.0, Some(200.0), None),
        ]);
        // release 8, timing 3, upstream 3.6
        assert_eq!(a.kinetic_potential.overall_confidence, ConfidenceTier::High);
        assert!((a.kinetic_potential.total_mph - 14.6).abs() < 1e-9);
    }

    #[test]
    fn test_zero_potential_defaults_high() {
        let a = assess(&[swing(66.0, 21.0, None, None)]);
        assert_eq!(a.kinetic_potential.total_mph, 0.0);
        assert_eq!(a.kinetic_potential.overall_confidence, ConfidenceTier::High);
    }

    #[test]
    fn test_tie_prefers_higher_confidence() {
        let base = assess(&[swing(66.0, 21.0, None, None)]);
        let mut timing = base.timing.clone();
        timing.potential_mph = 2.0;
        let mut upstream = base.upstream.clone();
        upstream.potential_mph = 2.0;
        let kp = kinetic_potential(&[&base.release, &timing, &upstream]);
        assert_eq!(kp.overall_confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn test_empty_session() {
        let config = SensorConfig::default();
        let table = ThresholdTable::default();
        assert!(ConfidencePredictor::new(&config, &table, 3).assess(&[]).is_none());
    }
}
