// Leak classifier - ordered rules mapping session patterns to a technique flaw
//
// Rule order is load-bearing; the first matching rule wins:
//
//   1. no_bat_delivery            energy present, delivered energy absent or low
//   2. late_engine                legs energy peaks after contact in most swings
//   3. core_disconnect            proper-sequence rate below threshold
//   4. early_rear_leg_release     upper-body energy peaks before the legs
//   5. late_front_leg_acceptance  legs peak too close to contact
//   6. glide_without_capture      legs peak too early
//   7. clean_transfer             good sequence, mid-range timing, efficient delivery
//   8. unknown                    fallback
//
// A rule whose inputs are missing never fires.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::aggregator::SessionMetrics;
use crate::analysis::decision::{Decision, DecisionList};

/// Taxonomy version stamped on every result
pub const TAXONOMY_VERSION: &str = "leak-taxonomy/2";

/// Closed set of technique flaws
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakType {
    CleanTransfer,
    EarlyRearLegRelease,
    CoreDisconnect,
    NoBatDelivery,
    LateEngine,
    LateFrontLegAcceptance,
    GlideWithoutCapture,
    Unknown,
}

impl LeakType {
    pub const ALL: [LeakType; 8] = [
        LeakType::CleanTransfer,
        LeakType::EarlyRearLegRelease,
        LeakType::CoreDisconnect,
        LeakType::NoBatDelivery,
        LeakType::LateEngine,
        LeakType::LateFrontLegAcceptance,
        LeakType::GlideWithoutCapture,
        LeakType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeakType::CleanTransfer => "clean_transfer",
            LeakType::EarlyRearLegRelease => "early_rear_leg_release",
            LeakType::CoreDisconnect => "core_disconnect",
            LeakType::NoBatDelivery => "no_bat_delivery",
            LeakType::LateEngine => "late_engine",
            LeakType::LateFrontLegAcceptance => "late_front_leg_acceptance",
            LeakType::GlideWithoutCapture => "glide_without_capture",
            LeakType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LeakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakThresholds {
    /// Delivered energy below this is "no delivery" (J)
    pub min_delivered_energy_j: f64,
    /// Legs-peak-after-contact rate above this is a late engine
    pub late_engine_rate: f64,
    /// Proper-sequence rate below this is a core disconnect
    pub core_disconnect_rate: f64,
    /// Upper-before-lower rate above this is an early release
    pub early_release_rate: f64,
    /// Ground-to-contact window (ms)
    pub min_ground_to_contact_ms: f64,
    pub max_ground_to_contact_ms: f64,
    /// Clean transfer minimums
    pub clean_sequence_rate: f64,
    pub clean_min_efficiency_pct: f64,
}

impl Default for LeakThresholds {
    fn default() -> Self {
        Self {
            min_delivered_energy_j: 25.0,
            late_engine_rate: 0.5,
            core_disconnect_rate: 0.40,
            early_release_rate: 0.5,
            min_ground_to_contact_ms: 30.0,
            max_ground_to_contact_ms: 200.0,
            clean_sequence_rate: 0.70,
            clean_min_efficiency_pct: 20.0,
        }
    }
}

/// Coaching copy for one leak type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakCopy {
    pub caption: String,
    pub training_focus: String,
}

impl LeakCopy {
    fn new(caption: &str, training_focus: &str) -> Self {
        Self {
            caption: caption.to_string(),
            training_focus: training_focus.to_string(),
        }
    }
}

/// Versioned caption table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakCatalog {
    pub version: String,
    pub entries: BTreeMap<LeakType, LeakCopy>,
}

impl Default for LeakCatalog {
    fn default() -> Self {
        let entries = [
            (
                LeakType::CleanTransfer,
                LeakCopy::new(
                    "Energy moves from the ground through the core into the bat in order.",
                    "Maintain: keep the same sequence under higher intent and varied pitch speeds.",
                ),
            ),
            (
                LeakType::EarlyRearLegRelease,
                LeakCopy::new(
                    "The upper body fires before the lower body finishes pushing.",
                    "Hold the back-side drive longer; let the hips lead before the hands go.",
                ),
            ),
            (
                LeakType::CoreDisconnect,
                LeakCopy::new(
                    "Hips and shoulders turn together, so the core never stores stretch.",
                    "Separation work: let the hips open while the shoulders stay closed.",
                ),
            ),
            (
                LeakType::NoBatDelivery,
                LeakCopy::new(
                    "Energy is produced but little of it reaches the bat.",
                    "Connection drills: transfer body rotation into barrel speed through contact.",
                ),
            ),
            (
                LeakType::LateEngine,
                LeakCopy::new(
                    "The lower body is still building energy after contact.",
                    "Start the ground push earlier so the legs peak before the barrel arrives.",
                ),
            ),
            (
                LeakType::LateFrontLegAcceptance,
                LeakCopy::new(
                    "The front side accepts the load too close to contact.",
                    "Get the front foot down and braced earlier to give the swing a base.",
                ),
            ),
            (
                LeakType::GlideWithoutCapture,
                LeakCopy::new(
                    "The body drifts forward and the energy bleeds out before contact.",
                    "Firm up the front side to stop the glide and redirect energy into rotation.",
                ),
            ),
            (
                LeakType::Unknown,
                LeakCopy::new(
                    "No clear transfer pattern could be identified from this session.",
                    "Capture more swings with full-body data to pin down the pattern.",
                ),
            ),
        ]
        .into_iter()
        .collect();

        Self {
            version: TAXONOMY_VERSION.to_string(),
            entries,
        }
    }
}

impl LeakCatalog {
    /// Copy for a leak type, falling back to the unknown entry
    pub fn copy(&self, leak: LeakType) -> LeakCopy {
        self.entries
            .get(&leak)
            .or_else(|| self.entries.get(&LeakType::Unknown))
            .cloned()
            .unwrap_or_else(|| LeakCopy::new(leak.as_str(), ""))
    }
}

/// Leak classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakConfig {
    pub thresholds: LeakThresholds,
    pub catalog: LeakCatalog,
    /// Leaks that trigger the projection guardrail
    pub severe_leaks: Vec<LeakType>,
    pub low_confidence_note: String,
}

impl Default for LeakConfig {
    fn default() -> Self {
        Self {
            thresholds: LeakThresholds::default(),
            catalog: LeakCatalog::default(),
            severe_leaks: vec![
                LeakType::NoBatDelivery,
                LeakType::LateEngine,
                LeakType::CoreDisconnect,
            ],
            low_confidence_note: "low confidence: no leak rule matched the available data"
                .to_string(),
        }
    }
}

/// Classification result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakResult {
    pub leak_type: LeakType,
    pub caption: String,
    pub training_focus: String,
    /// 1-based position of the rule that fired
    pub rule_position: usize,
    pub taxonomy_version: String,
    pub severe: bool,
    pub confidence_note: Option<String>,
    /// Session values the rules looked at
    pub evidence: BTreeMap<String, f64>,
}

/// LeakClassifier evaluates the ordered rule list against SessionMetrics
pub struct LeakClassifier {
    rules: DecisionList<SessionMetrics, LeakType>,
    config: LeakConfig,
}

impl LeakClassifier {
    pub fn new(config: &LeakConfig) -> Self {
        Self {
            rules: build_rules(config.thresholds),
            config: config.clone(),
        }
    }

    /// Leak types in rule order
    pub fn rule_order(&self) -> Vec<LeakType> {
        self.rules.outcomes()
    }

    pub fn is_severe(&self, leak: LeakType) -> bool {
        self.config.severe_leaks.contains(&leak)
    }

    pub fn classify(&self, metrics: &SessionMetrics) -> LeakResult {
        let Decision {
            outcome, position, ..
        } = self.rules.evaluate(metrics);
        tracing::debug!(leak = outcome.as_str(), rule = position, "leak classified");
        self.result(outcome, position, evidence(metrics))
    }

    /// Unknown leak for a session with no usable swings
    pub fn unknown(&self) -> LeakResult {
        self.result(LeakType::Unknown, self.rules.len() + 1, BTreeMap::new())
    }

    fn result(
        &self,
        leak_type: LeakType,
        rule_position: usize,
        evidence: BTreeMap<String, f64>,
    ) -> LeakResult {
        let copy = self.config.catalog.copy(leak_type);
        LeakResult {
            leak_type,
            caption: copy.caption,
            training_focus: copy.training_focus,
            rule_position,
            taxonomy_version: self.config.catalog.version.clone(),
            severe: self.is_severe(leak_type),
            confidence_note: (leak_type == LeakType::Unknown)
                .then(|| self.config.low_confidence_note.clone()),
            evidence,
        }
    }
}

fn build_rules(t: LeakThresholds) -> DecisionList<SessionMetrics, LeakType> {
    DecisionList::new(LeakType::Unknown)
        .rule(LeakType::NoBatDelivery, move |m: &SessionMetrics| {
            m.has_energy_data
                && m
                    .delivered_energy
                    .map_or(true, |e| e < t.min_delivered_energy_j)
        })
        .rule(LeakType::LateEngine, move |m: &SessionMetrics| {
            m.legs_peak_after_contact_rate
                .map_or(false, |r| r > t.late_engine_rate)
        })
        .rule(LeakType::CoreDisconnect, move |m: &SessionMetrics| {
            m.proper_sequence_rate
                .map_or(false, |r| r < t.core_disconnect_rate)
        })
        .rule(LeakType::EarlyRearLegRelease, move |m: &SessionMetrics| {
            m.upper_before_lower_rate
                .map_or(false, |r| r > t.early_release_rate)
        })
        .rule(LeakType::LateFrontLegAcceptance, move |m: &SessionMetrics| {
            m.ground_to_contact_ms
                .map_or(false, |ms| ms < t.min_ground_to_contact_ms)
        })
        .rule(LeakType::GlideWithoutCapture, move |m: &SessionMetrics| {
            m.ground_to_contact_ms
                .map_or(false, |ms| ms > t.max_ground_to_contact_ms)
        })
        .rule(LeakType::CleanTransfer, move |m: &SessionMetrics| {
            match (
                m.proper_sequence_rate,
                m.ground_to_contact_ms,
                m.delivery_efficiency,
            ) {
                (Some(seq), Some(gtc), Some(eff)) => {
                    seq >= t.clean_sequence_rate
                        && gtc >= t.min_ground_to_contact_ms
                        && gtc <= t.max_ground_to_contact_ms
                        && eff >= t.clean_min_efficiency_pct
                }
                _ => false,
            }
        })
}

fn evidence(m: &SessionMetrics) -> BTreeMap<String, f64> {
    [
        ("delivered_energy", m.delivered_energy),
        ("delivery_efficiency", m.delivery_efficiency),
        ("proper_sequence_rate", m.proper_sequence_rate),
        ("legs_peak_after_contact_rate", m.legs_peak_after_contact_rate),
        ("upper_before_lower_rate", m.upper_before_lower_rate),
        ("ground_to_contact_ms", m.ground_to_contact_ms),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key.to_string(), round1(v))))
    .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "leak_tests.rs"]
mod tests;
