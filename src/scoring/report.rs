// FourBScore - the one object the engine hands back
//
// Always fully populated: an empty or unreadable session produces the
// neutral object (every score 50, "Average", leak unknown) plus a warning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::composite::{CompositeScorer, CompositeWeights, DimensionScore, DimensionSet, FlowScore};
use crate::analysis::leak::LeakResult;
use crate::analysis::segmenter::{ContactConfidence, ContactMethod};
use crate::config::PlayerLevel;
use crate::engine::capabilities::ScoringMode;
use crate::ingest::ParseReport;
use crate::prediction::projection::Projection;
use crate::prediction::sensor::{KineticPotential, Prediction};

/// Output schema tag
pub const SCHEMA_VERSION: &str = "fourb-score/1";

/// Warning attached when nothing could be scored
pub const NO_SWINGS_WARNING: &str = "no valid swings found";

/// Input parsing counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub coerced_cells: usize,
    pub dropped_rows: usize,
    pub unknown_headers: Vec<String>,
}

impl From<&ParseReport> for ParseSummary {
    fn from(report: &ParseReport) -> Self {
        Self {
            rows_read: report.rows_read,
            rows_kept: report.rows_kept,
            coerced_cells: report.coerced_cells,
            dropped_rows: report.dropped_rows,
            unknown_headers: report.unknown_headers.clone(),
        }
    }
}

/// How contact was located for one swing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwingContact {
    pub swing_id: String,
    pub method: ContactMethod,
    pub tier: ContactConfidence,
}

/// What the session data could and could not support
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub swing_count: usize,
    pub swings_discarded: usize,
    pub channels_present: Vec<String>,
    pub contact_events_detected: bool,
    pub contact_methods: BTreeMap<String, usize>,
    pub weakest_contact_tier: Option<ContactConfidence>,
    /// Per-swing contact method and tier, in swing order
    pub swing_contacts: Vec<SwingContact>,
    pub gated_scores: Vec<String>,
    pub bat_energy_coverage: f64,
    pub bat_energy_meaningful: bool,
    pub proxy_delivered_energy: bool,
    pub parse: ParseSummary,
    pub warnings: Vec<String>,
}

impl DataQualityReport {
    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// Terminal score object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourBScore {
    pub schema_version: String,
    pub config_version: String,
    pub mode: ScoringMode,
    pub level: PlayerLevel,
    pub brain: DimensionScore,
    pub body: DimensionScore,
    pub bat: DimensionScore,
    pub ball: DimensionScore,
    pub composite: DimensionScore,
    pub weights: CompositeWeights,
    /// Flow breakdown keyed by flow name
    pub components: BTreeMap<String, FlowScore>,
    /// Unrounded aggregates rounded to one decimal for display
    pub raw_metrics: BTreeMap<String, f64>,
    pub leak: LeakResult,
    pub data_quality: DataQualityReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projections: Option<Projection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinetic_potential: Option<KineticPotential>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<Prediction>,
}

impl FourBScore {
    /// Neutral object for a session that could not be scored
    pub fn neutral(
        config_version: &str,
        level: PlayerLevel,
        weights: CompositeWeights,
        leak: LeakResult,
        mut data_quality: DataQualityReport,
    ) -> Self {
        data_quality.warn(NO_SWINGS_WARNING);
        let dims = DimensionSet::neutral();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            config_version: config_version.to_string(),
            mode: ScoringMode::Empty,
            level,
            brain: dims.brain,
            body: dims.body,
            bat: dims.bat,
            ball: dims.ball,
            composite: DimensionScore::neutral(),
            weights,
            components: BTreeMap::new(),
            raw_metrics: BTreeMap::new(),
            leak,
            data_quality,
            projections: None,
            kinetic_potential: None,
            predictions: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> DimensionSet {
        DimensionSet {
            brain: self.brain,
            body: self.body,
            bat: self.bat,
            ball: self.ball,
        }
    }

    /// Composite recomputed from the returned dimensions and weights
    pub fn recompute_composite(&self) -> u8 {
        CompositeScorer::new(self.weights)
            .composite(&self.dimensions())
            .score
    }

    /// Every 20-80 score in the object
    pub fn all_scores(&self) -> Vec<u8> {
        let mut scores = vec![
            self.brain.score,
            self.body.score,
            self.bat.score,
            self.ball.score,
            self.composite.score,
        ];
        for flow in self.components.values() {
            scores.push(flow.score);
            scores.extend(flow.components.iter().map(|c| c.score));
        }
        scores
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Round to one decimal for display
pub fn display_round(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
