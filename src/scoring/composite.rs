// Composite scorer - flows, dimensions, composite and grade labels
//
// Normalized components roll up in three steps:
//
//   component scores -> flow score  (rounded mean of available components)
//   flow scores      -> dimension   (rounded mean of the dimension's flows)
//   dimensions       -> composite   (rounded weighted sum)
//
// Gated components count as the neutral 50; unavailable components are left
// out of the mean, and a flow with nothing available is neutral.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalizer::{ComponentStatus, ScoreComponent, NEUTRAL_SCORE, SCORE_MAX, SCORE_MIN};
use crate::error::ConfigError;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Composite weights per dimension
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub body: f64,
    pub bat: f64,
    pub brain: f64,
    pub ball: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            body: 0.35,
            bat: 0.30,
            brain: 0.20,
            ball: 0.15,
        }
    }
}

impl CompositeWeights {
    pub fn sum(&self) -> f64 {
        self.body + self.bat + self.brain + self.ball
    }

    /// Weights must be non-negative and sum to 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("weights.body", self.body),
            ("weights.bat", self.bat),
            ("weights.brain", self.brain),
            ("weights.ball", self.ball),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Scouting grade label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "Poor")]
    Poor,
    #[serde(rename = "Fringe")]
    Fringe,
    #[serde(rename = "Below Avg")]
    BelowAverage,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Above Avg")]
    AboveAverage,
    #[serde(rename = "Plus")]
    Plus,
    #[serde(rename = "Plus-Plus")]
    PlusPlus,
}

impl Grade {
    /// Grade band for a 20-80 score
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Grade::Poor,
            30..=39 => Grade::Fringe,
            40..=44 => Grade::BelowAverage,
            45..=54 => Grade::Average,
            55..=59 => Grade::AboveAverage,
            60..=69 => Grade::Plus,
            _ => Grade::PlusPlus,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::Poor => "Poor",
            Grade::Fringe => "Fringe",
            Grade::BelowAverage => "Below Avg",
            Grade::Average => "Average",
            Grade::AboveAverage => "Above Avg",
            Grade::Plus => "Plus",
            Grade::PlusPlus => "Plus-Plus",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A 20-80 score with its grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub score: u8,
    pub grade: Grade,
}

impl DimensionScore {
    pub fn new(score: u8) -> Self {
        let score = score.clamp(SCORE_MIN, SCORE_MAX);
        Self {
            score,
            grade: Grade::from_score(score),
        }
    }

    pub fn neutral() -> Self {
        Self::new(NEUTRAL_SCORE)
    }
}

/// One flow: a named group of components averaged into a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowScore {
    pub score: u8,
    pub components: Vec<ScoreComponent>,
}

impl FlowScore {
    /// Rounded mean of the components that are scored or gated
    pub fn from_components(components: Vec<ScoreComponent>) -> Self {
        let available: Vec<f64> = components
            .iter()
            .filter(|c| c.status != ComponentStatus::Unavailable)
            .map(|c| c.score as f64)
            .collect();
        let score = if available.is_empty() {
            NEUTRAL_SCORE
        } else {
            rounded_mean(&available)
        };
        Self { score, components }
    }

    pub fn neutral() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            components: Vec::new(),
        }
    }

    /// Whether any component was computed from data
    pub fn has_data(&self) -> bool {
        self.components
            .iter()
            .any(|c| c.status == ComponentStatus::Scored)
    }
}

/// The four top-level dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSet {
    pub brain: DimensionScore,
    pub body: DimensionScore,
    pub bat: DimensionScore,
    pub ball: DimensionScore,
}

impl DimensionSet {
    pub fn neutral() -> Self {
        Self {
            brain: DimensionScore::neutral(),
            body: DimensionScore::neutral(),
            bat: DimensionScore::neutral(),
            ball: DimensionScore::neutral(),
        }
    }
}

/// Applies composite weights to dimension scores
#[derive(Debug, Clone, Copy)]
pub struct CompositeScorer {
    weights: CompositeWeights,
}

impl CompositeScorer {
    pub fn new(weights: CompositeWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &CompositeWeights {
        &self.weights
    }

    /// Dimension score as the rounded mean of its flows
    pub fn dimension(&self, flows: &[&FlowScore]) -> DimensionScore {
        if flows.is_empty() {
            return DimensionScore::neutral();
        }
        let scores: Vec<f64> = flows.iter().map(|f| f.score as f64).collect();
        DimensionScore::new(rounded_mean(&scores))
    }

    /// Composite = round(sum of weight x dimension score)
    pub fn composite(&self, dims: &DimensionSet) -> DimensionScore {
        let w = &self.weights;
        let weighted = w.body * dims.body.score as f64
            + w.bat * dims.bat.score as f64
            + w.brain * dims.brain.score as f64
            + w.ball * dims.ball.score as f64;
        DimensionScore::new(round_score(weighted))
    }
}

fn rounded_mean(values: &[f64]) -> u8 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    round_score(mean)
}

fn round_score(value: f64) -> u8 {
    if !value.is_finite() {
        return NEUTRAL_SCORE;
    }
    (value.round().clamp(SCORE_MIN as f64, SCORE_MAX as f64)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::normalizer::{MetricKey, ThresholdNormalizer, ThresholdTable};

    #[test]
    fn test_grade_bands() {
        assert_eq!(Grade::from_score(20), Grade::Poor);
        assert_eq!(Grade::from_score(29), Grade::Poor);
        assert_eq!(Grade::from_score(30), Grade::Fringe);
        assert_eq!(Grade::from_score(44), Grade::BelowAverage);
        assert_eq!(Grade::from_score(45), Grade::Average);
        assert_eq!(Grade::from_score(54), Grade::Average);
        assert_eq!(Grade::from_score(55), Grade::AboveAverage);
        assert_eq!(Grade::from_score(60), Grade::Plus);
        assert_eq!(Grade::from_score(70), Grade::PlusPlus);
        assert_eq!(Grade::from_score(80), Grade::PlusPlus);
    }

    #[test]
    fn test_grade_serializes_as_label() {
        let json = serde_json::to_string(&Grade::BelowAverage).unwrap();
        assert_eq!(json, "\"Below Avg\"");
        assert_eq!(Grade::PlusPlus.to_string(), "Plus-Plus");
    }

    #[test]
    fn test_default_weights_validate() {
        assert!(CompositeWeights::default().validate().is_ok());
        let bad = CompositeWeights {
            body: 0.5,
            bat: 0.5,
            brain: 0.2,
            ball: 0.0,
        };
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::InvalidWeights { .. })
        ));
        let negative = CompositeWeights {
            body: 1.2,
            bat: -0.2,
            brain: 0.0,
            ball: 0.0,
        };
        assert!(matches!(
            negative.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_flow_excludes_unavailable_components() {
        let table = ThresholdTable::default();
        let normalizer = ThresholdNormalizer::new(&table);
        let flow = FlowScore::from_components(vec![
            normalizer.score(MetricKey::PelvisVelocity, Some(800.0)),
            normalizer.score(MetricKey::LegsEnergy, None),
        ]);
        assert_eq!(flow.score, 80);
        assert!(flow.has_data());

        let empty = FlowScore::from_components(vec![normalizer.score(MetricKey::LegsEnergy, None)]);
        assert_eq!(empty.score, 50);
        assert!(!empty.has_data());
    }

    #[test]
    fn test_flow_counts_gated_as_neutral() {
        let table = ThresholdTable::default();
        let normalizer = ThresholdNormalizer::new(&table);
        let flow = FlowScore::from_components(vec![
            normalizer.score_gated(MetricKey::DeliveredEnergyCv, Some(5.0), true),
            normalizer.score(MetricKey::SequenceRate, Some(100.0)),
        ]);
        assert_eq!(flow.score, 65);
    }

    #[test]
    fn test_composite_weighted_sum() {
        let scorer = CompositeScorer::new(CompositeWeights::default());
        let dims = DimensionSet {
            brain: DimensionScore::new(50),
            body: DimensionScore::new(70),
            bat: DimensionScore::new(60),
            ball: DimensionScore::new(30),
        };
        // 0.35*70 + 0.30*60 + 0.20*50 + 0.15*30 = 57.0
        let composite = scorer.composite(&dims);
        assert_eq!(composite.score, 57);
        assert_eq!(composite.grade, Grade::AboveAverage);
    }

    #[test]
    fn test_dimension_mean_of_flows() {
        let scorer = CompositeScorer::new(CompositeWeights::default());
        let a = FlowScore {
            score: 61,
            components: Vec::new(),
        };
        let b = FlowScore {
            score: 70,
            components: Vec::new(),
        };
        assert_eq!(scorer.dimension(&[&a, &b]).score, 66);
        assert_eq!(scorer.dimension(&[]).score, 50);
    }
}
