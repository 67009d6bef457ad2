// Scoring module - 20-80 normalization, composite roll-up, score object
//
// - normalizer: raw aggregate -> ScoreComponent via versioned bands
// - composite: components -> flows -> dimensions -> composite + grades
// - report: FourBScore and the data-quality report

pub mod composite;
pub mod normalizer;
pub mod report;

pub use composite::{CompositeScorer, CompositeWeights, DimensionScore, DimensionSet, FlowScore, Grade};
pub use normalizer::{
    ComponentStatus, MetricBand, MetricKey, ScoreComponent, ThresholdNormalizer, ThresholdTable,
    NEUTRAL_SCORE,
};
pub use report::{DataQualityReport, FourBScore, ParseSummary, SwingContact, SCHEMA_VERSION};
