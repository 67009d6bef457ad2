// Analysis module - swing pipeline from frames to a leak classification
//
// Architecture:
// - segmenter: FrameTable(s) -> Swing (stride, contact, confidence tier)
// - features: Swing -> SwingFeatures
// - aggregator: [SwingFeatures] -> SessionMetrics
// - decision: generic first-match rule list
// - leak: SessionMetrics -> LeakResult
//
// Pipeline: SwingSegmenter → FeatureExtractor → SessionAggregator → LeakClassifier
// Every stage is a pure function of its input and the engine configuration.

pub mod aggregator;
pub mod decision;
pub mod features;
pub mod leak;
pub mod segmenter;

pub use aggregator::{CvMetric, SessionAggregator, SessionMetrics};
pub use features::{FeatureExtractor, SwingFeatures};
pub use leak::{LeakClassifier, LeakResult, LeakType};
pub use segmenter::{
    ContactConfidence, ContactMethod, SegmentationOutcome, Swing, SwingSegmenter, SwingTrack,
    TrackKind,
};
