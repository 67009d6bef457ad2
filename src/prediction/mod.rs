// Prediction module - speed projections and sensor-only tiered predictions
//
// - projection: delivered energy (or measured speed) -> bat/exit speed, level clamped
// - sensor: release/timing/upstream predictions with explicit confidence tiers

pub mod projection;
pub mod sensor;

pub use projection::{EnergyInputs, LevelBounds, LevelTable, Projection, ProjectionConfig, ProjectionModel};
pub use sensor::{
    ConfidencePredictor, ConfidenceTier, KineticPotential, Prediction, SensorAssessment,
    SensorConfig,
};
