// 4B Engine Core - swing scoring library
// Turns motion-capture and bat-sensor exports into Brain/Body/Bat/Ball scores

// Module declarations
pub mod analysis;
pub mod api;
pub mod calibration;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod ingest;
pub mod prediction;
pub mod scoring;
pub mod testing;

// Re-exports for convenience
pub use api::{score_sensor_session, score_session};
pub use calibration::PlayerCalibration;
pub use config::{EngineConfig, PlayerLevel};
pub use engine::{DataCapabilities, ScoringEngine, ScoringMode, SessionInput};
pub use scoring::report::FourBScore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let score = ScoringEngine::default().score(&SessionInput::default());
        assert_eq!(score.mode, ScoringMode::Empty);
        assert_eq!(score.level, PlayerLevel::default());
    }
}
