// Calibration module - per-player overrides from the calibration store
//
// This module provides two components:
// 1. PlayerCalibration: optional coefficient overrides for one player
// 2. CalibrationValidator: range checks applied before any override is used
//
// The calibration flow:
// 1. Decode a PlayerCalibration (JSON)
// 2. Validate it
// 3. Overlay it on an EngineConfig (ScoringEngine::with_calibration)

pub mod state;
pub mod validation;

pub use state::PlayerCalibration;
pub use validation::CalibrationValidator;
