//! Engine module housing the scoring orchestration.
//!
//! `capabilities` inspects a session's tables and selects a `ScoringMode`;
//! `core` holds `ScoringEngine`, which runs the matching pipeline and
//! assembles the `FourBScore`.

pub mod capabilities;
pub mod core;

pub use capabilities::{DataCapabilities, ScoringMode};
pub use self::core::{ScoringEngine, SessionInput, MOTION_FLOWS, SENSOR_FLOWS};
