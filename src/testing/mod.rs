//! Testability harness utilities.
//!
//! `synthetic` generates seeded motion-capture and bat-sensor sessions. The
//! unit tests, the integration tests, the fixture harness and the CLI
//! `synth` command all draw on it, so it ships with the library.

pub mod synthetic;

pub use synthetic::{
    frames_to_csv, sensor_csv, sensor_swings, SyntheticProfile, SyntheticSession,
    FRAMES_PER_SWING, SAMPLE_RATE_HZ,
};
