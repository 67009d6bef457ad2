// Public API - the engine's function boundary
//
// Callers hand over raw export text plus optional calibration and get one
// FourBScore back. Nothing here returns an error: an unreadable export is
// logged, treated as absent and reported as a data-quality warning, and a
// session with nothing usable comes back as the neutral score object.

use crate::calibration::PlayerCalibration;
use crate::config::{EngineConfig, PlayerLevel};
use crate::engine::core::{ScoringEngine, SessionInput};
use crate::error::{log_calibration_error, log_ingest_error, IngestError};
use crate::ingest::{FrameTable, SensorTable};
use crate::scoring::report::FourBScore;

/// Build the engine for a session, overlaying calibration when it is valid
///
/// # Returns
/// The engine and, when the calibration was rejected, a warning describing why
pub fn engine_for(
    config: &EngineConfig,
    calibration: Option<&PlayerCalibration>,
) -> (ScoringEngine, Option<String>) {
    match calibration {
        None => (ScoringEngine::new(config.clone()), None),
        Some(calibration) => match ScoringEngine::with_calibration(config.clone(), calibration) {
            Ok(engine) => (engine, None),
            Err(err) => {
                log_calibration_error(&err, "engine_for");
                (
                    ScoringEngine::new(config.clone()),
                    Some(format!("calibration ignored: {}", err)),
                )
            }
        },
    }
}

/// Score a motion-capture session from CSV exports
///
/// # Arguments
/// * `kinematics_csv` - Rotation/joint-angle export, if captured
/// * `energy_csv` - Segment kinetic-energy export, if captured
/// * `level` - Competitive level used for projection clamps
/// * `calibration` - Optional per-player overrides
/// * `config` - Engine configuration
pub fn score_session(
    kinematics_csv: Option<&str>,
    energy_csv: Option<&str>,
    level: PlayerLevel,
    calibration: Option<&PlayerCalibration>,
    config: &EngineConfig,
) -> FourBScore {
    let mut warnings = Vec::new();
    let (engine, calibration_warning) = engine_for(config, calibration);
    warnings.extend(calibration_warning);

    let kinematics = kinematics_csv.and_then(|text| {
        parse_or_warn("kinematics", FrameTable::from_csv_str(text, &config.ingest), &mut warnings)
    });
    let energy = energy_csv.and_then(|text| {
        parse_or_warn("energy", FrameTable::from_csv_str(text, &config.ingest), &mut warnings)
    });

    let mut score = engine.score(&SessionInput::motion(kinematics, energy, level));
    for warning in warnings {
        score.data_quality.warn(warning);
    }
    score
}

/// Score a bat-sensor session from its swing-summary CSV
pub fn score_sensor_session(
    sensor_csv: &str,
    level: PlayerLevel,
    calibration: Option<&PlayerCalibration>,
    config: &EngineConfig,
) -> FourBScore {
    let mut warnings = Vec::new();
    let (engine, calibration_warning) = engine_for(config, calibration);
    warnings.extend(calibration_warning);

    let sensor = parse_or_warn(
        "sensor",
        SensorTable::from_csv_str(sensor_csv, &config.ingest),
        &mut warnings,
    );
    let input = SessionInput {
        sensor,
        level,
        ..SessionInput::default()
    };

    let mut score = engine.score(&input);
    for warning in warnings {
        score.data_quality.warn(warning);
    }
    score
}

fn parse_or_warn<T>(
    export: &str,
    parsed: Result<T, IngestError>,
    warnings: &mut Vec<String>,
) -> Option<T> {
    match parsed {
        Ok(table) => Some(table),
        Err(err) => {
            log_ingest_error(&err, export);
            warnings.push(format!("{} export unreadable: {}", export, err));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::leak::LeakType;
    use crate::engine::ScoringMode;
    use crate::testing::synthetic::{sensor_csv, SyntheticProfile, SyntheticSession};

    #[test]
    fn test_score_session_from_csv() {
        let session = SyntheticSession::new(SyntheticProfile::Clean, 4, 21);
        let kinematics = session.kinematics_csv().unwrap();
        let energy = session.energy_csv().unwrap();
        let score = score_session(
            Some(&kinematics),
            Some(&energy),
            PlayerLevel::HighSchool,
            None,
            &EngineConfig::default(),
        );
        assert_eq!(score.mode, ScoringMode::FullMotion);
        assert_eq!(score.data_quality.swing_count, 4);
        assert_eq!(score.leak.leak_type, LeakType::CleanTransfer);
    }

    #[test]
    fn test_unreadable_input_is_neutral_with_warning() {
        let score = score_session(
            Some(""),
            Some("just,some\nwords,here\n"),
            PlayerLevel::HighSchool,
            None,
            &EngineConfig::default(),
        );
        assert_eq!(score.mode, ScoringMode::Empty);
        assert_eq!(score.composite.score, 50);
        let warnings = &score.data_quality.warnings;
        assert!(warnings.iter().any(|w| w == "no valid swings found"));
        assert!(warnings.iter().any(|w| w.starts_with("kinematics export unreadable")));
        assert!(warnings.iter().any(|w| w.starts_with("energy export unreadable")));
    }

    #[test]
    fn test_invalid_calibration_is_ignored_with_warning() {
        let mut calibration = PlayerCalibration::new("p9");
        calibration.speed_coefficient = Some(99.0);
        let session = SyntheticSession::new(SyntheticProfile::Clean, 3, 2);
        let energy = session.energy_csv().unwrap();
        let score = score_session(
            None,
            Some(&energy),
            PlayerLevel::College,
            Some(&calibration),
            &EngineConfig::default(),
        );
        assert_eq!(score.mode, ScoringMode::EnergyOnly);
        assert!(score
            .data_quality
            .warnings
            .iter()
            .any(|w| w.starts_with("calibration ignored")));
    }

    #[test]
    fn test_score_sensor_session() {
        let csv = sensor_csv(6, 4).unwrap();
        let score = score_sensor_session(&csv, PlayerLevel::College, None, &EngineConfig::default());
        assert_eq!(score.mode, ScoringMode::SensorOnly);
        assert_eq!(score.predictions.len(), 3);
        assert!(score.kinetic_potential.is_some());
    }
}
