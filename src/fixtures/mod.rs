//! Fixture utilities for the deterministic CLI harness.
//!
//! This module discovers golden session exports on disk, parses optional
//! expectation JSON, and runs the exports through the public scoring API.
//! A fixture is a set of files sharing one stem:
//! `<name>.kinematics.csv`, `<name>.energy.csv`, `<name>.sensor.csv` and
//! `<name>.expect.json`, any of which may be absent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::leak::LeakType;
use crate::analysis::segmenter::ContactMethod;
use crate::api::{score_sensor_session, score_session};
use crate::config::{EngineConfig, PlayerLevel};
use crate::engine::capabilities::ScoringMode;
use crate::scoring::report::FourBScore;

/// Default location for fixture CSV/JSON assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const KINEMATICS_SUFFIX: &str = ".kinematics.csv";
const ENERGY_SUFFIX: &str = ".energy.csv";
const SENSOR_SUFFIX: &str = ".sensor.csv";
const EXPECT_SUFFIX: &str = ".expect.json";

/// Metadata describing an available fixture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FixtureMetadata {
    pub name: String,
    pub kinematics_path: Option<PathBuf>,
    pub energy_path: Option<PathBuf>,
    pub sensor_path: Option<PathBuf>,
    pub expect_path: Option<PathBuf>,
}

impl FixtureMetadata {
    pub fn has_data(&self) -> bool {
        self.kinematics_path.is_some() || self.energy_path.is_some() || self.sensor_path.is_some()
    }
}

/// Loaded fixture exports and expectations.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub kinematics: Option<String>,
    pub energy: Option<String>,
    pub sensor: Option<String>,
    pub expectations: Option<FixtureExpectations>,
}

/// JSON expectation schema for fixture verification.
///
/// Every check is optional; only the fields present are verified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureExpectations {
    pub fixture: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub level: Option<PlayerLevel>,
    #[serde(default)]
    pub swing_count: Option<usize>,
    #[serde(default)]
    pub mode: Option<ScoringMode>,
    #[serde(default)]
    pub leak: Option<LeakType>,
    /// Method every swing's contact frame must come from
    #[serde(default)]
    pub contact_method: Option<ContactMethod>,
    #[serde(default)]
    pub composite_min: Option<u8>,
    #[serde(default)]
    pub composite_max: Option<u8>,
    /// Exact list of gated components
    #[serde(default)]
    pub gated: Option<Vec<String>>,
    /// Substrings that must each appear in some warning
    #[serde(default)]
    pub warnings_contain: Vec<String>,
}

impl FixtureExpectations {
    pub fn verify(&self, actual: &FourBScore) -> std::result::Result<(), ExpectationDiff> {
        let mut failures = Vec::new();
        let quality = &actual.data_quality;

        if let Some(expected) = self.swing_count {
            check(&mut failures, "swing_count", expected, quality.swing_count);
        }
        if let Some(expected) = self.mode {
            check(&mut failures, "mode", expected, actual.mode);
        }
        if let Some(expected) = self.leak {
            check(&mut failures, "leak", expected, actual.leak.leak_type);
        }
        if let Some(expected) = self.contact_method {
            let mut wanted = BTreeMap::new();
            if quality.swing_count > 0 {
                wanted.insert(expected.as_str().to_string(), quality.swing_count);
            }
            check(
                &mut failures,
                "contact_methods",
                wanted,
                quality.contact_methods.clone(),
            );
        }
        let composite = actual.composite.score;
        let min = self.composite_min.unwrap_or(20);
        let max = self.composite_max.unwrap_or(80);
        if composite < min || composite > max {
            failures.push(ExpectationFailure {
                field: "composite".to_string(),
                expected: serde_json::json!({ "min": min, "max": max }),
                actual: Value::from(composite),
            });
        }
        if let Some(expected) = &self.gated {
            check(&mut failures, "gated", expected.clone(), quality.gated_scores.clone());
        }
        for needle in &self.warnings_contain {
            if !quality.warnings.iter().any(|w| w.contains(needle.as_str())) {
                failures.push(ExpectationFailure {
                    field: "warnings".to_string(),
                    expected: Value::from(needle.clone()),
                    actual: serde_json::json!(quality.warnings),
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationDiff {
                fixture: self.fixture.clone(),
                failures,
            })
        }
    }
}

fn check<T: Serialize + PartialEq>(
    failures: &mut Vec<ExpectationFailure>,
    field: &str,
    expected: T,
    actual: T,
) {
    if expected != actual {
        failures.push(ExpectationFailure {
            field: field.to_string(),
            expected: serde_json::to_value(&expected).unwrap_or(Value::Null),
            actual: serde_json::to_value(&actual).unwrap_or(Value::Null),
        });
    }
}

/// Outcome of comparing a score with expectations.
#[derive(Debug)]
pub struct ExpectationDiff {
    pub fixture: String,
    pub failures: Vec<ExpectationFailure>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "fixture": self.fixture,
            "failures": self.failures.iter().map(|failure| {
                serde_json::json!({
                    "field": failure.field,
                    "expected": failure.expected,
                    "actual": failure.actual,
                })
            }).collect::<Vec<_>>()
        })
    }
}

/// Detailed diff entry for a single failed check.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectationFailure {
    pub field: String,
    pub expected: Value,
    pub actual: Value,
}

/// Catalog responsible for discovering fixtures on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures with at least one export, by name.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut by_name: BTreeMap<String, FixtureMetadata> = BTreeMap::new();
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((name, suffix)) = split_fixture_name(file_name) else {
                continue;
            };
            let metadata = by_name.entry(name.to_string()).or_insert_with(|| FixtureMetadata {
                name: name.to_string(),
                ..FixtureMetadata::default()
            });
            let slot = match suffix {
                KINEMATICS_SUFFIX => &mut metadata.kinematics_path,
                ENERGY_SUFFIX => &mut metadata.energy_path,
                SENSOR_SUFFIX => &mut metadata.sensor_path,
                _ => &mut metadata.expect_path,
            };
            *slot = Some(path.clone());
        }

        Ok(by_name.into_values().filter(|m| m.has_data()).collect())
    }

    /// Load fixture exports + expectations for the provided name.
    pub fn load(&self, fixture: &str, override_expect: Option<PathBuf>) -> Result<FixtureData> {
        let metadata = self.metadata_for(fixture)?;

        let read = |path: &Option<PathBuf>| -> Result<Option<String>> {
            path.as_ref()
                .map(|p| {
                    fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))
                })
                .transpose()
        };
        let kinematics = read(&metadata.kinematics_path)?;
        let energy = read(&metadata.energy_path)?;
        let sensor = read(&metadata.sensor_path)?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => {
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("reading expectation {}", path.display()))?;
                Some(
                    serde_json::from_str(&json)
                        .with_context(|| format!("parsing {}", path.display()))?,
                )
            }
            None => None,
        };

        Ok(FixtureData {
            metadata,
            kinematics,
            energy,
            sensor,
            expectations,
        })
    }

    fn metadata_for(&self, fixture: &str) -> Result<FixtureMetadata> {
        let existing = |suffix: &str| {
            let path = self.root.join(format!("{fixture}{suffix}"));
            path.exists().then_some(path)
        };
        let metadata = FixtureMetadata {
            name: fixture.to_string(),
            kinematics_path: existing(KINEMATICS_SUFFIX),
            energy_path: existing(ENERGY_SUFFIX),
            sensor_path: existing(SENSOR_SUFFIX),
            expect_path: existing(EXPECT_SUFFIX),
        };
        if metadata.has_data() {
            Ok(metadata)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn split_fixture_name(file_name: &str) -> Option<(&str, &'static str)> {
    [KINEMATICS_SUFFIX, ENERGY_SUFFIX, SENSOR_SUFFIX, EXPECT_SUFFIX]
        .into_iter()
        .find_map(|suffix| {
            file_name
                .strip_suffix(suffix)
                .filter(|name| !name.is_empty())
                .map(|name| (name, suffix))
        })
}

/// Executes fixtures through the public scoring API.
pub struct FixtureRunner {
    config: EngineConfig,
}

impl FixtureRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Score a loaded fixture; motion exports take precedence over sensor rows
    pub fn run(&self, data: &FixtureData) -> FourBScore {
        let level = data
            .expectations
            .as_ref()
            .and_then(|e| e.level)
            .unwrap_or_default();

        match (&data.kinematics, &data.energy, &data.sensor) {
            (None, None, Some(sensor)) => score_sensor_session(sensor, level, None, &self.config),
            (kinematics, energy, _) => score_session(
                kinematics.as_deref(),
                energy.as_deref(),
                level,
                None,
                &self.config,
            ),
        }
    }
}

impl Default for FixtureRunner {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
