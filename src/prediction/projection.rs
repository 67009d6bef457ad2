// Projection model - delivered energy to bat and exit speed
//
//   current = K * sqrt(delivered)
//   ceiling = K * sqrt(target_efficiency * total)      (never below current)
//   exit    = 1.25 * bat + 5
//
// Both bat speeds are clamped to the level's bounds. A severe leak then
// forces ceiling >= current + min_severe_gap_mph, even past the level cap.

use serde::{Deserialize, Serialize};

use crate::config::PlayerLevel;
use crate::error::ConfigError;

/// Physical bounds for one level (mph)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelBounds {
    pub bat_min: f64,
    pub bat_max: f64,
    pub exit_min: f64,
    pub exit_max: f64,
}

impl LevelBounds {
    pub const fn new(bat_min: f64, bat_max: f64, exit_min: f64, exit_max: f64) -> Self {
        Self {
            bat_min,
            bat_max,
            exit_min,
            exit_max,
        }
    }

    pub fn clamp_bat(&self, mph: f64) -> f64 {
        mph.clamp(self.bat_min, self.bat_max)
    }

    pub fn clamp_exit(&self, mph: f64) -> f64 {
        mph.clamp(self.exit_min, self.exit_max)
    }
}

/// Bounds per level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelTable {
    pub youth: LevelBounds,
    pub high_school: LevelBounds,
    pub college: LevelBounds,
    pub pro: LevelBounds,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            youth: LevelBounds::new(35.0, 60.0, 40.0, 80.0),
            high_school: LevelBounds::new(50.0, 75.0, 55.0, 100.0),
            college: LevelBounds::new(60.0, 82.0, 65.0, 108.0),
            pro: LevelBounds::new(65.0, 90.0, 75.0, 118.0),
        }
    }
}

impl LevelTable {
    pub fn bounds(&self, level: PlayerLevel) -> &LevelBounds {
        match level {
            PlayerLevel::Youth => &self.youth,
            PlayerLevel::HighSchool => &self.high_school,
            PlayerLevel::College => &self.college,
            PlayerLevel::Pro => &self.pro,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in [
            PlayerLevel::Youth,
            PlayerLevel::HighSchool,
            PlayerLevel::College,
            PlayerLevel::Pro,
        ] {
            let b = self.bounds(level);
            for (suffix, lo, hi) in [("bat", b.bat_min, b.bat_max), ("exit", b.exit_min, b.exit_max)] {
                if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
                    return Err(ConfigError::OutOfRange {
                        field: format!("projection.levels.{}.{}_min", level.as_str(), suffix),
                        value: lo,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Projection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// K in speed = K * sqrt(energy)
    pub speed_coefficient: f64,
    /// Coaching target for delivered / total energy
    pub target_efficiency: f64,
    /// Minimum ceiling - current gap when a severe leak is flagged (mph)
    pub min_severe_gap_mph: f64,
    pub exit_slope: f64,
    pub exit_intercept_mph: f64,
    /// Calibrated bat speed used when no delivered energy is available
    pub baseline_bat_speed_mph: Option<f64>,
    pub levels: LevelTable,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            speed_coefficient: 3.5,
            target_efficiency: 0.55,
            min_severe_gap_mph: 3.0,
            exit_slope: 1.25,
            exit_intercept_mph: 5.0,
            baseline_bat_speed_mph: None,
            levels: LevelTable::default(),
        }
    }
}

/// Where the current bat speed came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionSource {
    MeasuredEnergy,
    ProxyEnergy,
    CalibratedBaseline,
    SensorSpeed,
}

/// Projection block of the score object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub level: PlayerLevel,
    pub source: ProjectionSource,
    pub current_bat_speed_mph: f64,
    pub ceiling_bat_speed_mph: f64,
    pub current_exit_speed_mph: f64,
    pub ceiling_exit_speed_mph: f64,
    pub delivery_efficiency_pct: Option<f64>,
    pub headroom_mph: f64,
    pub guardrail_applied: bool,
    pub proxy_used: bool,
}

/// Energy inputs for a projection
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyInputs {
    pub delivered_j: Option<f64>,
    pub total_j: Option<f64>,
    pub efficiency_pct: Option<f64>,
    pub proxy: bool,
}

/// ProjectionModel converts energy or measured speed into bat/exit speeds
#[derive(Debug, Clone)]
pub struct ProjectionModel {
    config: ProjectionConfig,
}

impl ProjectionModel {
    pub fn new(config: &ProjectionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// K * sqrt(energy) in mph
    pub fn bat_speed(&self, energy_j: f64) -> f64 {
        self.config.speed_coefficient * energy_j.max(0.0).sqrt()
    }

    pub fn exit_speed(&self, bat_mph: f64) -> f64 {
        self.config.exit_slope * bat_mph + self.config.exit_intercept_mph
    }

    /// Project from session energy
    ///
    /// # Returns
    /// `None` when there is neither energy data nor a calibrated baseline
    pub fn from_energy(
        &self,
        inputs: EnergyInputs,
        level: PlayerLevel,
        severe_leak: bool,
    ) -> Option<Projection> {
        let delivered = inputs.delivered_j.filter(|e| e.is_finite() && *e > 0.0);
        let total = inputs.total_j.filter(|e| e.is_finite() && *e > 0.0);

        let (current, source) = match (delivered, self.config.baseline_bat_speed_mph) {
            (Some(energy), _) => (
                self.bat_speed(energy),
                if inputs.proxy {
                    ProjectionSource::ProxyEnergy
                } else {
                    ProjectionSource::MeasuredEnergy
                },
            ),
            (None, Some(baseline)) => (baseline, ProjectionSource::CalibratedBaseline),
            (None, None) if total.is_some() || inputs.delivered_j.is_some() => {
                (0.0, ProjectionSource::MeasuredEnergy)
            }
            (None, None) => return None,
        };

        let ceiling = total
            .map(|t| self.bat_speed(self.config.target_efficiency * t))
            .unwrap_or(current);

        Some(self.finish(
            current,
            ceiling,
            level,
            severe_leak,
            source,
            inputs.efficiency_pct,
            inputs.proxy,
        ))
    }

    /// Project from a measured bat speed plus estimated headroom
    pub fn from_speed(
        &self,
        current_mph: f64,
        potential_mph: f64,
        level: PlayerLevel,
        severe_leak: bool,
    ) -> Projection {
        self.finish(
            current_mph,
            current_mph + potential_mph.max(0.0),
            level,
            severe_leak,
            ProjectionSource::SensorSpeed,
            None,
            false,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        current: f64,
        ceiling: f64,
        level: PlayerLevel,
        severe_leak: bool,
        source: ProjectionSource,
        efficiency_pct: Option<f64>,
        proxy_used: bool,
    ) -> Projection {
        let bounds = self.config.levels.bounds(level);
        let current = round1(bounds.clamp_bat(current));
        let mut ceiling = round1(bounds.clamp_bat(ceiling.max(current)));
        if ceiling < current {
            ceiling = current;
        }

        let gap = self.config.min_severe_gap_mph;
        let mut guardrail_applied = false;
        if severe_leak && ceiling < current + gap {
            ceiling = current + gap;
            guardrail_applied = true;
            tracing::debug!(current, ceiling, "severe leak guardrail applied");
        }

        Projection {
            level,
            source,
            current_bat_speed_mph: current,
            ceiling_bat_speed_mph: ceiling,
            current_exit_speed_mph: round1(bounds.clamp_exit(self.exit_speed(current))),
            ceiling_exit_speed_mph: round1(bounds.clamp_exit(self.exit_speed(ceiling))),
            delivery_efficiency_pct: efficiency_pct.map(round1),
            headroom_mph: round1(ceiling - current),
            guardrail_applied,
            proxy_used,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ProjectionModel {
        ProjectionModel::new(&ProjectionConfig::default())
    }

    #[test]
    fn test_speed_formula() {
        let m = model();
        assert!((m.bat_speed(400.0) - 70.0).abs() < 1e-9);
        assert!((m.exit_speed(70.0) - 92.5).abs() < 1e-9);
        assert_eq!(m.bat_speed(-5.0), 0.0);
    }

    #[test]
    fn test_energy_projection() {
        let inputs = EnergyInputs {
            delivered_j: Some(400.0),
            total_j: Some(1000.0),
            efficiency_pct: Some(40.0),
            proxy: false,
        };
        let p = model().from_energy(inputs, PlayerLevel::College, false).unwrap();
        assert_eq!(p.source, ProjectionSource::MeasuredEnergy);
        assert_eq!(p.current_bat_speed_mph, 70.0);
        // 3.5 * sqrt(550) = 82.08 -> clamped to the college cap.
        assert_eq!(p.ceiling_bat_speed_mph, 82.0);
        assert_eq!(p.current_exit_speed_mph, 92.5);
        assert!(!p.guardrail_applied);
        assert_eq!(p.headroom_mph, 12.0);
    }

    #[test]
    fn test_level_clamp() {
        let inputs = EnergyInputs {
            delivered_j: Some(900.0),
            total_j: Some(2000.0),
            ..EnergyInputs::default()
        };
        let p = model().from_energy(inputs, PlayerLevel::Youth, false).unwrap();
        assert_eq!(p.current_bat_speed_mph, 60.0);
        assert_eq!(p.ceiling_bat_speed_mph, 60.0);
        assert_eq!(p.current_exit_speed_mph, 80.0);
    }

    #[test]
    fn test_guardrail_after_clamp() {
        let inputs = EnergyInputs {
            delivered_j: Some(900.0),
            total_j: Some(2000.0),
            ..EnergyInputs::default()
        };
        let p = model().from_energy(inputs, PlayerLevel::HighSchool, true).unwrap();
        assert_eq!(p.current_bat_speed_mph, 75.0);
        assert!(p.guardrail_applied);
        assert!(p.ceiling_bat_speed_mph >= p.current_bat_speed_mph + 3.0);
        // Exit speed stays inside the level's exit bounds.
        assert_eq!(p.ceiling_exit_speed_mph, 100.0);
    }

    #[test]
    fn test_tiny_delivery_floors_at_level_minimum() {
        let inputs = EnergyInputs {
            delivered_j: Some(6.5),
            total_j: Some(700.0),
            proxy: true,
            ..EnergyInputs::default()
        };
        let p = model().from_energy(inputs, PlayerLevel::HighSchool, true).unwrap();
        assert_eq!(p.source, ProjectionSource::ProxyEnergy);
        assert!(p.proxy_used);
        assert_eq!(p.current_bat_speed_mph, 50.0);
        assert!(p.ceiling_bat_speed_mph >= p.current_bat_speed_mph + 3.0);
    }

    #[test]
    fn test_baseline_and_missing_inputs() {
        assert!(model()
            .from_energy(EnergyInputs::default(), PlayerLevel::Pro, false)
            .is_none());

        let config = ProjectionConfig {
            baseline_bat_speed_mph: Some(68.0),
            ..ProjectionConfig::default()
        };
        let p = ProjectionModel::new(&config)
            .from_energy(EnergyInputs::default(), PlayerLevel::Pro, false)
            .unwrap();
        assert_eq!(p.source, ProjectionSource::CalibratedBaseline);
        assert_eq!(p.current_bat_speed_mph, 68.0);
    }

    #[test]
    fn test_from_speed() {
        let p = model().from_speed(66.0, 4.5, PlayerLevel::HighSchool, false);
        assert_eq!(p.source, ProjectionSource::SensorSpeed);
        assert_eq!(p.ceiling_bat_speed_mph, 70.5);
        assert_eq!(p.headroom_mph, 4.5);
    }

    #[test]
    fn test_level_table_validation() {
        assert!(LevelTable::default().validate().is_ok());
        let mut table = LevelTable::default();
        table.pro.bat_min = 95.0;
        assert!(table.validate().is_err());
    }
}
