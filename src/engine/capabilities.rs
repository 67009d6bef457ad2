//! Capability detection: which optional data sources a session carries.
//!
//! One engine serves every input shape; the detected capabilities select a
//! [`ScoringMode`] instead of separate engines per data source.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ingest::{Channel, FrameTable, SensorTable};

/// Scoring path chosen for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Rotations and segment energies
    FullMotion,
    /// Segment energies only
    EnergyOnly,
    /// Rotations only (reduced confidence)
    KinematicsOnly,
    /// Bat-sensor swing summaries
    SensorOnly,
    /// Nothing usable
    Empty,
}

impl ScoringMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMode::FullMotion => "full_motion",
            ScoringMode::EnergyOnly => "energy_only",
            ScoringMode::KinematicsOnly => "kinematics_only",
            ScoringMode::SensorOnly => "sensor_only",
            ScoringMode::Empty => "empty",
        }
    }

    pub fn is_motion(self) -> bool {
        matches!(
            self,
            ScoringMode::FullMotion | ScoringMode::EnergyOnly | ScoringMode::KinematicsOnly
        )
    }
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which channel families are present with data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCapabilities {
    pub rotation: bool,
    pub joint_angles: bool,
    pub energy: bool,
    pub bat_energy: bool,
    pub momentum: bool,
    pub speed: bool,
    pub contact_marker: bool,
    pub sensor_swings: bool,
}

impl DataCapabilities {
    /// Inspect the parsed tables
    pub fn detect(
        kinematics: Option<&FrameTable>,
        energy: Option<&FrameTable>,
        sensor: Option<&SensorTable>,
    ) -> Self {
        let tables: Vec<&FrameTable> = kinematics.into_iter().chain(energy).collect();
        let any = |channel: Channel| tables.iter().any(|t| t.has_channel(channel));

        Self {
            rotation: any(Channel::PelvisRot) || any(Channel::TorsoRot),
            joint_angles: Channel::JOINT_ANGLES.iter().any(|c| any(*c)),
            energy: Channel::ENERGIES.iter().any(|c| any(*c)),
            bat_energy: any(Channel::BatKe),
            momentum: any(Channel::BatMomX) || any(Channel::BatMomY) || any(Channel::BatMomZ),
            speed: any(Channel::HandSpeed) || any(Channel::BatSpeed),
            contact_marker: any(Channel::ContactMarker) || any(Channel::TimeToContact),
            sensor_swings: sensor.map_or(false, |s| !s.is_empty()),
        }
    }

    /// Motion data takes precedence over sensor summaries
    pub fn mode(&self) -> ScoringMode {
        let kinematic = self.rotation || self.joint_angles;
        match (kinematic, self.energy) {
            (true, true) => ScoringMode::FullMotion,
            (false, true) => ScoringMode::EnergyOnly,
            (true, false) => ScoringMode::KinematicsOnly,
            (false, false) if self.sensor_swings => ScoringMode::SensorOnly,
            (false, false) => ScoringMode::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{RawFrame, SensorSwing};

    fn table(channels: &[Channel]) -> FrameTable {
        let frames: Vec<RawFrame> = (0..3)
            .map(|i| {
                channels
                    .iter()
                    .fold(RawFrame::new("1", i as f64 * 0.01), |f, c| f.with(*c, 1.0))
            })
            .collect();
        FrameTable::from_frames(&frames, 240.0)
    }

    #[test]
    fn test_modes() {
        let kin = table(&[Channel::PelvisRot, Channel::TorsoRot]);
        let energy = table(&[Channel::LegsKe, Channel::BatKe]);

        let caps = DataCapabilities::detect(Some(&kin), Some(&energy), None);
        assert_eq!(caps.mode(), ScoringMode::FullMotion);
        assert!(caps.bat_energy);

        assert_eq!(
            DataCapabilities::detect(None, Some(&energy), None).mode(),
            ScoringMode::EnergyOnly
        );
        assert_eq!(
            DataCapabilities::detect(Some(&kin), None, None).mode(),
            ScoringMode::KinematicsOnly
        );
        assert_eq!(DataCapabilities::detect(None, None, None).mode(), ScoringMode::Empty);
    }

    #[test]
    fn test_sensor_mode_only_without_motion() {
        let sensor = SensorTable::new(vec![SensorSwing {
            swing_id: "1".to_string(),
            bat_speed_mph: 65.0,
            hand_speed_mph: 21.0,
            time_to_contact_ms: None,
            attack_angle_deg: None,
        }]);
        assert_eq!(
            DataCapabilities::detect(None, None, Some(&sensor)).mode(),
            ScoringMode::SensorOnly
        );
        let energy = table(&[Channel::TotalKe]);
        assert_eq!(
            DataCapabilities::detect(None, Some(&energy), Some(&sensor)).mode(),
            ScoringMode::EnergyOnly
        );
        assert_eq!(
            DataCapabilities::detect(None, None, Some(&SensorTable::default())).mode(),
            ScoringMode::Empty
        );
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ScoringMode::KinematicsOnly).unwrap(),
            "\"kinematics_only\""
        );
    }
}
