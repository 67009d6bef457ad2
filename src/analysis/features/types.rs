// Feature data structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::segmenter::{ContactConfidence, ContactMethod};
use crate::ingest::Channel;

/// Peak timings in milliseconds relative to contact (negative = before)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakTiming {
    pub pelvis_velocity_ms: Option<f64>,
    pub torso_velocity_ms: Option<f64>,
    pub legs_ke_ms: Option<f64>,
    pub torso_ke_ms: Option<f64>,
    pub arms_ke_ms: Option<f64>,
    pub bat_ke_ms: Option<f64>,
    pub total_ke_ms: Option<f64>,
}

impl PeakTiming {
    pub fn energy(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::LegsKe => self.legs_ke_ms,
            Channel::TorsoKe => self.torso_ke_ms,
            Channel::ArmsKe => self.arms_ke_ms,
            Channel::BatKe => self.bat_ke_ms,
            Channel::TotalKe => self.total_ke_ms,
            _ => None,
        }
    }

    pub(crate) fn set_energy(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::LegsKe => self.legs_ke_ms = Some(value),
            Channel::TorsoKe => self.torso_ke_ms = Some(value),
            Channel::ArmsKe => self.arms_ke_ms = Some(value),
            Channel::BatKe => self.bat_ke_ms = Some(value),
            Channel::TotalKe => self.total_ke_ms = Some(value),
            _ => {}
        }
    }

    /// Upper-body energy (arms, else torso) peaks strictly before the legs
    pub fn upper_before_lower(&self) -> Option<bool> {
        let legs = self.legs_ke_ms?;
        let upper = self.arms_ke_ms.or(self.torso_ke_ms)?;
        Some(upper < legs)
    }
}

/// Per-swing metrics
///
/// Every metric is optional: a missing input channel leaves it `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwingFeatures {
    pub swing_id: String,
    pub contact_method: ContactMethod,
    pub contact_confidence: ContactConfidence,

    /// Peak pelvis angular velocity (deg/s)
    pub pelvis_peak_velocity: Option<f64>,
    /// Peak torso angular velocity (deg/s)
    pub torso_peak_velocity: Option<f64>,
    /// Peak |torso - pelvis| (deg)
    pub separation_peak: Option<f64>,
    /// Peak |d(torso - pelvis)/dt| (deg/s)
    pub separation_rate_peak: Option<f64>,

    /// Segment energy percentiles inside the swing window (J)
    pub legs_energy: Option<f64>,
    pub torso_energy: Option<f64>,
    pub arms_energy: Option<f64>,
    pub bat_energy: Option<f64>,
    pub total_energy: Option<f64>,

    /// Joint angles at contact (deg)
    pub joint_angles: BTreeMap<Channel, f64>,

    /// Pelvis velocity peak strictly before torso velocity peak
    pub proper_sequence: Option<bool>,

    pub timing: PeakTiming,
    /// Stride to contact (ms)
    pub swing_duration_ms: Option<f64>,
}

impl SwingFeatures {
    pub fn new(swing_id: impl Into<String>, contact_method: ContactMethod) -> Self {
        Self {
            swing_id: swing_id.into(),
            contact_method,
            contact_confidence: contact_method.confidence(),
            pelvis_peak_velocity: None,
            torso_peak_velocity: None,
            separation_peak: None,
            separation_rate_peak: None,
            legs_energy: None,
            torso_energy: None,
            arms_energy: None,
            bat_energy: None,
            total_energy: None,
            joint_angles: BTreeMap::new(),
            proper_sequence: None,
            timing: PeakTiming::default(),
            swing_duration_ms: None,
        }
    }

    pub fn energy(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::LegsKe => self.legs_energy,
            Channel::TorsoKe => self.torso_energy,
            Channel::ArmsKe => self.arms_energy,
            Channel::BatKe => self.bat_energy,
            Channel::TotalKe => self.total_energy,
            _ => None,
        }
    }

    pub(crate) fn set_energy(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::LegsKe => self.legs_energy = Some(value),
            Channel::TorsoKe => self.torso_energy = Some(value),
            Channel::ArmsKe => self.arms_energy = Some(value),
            Channel::BatKe => self.bat_energy = Some(value),
            Channel::TotalKe => self.total_energy = Some(value),
            _ => {}
        }
    }

    pub fn has_rotation(&self) -> bool {
        self.pelvis_peak_velocity.is_some() || self.torso_peak_velocity.is_some()
    }

    pub fn has_energy(&self) -> bool {
        Channel::ENERGIES.iter().any(|c| self.energy(*c).is_some())
    }

    /// Number of metrics computed from data
    pub fn usable_metrics(&self) -> usize {
        [
            self.pelvis_peak_velocity,
            self.torso_peak_velocity,
            self.separation_peak,
            self.separation_rate_peak,
            self.legs_energy,
            self.torso_energy,
            self.arms_energy,
            self.bat_energy,
            self.total_energy,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count()
            + self.joint_angles.len()
    }

    /// Legs energy peaks after contact
    pub fn legs_peak_after_contact(&self) -> Option<bool> {
        self.timing.legs_ke_ms.map(|ms| ms > 0.0)
    }
}
