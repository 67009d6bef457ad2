//! Seeded synthetic swing sessions.
//!
//! Generates kinematics and energy exports shaped like real motion-capture
//! data (sigmoid segment rotations, Gaussian segment energies, a little
//! noise) so the whole pipeline can be exercised without capture files.
//! Each profile is built so a known leak wins the classification.
//!
//! Layout of every swing: 120 frames at 240 Hz, stride near frame 24, bat
//! energy peaking at frame 94 (the detected contact).

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::analysis::leak::LeakType;
use crate::config::PlayerLevel;
use crate::engine::core::SessionInput;
use crate::ingest::{Channel, FrameTable, RawFrame, SensorSwing};

/// Frames per synthetic swing
pub const FRAMES_PER_SWING: usize = 120;

/// Synthetic capture rate (Hz)
pub const SAMPLE_RATE_HZ: f64 = 240.0;

/// Frame the contact flag is raised on when markers are enabled
pub const MARKER_FRAME: usize = 94;

const ROTATION_NOISE_DEG: f64 = 0.05;
const ENERGY_NOISE: f64 = 0.005;
const AMPLITUDE_JITTER: f64 = 0.05;

/// Movement pattern of a synthetic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticProfile {
    /// Pelvis leads torso, bat receives the energy
    Clean,
    /// Torso rotation peaks before the pelvis
    Disconnect,
    /// No bat energy and almost nothing in the arms
    NoDelivery,
    /// Legs energy peaks after contact
    LateEngine,
}

impl SyntheticProfile {
    pub const ALL: [SyntheticProfile; 4] = [
        SyntheticProfile::Clean,
        SyntheticProfile::Disconnect,
        SyntheticProfile::NoDelivery,
        SyntheticProfile::LateEngine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SyntheticProfile::Clean => "clean",
            SyntheticProfile::Disconnect => "disconnect",
            SyntheticProfile::NoDelivery => "no-delivery",
            SyntheticProfile::LateEngine => "late-engine",
        }
    }

    /// Leak the default classifier assigns to this profile
    pub fn expected_leak(self) -> LeakType {
        match self {
            SyntheticProfile::Clean => LeakType::CleanTransfer,
            SyntheticProfile::Disconnect => LeakType::CoreDisconnect,
            SyntheticProfile::NoDelivery => LeakType::NoBatDelivery,
            SyntheticProfile::LateEngine => LeakType::LateEngine,
        }
    }

    /// Sigmoid centres (frames) of pelvis and torso rotation
    fn rotation_centres(self) -> (f64, f64) {
        match self {
            SyntheticProfile::Disconnect => (86.0, 74.0),
            _ => (70.0, 80.0),
        }
    }

    fn legs_peak_frame(self) -> f64 {
        match self {
            SyntheticProfile::LateEngine => 105.0,
            _ => 80.0,
        }
    }

    fn arms_amplitude(self) -> f64 {
        match self {
            SyntheticProfile::NoDelivery => 10.0,
            _ => 180.0,
        }
    }

    fn has_bat_energy(self) -> bool {
        self != SyntheticProfile::NoDelivery
    }
}

impl fmt::Display for SyntheticProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyntheticProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "clean" => Ok(SyntheticProfile::Clean),
            "disconnect" | "core-disconnect" => Ok(SyntheticProfile::Disconnect),
            "no-delivery" | "no-bat-delivery" => Ok(SyntheticProfile::NoDelivery),
            "late-engine" => Ok(SyntheticProfile::LateEngine),
            other => Err(format!("unknown synthetic profile '{}'", other)),
        }
    }
}

/// A reproducible synthetic session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSession {
    pub profile: SyntheticProfile,
    pub swings: usize,
    pub seed: u64,
    /// Raise an explicit contact flag on the kinematics export
    pub contact_marker: bool,
}

impl SyntheticSession {
    pub fn new(profile: SyntheticProfile, swings: usize, seed: u64) -> Self {
        Self {
            profile,
            swings,
            seed,
            contact_marker: false,
        }
    }

    pub fn with_contact_marker(mut self, enabled: bool) -> Self {
        self.contact_marker = enabled;
        self
    }

    /// Kinematics rows: pelvis/torso rotation and lead knee flexion
    pub fn kinematics_frames(&self) -> Vec<RawFrame> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (pelvis_centre, torso_centre) = self.profile.rotation_centres();
        let mut frames = Vec::with_capacity(self.swings * FRAMES_PER_SWING);

        for swing in 0..self.swings {
            let id = (swing + 1).to_string();
            let pelvis_span = 90.0 * jitter(&mut rng);
            let torso_span = 120.0 * jitter(&mut rng);
            for i in 0..FRAMES_PER_SWING {
                let pelvis = sigmoid(i, pelvis_centre, 8.0) * pelvis_span;
                let torso = -20.0 + sigmoid(i, torso_centre, 8.0) * torso_span;
                let knee = 150.0 + 20.0 * sigmoid(i, 84.0, 6.0);
                let mut frame = RawFrame::new(id.clone(), i as f64 / SAMPLE_RATE_HZ)
                    .with(Channel::PelvisRot, pelvis + noise(&mut rng, ROTATION_NOISE_DEG))
                    .with(Channel::TorsoRot, torso + noise(&mut rng, ROTATION_NOISE_DEG))
                    .with(Channel::LeadKnee, knee);
                if self.contact_marker {
                    let flag = if i == MARKER_FRAME { 1.0 } else { 0.0 };
                    frame = frame.with(Channel::ContactMarker, flag);
                }
                frames.push(frame);
            }
        }
        frames
    }

    /// Energy rows: segment kinetic energies (J)
    pub fn energy_frames(&self) -> Vec<RawFrame> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(0xE4E4));
        let legs_peak = self.profile.legs_peak_frame();
        let arms_amp = self.profile.arms_amplitude();
        let mut frames = Vec::with_capacity(self.swings * FRAMES_PER_SWING);

        for swing in 0..self.swings {
            let id = (swing + 1).to_string();
            let scale = jitter(&mut rng);
            for i in 0..FRAMES_PER_SWING {
                let mut wobble = || 1.0 + noise(&mut rng, ENERGY_NOISE);
                let legs = gaussian(i, legs_peak, 10.0) * 300.0 * scale * wobble();
                let torso = gaussian(i, 86.0, 8.0) * 200.0 * scale * wobble();
                let arms = gaussian(i, 90.0, 7.0) * arms_amp * scale * wobble();
                let bat = gaussian(i, 94.0, 6.0) * 450.0 * scale * wobble();
                let has_bat = self.profile.has_bat_energy();
                let total = legs + torso + arms + if has_bat { bat } else { 0.0 } + 20.0;

                let mut frame = RawFrame::new(id.clone(), i as f64 / SAMPLE_RATE_HZ)
                    .with(Channel::LegsKe, legs)
                    .with(Channel::TorsoKe, torso)
                    .with(Channel::ArmsKe, arms)
                    .with(Channel::TotalKe, total);
                if has_bat {
                    frame = frame.with(Channel::BatKe, bat);
                }
                frames.push(frame);
            }
        }
        frames
    }

    pub fn kinematics_table(&self) -> FrameTable {
        FrameTable::from_frames(&self.kinematics_frames(), SAMPLE_RATE_HZ)
    }

    pub fn energy_table(&self) -> FrameTable {
        FrameTable::from_frames(&self.energy_frames(), SAMPLE_RATE_HZ)
    }

    pub fn session_input(&self, level: PlayerLevel) -> SessionInput {
        SessionInput::motion(
            Some(self.kinematics_table()),
            Some(self.energy_table()),
            level,
        )
    }

    pub fn kinematics_csv(&self) -> Result<String> {
        frames_to_csv(&self.kinematics_frames())
    }

    pub fn energy_csv(&self) -> Result<String> {
        frames_to_csv(&self.energy_frames())
    }
}

/// Bat-sensor swings around 65 mph bat speed and 21 mph hand speed
pub fn sensor_swings(count: usize, seed: u64) -> Vec<SensorSwing> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| SensorSwing {
            swing_id: (i + 1).to_string(),
            bat_speed_mph: 65.0 + noise(&mut rng, 2.0),
            hand_speed_mph: 21.0 + noise(&mut rng, 1.0),
            time_to_contact_ms: Some(150.0 + noise(&mut rng, 8.0)),
            attack_angle_deg: Some(8.0 + noise(&mut rng, 3.0)),
        })
        .collect()
}

/// Sensor export CSV for `sensor_swings`
pub fn sensor_csv(count: usize, seed: u64) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "swing_id",
        "bat_speed_mph",
        "hand_speed_mph",
        "time_to_contact",
        "attack_angle",
    ])?;
    for swing in sensor_swings(count, seed) {
        writer.write_record([
            swing.swing_id.clone(),
            format!("{:.2}", swing.bat_speed_mph),
            format!("{:.2}", swing.hand_speed_mph),
            swing
                .time_to_contact_ms
                .map(|v| format!("{:.1}", v))
                .unwrap_or_default(),
            swing
                .attack_angle_deg
                .map(|v| format!("{:.1}", v))
                .unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

/// Serialise frames with a `swing_id,time,<channels...>` header
pub fn frames_to_csv(frames: &[RawFrame]) -> Result<String> {
    let mut channels: Vec<Channel> = frames
        .iter()
        .flat_map(|f| f.values.keys().copied())
        .collect();
    channels.sort();
    channels.dedup();

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![
        Channel::SwingId.name().to_string(),
        Channel::Time.name().to_string(),
    ];
    header.extend(channels.iter().map(|c| c.name().to_string()));
    writer.write_record(&header)?;

    for frame in frames {
        let mut record = vec![
            frame.swing_id.clone(),
            frame.time.map(|t| format!("{:.6}", t)).unwrap_or_default(),
        ];
        record.extend(channels.iter().map(|c| {
            frame
                .values
                .get(c)
                .map(|v| format!("{:.4}", v))
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing CSV buffer: {}", err))?;
    String::from_utf8(bytes).context("synthetic CSV is not UTF-8")
}

fn sigmoid(i: usize, centre: f64, width: f64) -> f64 {
    1.0 / (1.0 + (-(i as f64 - centre) / width).exp())
}

fn gaussian(i: usize, centre: f64, sigma: f64) -> f64 {
    let d = i as f64 - centre;
    (-d * d / (2.0 * sigma * sigma)).exp()
}

fn noise(rng: &mut StdRng, amplitude: f64) -> f64 {
    rng.gen_range(-amplitude..=amplitude)
}

fn jitter(rng: &mut StdRng) -> f64 {
    1.0 + noise(rng, AMPLITUDE_JITTER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;

    #[test]
    fn test_same_seed_same_session() {
        let a = SyntheticSession::new(SyntheticProfile::Clean, 3, 11);
        let b = SyntheticSession::new(SyntheticProfile::Clean, 3, 11);
        assert_eq!(a.kinematics_frames(), b.kinematics_frames());
        assert_eq!(a.energy_csv().unwrap(), b.energy_csv().unwrap());

        let c = SyntheticSession::new(SyntheticProfile::Clean, 3, 12);
        assert_ne!(a.kinematics_frames(), c.kinematics_frames());
    }

    #[test]
    fn test_frame_counts_and_channels() {
        let session = SyntheticSession::new(SyntheticProfile::NoDelivery, 4, 1);
        let energy = session.energy_table();
        assert_eq!(energy.len(), 4 * FRAMES_PER_SWING);
        assert!(!energy.has_channel(Channel::BatKe));
        assert!(energy.has_channel(Channel::ArmsKe));
        assert_eq!(energy.swing_groups().len(), 4);
    }

    #[test]
    fn test_csv_parses_back() {
        let session = SyntheticSession::new(SyntheticProfile::Clean, 2, 5).with_contact_marker(true);
        let csv = session.kinematics_csv().unwrap();
        assert!(csv.starts_with("swing_id,time,"));
        let table = FrameTable::from_csv_str(&csv, &IngestConfig::default()).unwrap();
        assert_eq!(table.len(), 2 * FRAMES_PER_SWING);
        assert!(table.has_channel(Channel::ContactMarker));
        assert_eq!(table.report().coerced_cells, 0);
    }

    #[test]
    fn test_sensor_csv() {
        let csv = sensor_csv(5, 3).unwrap();
        assert_eq!(csv.lines().count(), 6);
        let swings = sensor_swings(5, 3);
        assert!(swings.iter().all(|s| s.bat_speed_mph > 60.0 && s.hand_speed_mph > 19.0));
    }

    #[test]
    fn test_profile_names_roundtrip() {
        for profile in SyntheticProfile::ALL {
            assert_eq!(profile.as_str().parse::<SyntheticProfile>(), Ok(profile));
        }
        assert!("sideways".parse::<SyntheticProfile>().is_err());
    }
}
