// Swing segmenter - groups frames into swings and locates stride and contact
//
// Each swing id becomes one Swing made of up to two tracks (kinematics and
// energy exports describe the same swings independently). Contact is found
// with a ranked cascade; the first tier that yields a plausible frame wins:
//
//   1. explicit contact marker / time-to-contact column   (explicit)
//   2. hand/bat speed deceleration, else bat/total KE peak (high)
//   3. bat linear-momentum magnitude peak                  (medium)
//   4. torso angular-speed peak nudged forward             (low)
//   5. fixed fraction of the track                         (fallback)
//
// A candidate earlier than `implausible_fraction` of the track is rejected
// and the next tier is tried. Contact found on one track is carried to the
// other by time.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::config::SegmentationConfig;
use crate::ingest::{Channel, FrameTable};

/// How the contact frame was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    Marker,
    TimeToContact,
    SpeedDeceleration,
    EnergyPeak,
    MomentumPeak,
    TorsoRotation,
    FixedFraction,
}

impl ContactMethod {
    /// Detection order
    pub const CASCADE: [ContactMethod; 7] = [
        ContactMethod::Marker,
        ContactMethod::TimeToContact,
        ContactMethod::SpeedDeceleration,
        ContactMethod::EnergyPeak,
        ContactMethod::MomentumPeak,
        ContactMethod::TorsoRotation,
        ContactMethod::FixedFraction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContactMethod::Marker => "marker",
            ContactMethod::TimeToContact => "time_to_contact",
            ContactMethod::SpeedDeceleration => "speed_deceleration",
            ContactMethod::EnergyPeak => "energy_peak",
            ContactMethod::MomentumPeak => "momentum_peak",
            ContactMethod::TorsoRotation => "torso_rotation",
            ContactMethod::FixedFraction => "fixed_fraction",
        }
    }

    pub fn confidence(self) -> ContactConfidence {
        match self {
            ContactMethod::Marker | ContactMethod::TimeToContact => ContactConfidence::Explicit,
            ContactMethod::SpeedDeceleration | ContactMethod::EnergyPeak => ContactConfidence::High,
            ContactMethod::MomentumPeak => ContactConfidence::Medium,
            ContactMethod::TorsoRotation => ContactConfidence::Low,
            ContactMethod::FixedFraction => ContactConfidence::Fallback,
        }
    }
}

impl fmt::Display for ContactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence tier of a contact frame, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactConfidence {
    Explicit,
    High,
    Medium,
    Low,
    Fallback,
}

/// Which export a track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Kinematics,
    Energy,
}

/// Frames of one swing from one export
#[derive(Debug, Clone, PartialEq)]
pub struct SwingTrack {
    pub kind: TrackKind,
    times: Vec<f64>,
    columns: BTreeMap<Channel, Vec<f64>>,
    stride: usize,
    contact: usize,
    window_end: usize,
}

impl SwingTrack {
    /// Build a track from table rows already ordered by time
    pub fn from_rows(kind: TrackKind, table: &FrameTable, rows: &[usize]) -> Self {
        let times = rows.iter().map(|&r| table.times()[r]).collect();
        let columns = table
            .channels()
            .into_iter()
            .filter_map(|channel| {
                let column = table.channel(channel)?;
                let values: Vec<f64> = rows.iter().map(|&r| column[r]).collect();
                values
                    .iter()
                    .any(|v| v.is_finite())
                    .then_some((channel, values))
            })
            .collect();
        let last = rows.len().saturating_sub(1);
        Self {
            kind,
            times,
            columns,
            stride: 0,
            contact: last,
            window_end: last,
        }
    }

    /// Build a track directly from a time axis and columns
    pub fn from_columns(kind: TrackKind, times: Vec<f64>, columns: BTreeMap<Channel, Vec<f64>>) -> Self {
        let last = times.len().saturating_sub(1);
        Self {
            kind,
            times,
            columns,
            stride: 0,
            contact: last,
            window_end: last,
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Channel values, if the channel has at least one finite value
    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        self.columns
            .get(&channel)
            .filter(|values| values.iter().any(|v| v.is_finite()))
            .map(|values| values.as_slice())
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.columns.keys().copied()
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn contact(&self) -> usize {
        self.contact
    }

    /// Swing-phase window `[stride, contact]`, trimmed by time-to-contact
    pub fn window(&self) -> RangeInclusive<usize> {
        self.stride..=self.window_end
    }

    pub fn contact_time(&self) -> f64 {
        self.times.get(self.contact).copied().unwrap_or(0.0)
    }

    pub fn stride_time(&self) -> f64 {
        self.times.get(self.stride).copied().unwrap_or(0.0)
    }

    /// Milliseconds from contact to `index` (negative = before contact)
    pub fn ms_from_contact(&self, index: usize) -> f64 {
        let t = self.times.get(index).copied().unwrap_or(0.0);
        (t - self.contact_time()) * 1000.0
    }

    /// First frame at or after `time`, clamped to the last frame
    pub fn index_at_or_after(&self, time: f64) -> usize {
        self.times
            .iter()
            .position(|&t| t >= time)
            .unwrap_or_else(|| self.len().saturating_sub(1))
    }

    fn set_bounds(&mut self, stride: usize, contact: usize) {
        let last = self.len().saturating_sub(1);
        let stride = stride.min(last);
        let mut contact = contact.min(last);
        if contact < stride {
            contact = last;
        }
        self.stride = stride;
        self.contact = contact;
        self.window_end = self.trimmed_window_end();
    }

    /// Last frame in `[stride, contact]` at or before contact per the
    /// time-to-contact column, when one carries data
    fn trimmed_window_end(&self) -> usize {
        match self.channel(Channel::TimeToContact) {
            Some(ttc) => (self.stride..=self.contact)
                .rev()
                .find(|&i| ttc[i].is_finite() && ttc[i] >= 0.0)
                .unwrap_or(self.contact),
            None => self.contact,
        }
    }
}

/// One segmented swing
#[derive(Debug, Clone, PartialEq)]
pub struct Swing {
    pub swing_id: String,
    pub kinematics: Option<SwingTrack>,
    pub energy: Option<SwingTrack>,
    pub contact_method: ContactMethod,
    /// Track the contact frame was detected on
    pub contact_source: TrackKind,
}

impl Swing {
    pub fn confidence(&self) -> ContactConfidence {
        self.contact_method.confidence()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &SwingTrack> {
        self.kinematics.iter().chain(self.energy.iter())
    }

    /// First track carrying `channel`, kinematics before energy
    pub fn track_with(&self, channel: Channel) -> Option<(&SwingTrack, &[f64])> {
        self.tracks()
            .find_map(|track| track.channel(channel).map(|values| (track, values)))
    }

    /// Track the contact was detected on
    pub fn primary(&self) -> Option<&SwingTrack> {
        match self.contact_source {
            TrackKind::Kinematics => self.kinematics.as_ref().or(self.energy.as_ref()),
            TrackKind::Energy => self.energy.as_ref().or(self.kinematics.as_ref()),
        }
    }
}

/// Swing id dropped during segmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedSwing {
    pub swing_id: String,
    pub frames: usize,
}

/// Result of segmenting one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentationOutcome {
    pub swings: Vec<Swing>,
    pub discarded: Vec<DiscardedSwing>,
}

/// Splits frame tables into swings
pub struct SwingSegmenter<'a> {
    config: &'a SegmentationConfig,
}

impl<'a> SwingSegmenter<'a> {
    pub fn new(config: &'a SegmentationConfig) -> Self {
        Self { config }
    }

    /// Segment one session
    ///
    /// # Arguments
    /// * `kinematics` - Rotation/joint-angle export, if present
    /// * `energy` - Segment-energy export, if present
    ///
    /// # Returns
    /// Swings in order of first appearance (kinematics ids first), plus the
    /// ids discarded for having no track of at least `min_swing_frames`
    pub fn segment(
        &self,
        kinematics: Option<&FrameTable>,
        energy: Option<&FrameTable>,
    ) -> SegmentationOutcome {
        let kin_groups = kinematics.map(|t| t.swing_groups()).unwrap_or_default();
        let energy_groups = energy.map(|t| t.swing_groups()).unwrap_or_default();

        let mut order: Vec<&str> = Vec::new();
        for (id, _) in kin_groups.iter().chain(energy_groups.iter()) {
            if !order.contains(&id.as_str()) {
                order.push(id.as_str());
            }
        }

        let mut outcome = SegmentationOutcome::default();
        for id in order {
            let kin_track = kinematics.and_then(|table| {
                kin_groups
                    .iter()
                    .find(|(gid, _)| gid == id)
                    .map(|(_, rows)| SwingTrack::from_rows(TrackKind::Kinematics, table, rows))
            });
            let energy_track = energy.and_then(|table| {
                energy_groups
                    .iter()
                    .find(|(gid, _)| gid == id)
                    .map(|(_, rows)| SwingTrack::from_rows(TrackKind::Energy, table, rows))
            });

            let frames = kin_track.as_ref().map_or(0, |t| t.len())
                + energy_track.as_ref().map_or(0, |t| t.len());
            match self.build_swing(id, kin_track, energy_track) {
                Some(swing) => outcome.swings.push(swing),
                None => {
                    tracing::debug!(swing_id = id, frames, "discarding short swing");
                    outcome.discarded.push(DiscardedSwing {
                        swing_id: id.to_string(),
                        frames,
                    });
                }
            }
        }

        tracing::debug!(
            swings = outcome.swings.len(),
            discarded = outcome.discarded.len(),
            "segmentation complete"
        );
        outcome
    }

    /// Assemble a swing from its tracks and locate stride and contact
    pub fn build_swing(
        &self,
        swing_id: &str,
        kinematics: Option<SwingTrack>,
        energy: Option<SwingTrack>,
    ) -> Option<Swing> {
        let min = self.config.min_swing_frames;
        let kinematics = kinematics.filter(|t| t.len() >= min);
        let energy = energy.filter(|t| t.len() >= min);
        if kinematics.is_none() && energy.is_none() {
            return None;
        }

        let mut swing = Swing {
            swing_id: swing_id.to_string(),
            kinematics,
            energy,
            contact_method: ContactMethod::FixedFraction,
            contact_source: TrackKind::Kinematics,
        };

        let (method, source, contact_time) = self.detect_contact(&swing);
        swing.contact_method = method;
        swing.contact_source = source;

        for track in swing.kinematics.iter_mut().chain(swing.energy.iter_mut()) {
            let stride = self.stride_frame(track);
            let contact = track.index_at_or_after(contact_time);
            track.set_bounds(stride, contact);
        }

        tracing::trace!(
            swing_id,
            method = method.as_str(),
            contact_time,
            "contact detected"
        );
        Some(swing)
    }

    /// Run the cascade over the swing's tracks
    ///
    /// Returns the winning method, the track it ran on and the contact time.
    fn detect_contact(&self, swing: &Swing) -> (ContactMethod, TrackKind, f64) {
        for method in ContactMethod::CASCADE {
            for track in swing.tracks() {
                let Some(index) = self.candidate(method, track) else {
                    continue;
                };
                if method != ContactMethod::FixedFraction && !self.is_plausible(index, track.len()) {
                    tracing::debug!(
                        swing_id = swing.swing_id.as_str(),
                        method = method.as_str(),
                        index,
                        frames = track.len(),
                        "rejecting implausible contact candidate"
                    );
                    continue;
                }
                let time = track.times().get(index).copied().unwrap_or(0.0);
                return (method, track.kind, time);
            }
        }

        // Unreachable with at least one track: the fixed fraction always answers.
        (ContactMethod::FixedFraction, TrackKind::Kinematics, 0.0)
    }

    fn is_plausible(&self, index: usize, len: usize) -> bool {
        index as f64 >= self.config.implausible_fraction * len as f64
    }

    /// Contact candidate from one tier on one track
    pub fn candidate(&self, method: ContactMethod, track: &SwingTrack) -> Option<usize> {
        let n = track.len();
        if n == 0 {
            return None;
        }
        match method {
            ContactMethod::Marker => marker_index(track.channel(Channel::ContactMarker)?),
            ContactMethod::TimeToContact => {
                let ttc = track.channel(Channel::TimeToContact)?;
                (0..n).rev().find(|&i| ttc[i].is_finite() && ttc[i] >= 0.0)
            }
            ContactMethod::SpeedDeceleration => [Channel::HandSpeed, Channel::BatSpeed]
                .into_iter()
                .filter_map(|c| track.channel(c))
                .find_map(|speed| {
                    self.deceleration_index(speed, self.stride_frame(track))
                        .filter(|&i| self.is_plausible(i, n))
                }),
            ContactMethod::EnergyPeak => [Channel::BatKe, Channel::TotalKe]
                .into_iter()
                .filter_map(|c| track.channel(c))
                .find_map(|energy| {
                    peak_index(energy, 0..=n - 1)
                        .filter(|&peak| energy[peak] > 0.0 && self.is_plausible(peak, n))
                }),
            ContactMethod::MomentumPeak => {
                let components: Vec<&[f64]> = [Channel::BatMomX, Channel::BatMomY, Channel::BatMomZ]
                    .into_iter()
                    .filter_map(|c| track.channel(c))
                    .collect();
                if components.is_empty() {
                    return None;
                }
                let magnitude: Vec<f64> = (0..n)
                    .map(|i| {
                        components
                            .iter()
                            .map(|c| if c[i].is_finite() { c[i] * c[i] } else { 0.0 })
                            .sum::<f64>()
                            .sqrt()
                    })
                    .collect();
                let peak = peak_index(&magnitude, 0..=n - 1)?;
                (magnitude[peak] > 0.0).then_some(peak)
            }
            ContactMethod::TorsoRotation => {
                let torso = track.channel(Channel::TorsoRot)?;
                let speed = angular_speed(torso, track.times());
                let peak = peak_index(&speed, 0..=n - 1)?;
                if !(speed[peak] > 0.0) {
                    return None;
                }
                let nudged = (peak as f64 * self.config.torso_nudge).round() as usize;
                Some(nudged.min(n - 1))
            }
            ContactMethod::FixedFraction => Some(fraction_index(self.config.contact_fraction, n)),
        }
    }

    /// First frame after the peak where speed drops below the deceleration ratio
    fn deceleration_index(&self, speed: &[f64], start: usize) -> Option<usize> {
        let n = speed.len();
        let peak = peak_index(speed, start..=n.checked_sub(1)?)?;
        let peak_speed = speed[peak];
        if !(peak_speed > 0.0) {
            return None;
        }
        let limit = peak_speed * self.config.deceleration_ratio;
        (peak + 1..n).find(|&i| speed[i].is_finite() && speed[i] < limit)
    }

    /// Stride frame: explicit marker when in bounds, else a fixed fraction
    pub fn stride_frame(&self, track: &SwingTrack) -> usize {
        let n = track.len();
        track
            .channel(Channel::StrideMarker)
            .and_then(marker_index)
            .filter(|&i| i < n)
            .unwrap_or_else(|| fraction_index(self.config.stride_fraction, n))
    }
}

/// Resolve a marker column to a frame index
///
/// A column holding only 0/1 is a flag (first raised frame); anything else
/// holds a frame index relative to the swing start in its first finite cell.
pub fn marker_index(values: &[f64]) -> Option<usize> {
    let finite = || values.iter().filter(|v| v.is_finite());
    let is_flag = finite().all(|v| *v == 0.0 || *v == 1.0);
    let index = if is_flag {
        values.iter().position(|v| *v == 1.0)?
    } else {
        let raw = *finite().next()?;
        if raw < 0.0 {
            return None;
        }
        raw.round() as usize
    };
    (index < values.len()).then_some(index)
}

/// `round(fraction * (n - 1))`
pub fn fraction_index(fraction: f64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let index = (fraction * (n - 1) as f64).round() as usize;
    index.min(n - 1)
}

/// Index of the largest finite value inside `range` (first on ties)
pub fn peak_index(values: &[f64], range: RangeInclusive<usize>) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in range {
        let Some(v) = values.get(i).copied() else {
            break;
        };
        if !v.is_finite() {
            continue;
        }
        match best {
            Some(b) if values[b] >= v => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Absolute first-difference speed, aligned so element `i` covers `i-1..i`
///
/// Element 0 and samples with a non-positive time step are NaN.
pub fn angular_speed(angles: &[f64], times: &[f64]) -> Vec<f64> {
    let mut speed = vec![f64::NAN; angles.len()];
    for i in 1..angles.len().min(times.len()) {
        let dt = times[i] - times[i - 1];
        if dt > 0.0 && angles[i].is_finite() && angles[i - 1].is_finite() {
            speed[i] = ((angles[i] - angles[i - 1]) / dt).abs();
        }
    }
    speed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::RawFrame;

    const RATE: f64 = 240.0;

    fn config() -> SegmentationConfig {
        SegmentationConfig::default()
    }

    fn track(n: usize, columns: &[(Channel, Vec<f64>)]) -> SwingTrack {
        let times = (0..n).map(|i| i as f64 / RATE).collect();
        SwingTrack::from_columns(
            TrackKind::Kinematics,
            times,
            columns.iter().cloned().collect(),
        )
    }

    /// Torso rotation whose per-frame step peaks at `peak`
    fn torso_with_speed_peak(n: usize, peak: usize) -> Vec<f64> {
        let mut angle = 0.0;
        (0..n)
            .map(|i| {
                if i > 0 {
                    let d = i as f64 - peak as f64;
                    angle += 1.0 + 4.0 * (-d * d / 18.0).exp();
                }
                angle
            })
            .collect()
    }

    #[test]
    fn test_marker_index_flag_and_index() {
        assert_eq!(marker_index(&[0.0, 0.0, 1.0, 1.0]), Some(2));
        assert_eq!(marker_index(&[7.0, 7.0, 7.0, 7.0, 7.0, 7.0, 7.0, 7.0]), Some(7));
        assert_eq!(marker_index(&[0.0, 0.0, 0.0]), None);
        assert_eq!(marker_index(&[f64::NAN, 12.0, 12.0]), None);
        assert_eq!(marker_index(&[-3.0, 2.0, 2.0]), None);
    }

    #[test]
    fn test_fraction_index() {
        assert_eq!(fraction_index(0.8, 101), 80);
        assert_eq!(fraction_index(0.2, 101), 20);
        assert_eq!(fraction_index(0.8, 1), 0);
        assert_eq!(fraction_index(0.8, 0), 0);
    }

    #[test]
    fn test_explicit_marker_wins() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let mut marker = vec![0.0; 100];
        marker[70] = 1.0;
        let t = track(100, &[(Channel::ContactMarker, marker)]);
        let swing = segmenter
            .build_swing("1", Some(t), None)
            .unwrap();
        assert_eq!(swing.contact_method, ContactMethod::Marker);
        assert_eq!(swing.confidence(), ContactConfidence::Explicit);
        assert_eq!(swing.kinematics.as_ref().unwrap().contact(), 70);
    }

    #[test]
    fn test_implausible_marker_falls_through() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let mut marker = vec![0.0; 100];
        marker[10] = 1.0;
        let t = track(100, &[(Channel::ContactMarker, marker)]);
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::FixedFraction);
        assert_eq!(swing.confidence(), ContactConfidence::Fallback);
        assert_eq!(swing.kinematics.as_ref().unwrap().contact(), 79);
    }

    #[test]
    fn test_time_to_contact_column() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let ttc: Vec<f64> = (0..100).map(|i| (80.0 - i as f64) * 4.0).collect();
        let t = track(100, &[(Channel::TimeToContact, ttc)]);
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::TimeToContact);
        let track = swing.kinematics.unwrap();
        assert_eq!(track.contact(), 80);
        assert_eq!(*track.window().end(), 80);
    }

    #[test]
    fn test_speed_deceleration_proxy() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let speed: Vec<f64> = (0..100)
            .map(|i| match i {
                0..=59 => 10.0 + i as f64 * 0.5,
                60..=69 => 40.0,
                _ => 40.0 - (i - 69) as f64 * 2.0,
            })
            .collect();
        let t = track(100, &[(Channel::HandSpeed, speed)]);
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        // Peak 40 first reached at frame 60; first value below 35.2 is frame 72 (34.0).
        assert_eq!(swing.contact_method, ContactMethod::SpeedDeceleration);
        assert_eq!(swing.kinematics.unwrap().contact(), 72);
    }

    #[test]
    fn test_energy_peak_and_transfer_by_time() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let bat: Vec<f64> = (0..120)
            .map(|i| {
                let d = i as f64 - 94.0;
                400.0 * (-d * d / 72.0).exp()
            })
            .collect();
        let energy = {
            let mut t = track(120, &[(Channel::BatKe, bat)]);
            t.kind = TrackKind::Energy;
            t
        };
        // Kinematics sampled at half the rate: frame 47 sits at the same time as 94.
        let kin_times: Vec<f64> = (0..60).map(|i| i as f64 * 2.0 / RATE).collect();
        let kin = SwingTrack::from_columns(
            TrackKind::Kinematics,
            kin_times,
            [(Channel::PelvisRot, vec![1.0; 60])].into_iter().collect(),
        );
        let swing = segmenter.build_swing("7", Some(kin), Some(energy)).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::EnergyPeak);
        assert_eq!(swing.contact_source, TrackKind::Energy);
        assert_eq!(swing.energy.as_ref().unwrap().contact(), 94);
        assert_eq!(swing.kinematics.as_ref().unwrap().contact(), 47);
    }

    fn gaussian_peak(n: usize, centre: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let d = i as f64 - centre;
                amplitude * (-d * d / 72.0).exp()
            })
            .collect()
    }

    #[test]
    fn test_unusable_bat_energy_falls_back_to_total() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let total = gaussian_peak(120, 90.0, 300.0);

        for bat in [vec![0.0; 120], gaussian_peak(120, 20.0, 400.0)] {
            let mut energy = track(120, &[(Channel::BatKe, bat), (Channel::TotalKe, total.clone())]);
            energy.kind = TrackKind::Energy;
            let swing = segmenter.build_swing("3", None, Some(energy)).unwrap();
            assert_eq!(swing.contact_method, ContactMethod::EnergyPeak);
            assert_eq!(swing.confidence(), ContactConfidence::High);
            assert_eq!(swing.energy.as_ref().unwrap().contact(), 90);
        }
    }

    #[test]
    fn test_steady_hand_speed_falls_back_to_bat_speed() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let hand: Vec<f64> = (0..100).map(|i| 10.0 + i as f64 * 0.2).collect();
        let bat: Vec<f64> = (0..100)
            .map(|i| match i {
                0..=59 => 10.0 + i as f64 * 0.5,
                60..=69 => 40.0,
                _ => 40.0 - (i - 69) as f64 * 2.0,
            })
            .collect();
        let t = track(100, &[(Channel::HandSpeed, hand), (Channel::BatSpeed, bat)]);
        let swing = segmenter.build_swing("2", Some(t), None).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::SpeedDeceleration);
        assert_eq!(swing.kinematics.unwrap().contact(), 72);
    }

    #[test]
    fn test_momentum_peak_tier() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let mom: Vec<f64> = (0..100).map(|i| if i == 75 { 30.0 } else { 1.0 }).collect();
        let t = track(100, &[(Channel::BatMomX, mom)]);
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::MomentumPeak);
        assert_eq!(swing.confidence(), ContactConfidence::Medium);
        assert_eq!(swing.kinematics.unwrap().contact(), 75);
    }

    #[test]
    fn test_torso_fallback_nudges_peak() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let torso = torso_with_speed_peak(100, 60);
        let t = track(100, &[(Channel::TorsoRot, torso)]);
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        assert_eq!(swing.contact_method, ContactMethod::TorsoRotation);
        assert_eq!(swing.confidence(), ContactConfidence::Low);
        assert_eq!(swing.kinematics.unwrap().contact(), 63);
    }

    #[test]
    fn test_short_tracks_discarded() {
        let cfg = config();
        let frames: Vec<RawFrame> = (0..5)
            .map(|i| RawFrame::new("short", i as f64 / RATE).with(Channel::TorsoRot, i as f64))
            .chain((0..20).map(|i| {
                RawFrame::new("long", i as f64 / RATE).with(Channel::TorsoRot, i as f64)
            }))
            .collect();
        let table = FrameTable::from_frames(&frames, RATE);
        let outcome = SwingSegmenter::new(&cfg).segment(Some(&table), None);
        assert_eq!(outcome.swings.len(), 1);
        assert_eq!(outcome.swings[0].swing_id, "long");
        assert_eq!(outcome.discarded[0].swing_id, "short");
        assert_eq!(outcome.discarded[0].frames, 5);
    }

    #[test]
    fn test_contact_before_stride_clamps_to_end() {
        let cfg = config();
        let segmenter = SwingSegmenter::new(&cfg);
        let mut contact = vec![0.0; 100];
        contact[50] = 1.0;
        let mut stride = vec![0.0; 100];
        stride[60] = 1.0;
        let t = track(
            100,
            &[(Channel::ContactMarker, contact), (Channel::StrideMarker, stride)],
        );
        let swing = segmenter.build_swing("1", Some(t), None).unwrap();
        let track = swing.kinematics.unwrap();
        assert_eq!(track.stride(), 60);
        assert_eq!(track.contact(), 99);
    }

    #[test]
    fn test_order_follows_first_appearance() {
        let cfg = config();
        let kin: Vec<RawFrame> = ["b", "a"]
            .iter()
            .flat_map(|id| {
                (0..12).map(move |i| RawFrame::new(*id, i as f64 / RATE).with(Channel::PelvisRot, 1.0))
            })
            .collect();
        let energy: Vec<RawFrame> = ["c", "a"]
            .iter()
            .flat_map(|id| {
                (0..12).map(move |i| RawFrame::new(*id, i as f64 / RATE).with(Channel::TotalKe, 5.0))
            })
            .collect();
        let kin = FrameTable::from_frames(&kin, RATE);
        let energy = FrameTable::from_frames(&energy, RATE);
        let outcome = SwingSegmenter::new(&cfg).segment(Some(&kin), Some(&energy));
        let ids: Vec<&str> = outcome.swings.iter().map(|s| s.swing_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(outcome.swings[1].kinematics.is_some() && outcome.swings[1].energy.is_some());
    }

    #[test]
    fn test_angular_speed_skips_bad_steps() {
        let speed = angular_speed(&[0.0, 1.0, 3.0, 4.0], &[0.0, 0.5, 0.5, 1.0]);
        assert!(speed[0].is_nan());
        assert_eq!(speed[1], 2.0);
        assert!(speed[2].is_nan());
        assert_eq!(speed[3], 2.0);
    }
}
