// Rotational kinematics - angular velocity, separation, joint angles

use std::ops::RangeInclusive;

use super::units::AngleNormalizer;
use crate::analysis::segmenter::{angular_speed, peak_index, Swing, SwingTrack};
use crate::ingest::Channel;

/// Peak of a rotation channel's angular speed inside the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityPeak {
    /// deg/s
    pub value: f64,
    pub index: usize,
}

/// Rotation-derived metrics of one swing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotationMetrics {
    pub pelvis: Option<VelocityPeak>,
    pub torso: Option<VelocityPeak>,
    pub pelvis_peak_ms: Option<f64>,
    pub torso_peak_ms: Option<f64>,
    pub separation_peak: Option<f64>,
    pub separation_rate_peak: Option<f64>,
    pub proper_sequence: Option<bool>,
}

/// Velocity samples inside the window
///
/// Speed element `i` spans frames `i-1..i`, so the first sample of the
/// window is `stride + 1`.
fn velocity_range(track: &SwingTrack) -> RangeInclusive<usize> {
    let window = track.window();
    let end = *window.end();
    let start = (*window.start() + 1).min(end);
    start..=end
}

fn velocity_peak(degrees: &[f64], track: &SwingTrack) -> Option<VelocityPeak> {
    let speed = angular_speed(degrees, track.times());
    let index = peak_index(&speed, velocity_range(track))?;
    Some(VelocityPeak {
        value: speed[index],
        index,
    })
}

/// Rotation metrics for a swing
pub fn rotation_metrics(swing: &Swing, angles: &AngleNormalizer) -> RotationMetrics {
    let mut metrics = RotationMetrics::default();

    let pelvis = swing
        .track_with(Channel::PelvisRot)
        .map(|(track, values)| (track, angles.to_degrees(values)));
    let torso = swing
        .track_with(Channel::TorsoRot)
        .map(|(track, values)| (track, angles.to_degrees(values)));

    if let Some((track, degrees)) = &pelvis {
        metrics.pelvis = velocity_peak(degrees, track);
        metrics.pelvis_peak_ms = metrics.pelvis.map(|p| track.ms_from_contact(p.index));
    }
    if let Some((track, degrees)) = &torso {
        metrics.torso = velocity_peak(degrees, track);
        metrics.torso_peak_ms = metrics.torso.map(|p| track.ms_from_contact(p.index));
    }

    if let (Some(p), Some(t)) = (metrics.pelvis_peak_ms, metrics.torso_peak_ms) {
        metrics.proper_sequence = Some(p < t);
    }

    // Separation needs both rotations sampled on the same time axis.
    if let (Some((pelvis_track, pelvis_deg)), Some((torso_track, torso_deg))) = (&pelvis, &torso) {
        if pelvis_track.kind == torso_track.kind {
            let separation: Vec<f64> = torso_deg
                .iter()
                .zip(pelvis_deg.iter())
                .map(|(t, p)| t - p)
                .collect();
            let window = torso_track.window();
            metrics.separation_peak = separation[window]
                .iter()
                .filter(|v| v.is_finite())
                .map(|v| v.abs())
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
            let rate = angular_speed(&separation, torso_track.times());
            metrics.separation_rate_peak =
                peak_index(&rate, velocity_range(torso_track)).map(|i| rate[i]);
        }
    }

    metrics
}

/// Joint angles read at the contact frame (clamped into the window), in degrees
pub fn joint_angles_at_contact(
    swing: &Swing,
    angles: &AngleNormalizer,
) -> Vec<(Channel, f64)> {
    Channel::JOINT_ANGLES
        .iter()
        .filter_map(|&channel| {
            let (track, values) = swing.track_with(channel)?;
            let window = track.window();
            let index = track.contact().clamp(*window.start(), *window.end());
            let degrees = angles.to_degrees(values);
            let value = degrees.get(index).copied().filter(|v| v.is_finite())?;
            Some((channel, value))
        })
        .collect()
}
