// FeatureExtractor - per-swing biomechanical metrics
//
// Module organization:
// - types: Data structures (SwingFeatures, PeakTiming)
// - units: Radian/degree heuristic for angle channels
// - kinematics: Angular velocity, separation, joint angles at contact
// - energy: Windowed energy percentiles and peak timing
// - mod.rs: Coordinator (FeatureExtractor)
//
// Everything except energy peak timing is restricted to the swing-phase
// window [stride, contact].

mod energy;
mod kinematics;
mod types;
mod units;

pub use energy::{energy_metrics, percentile, EnergyMetric};
pub use kinematics::{joint_angles_at_contact, rotation_metrics, RotationMetrics, VelocityPeak};
pub use types::{PeakTiming, SwingFeatures};
pub use units::{AngleNormalizer, AngleUnit, AngleUnitPolicy};

use crate::analysis::segmenter::Swing;
use crate::config::FeatureConfig;

/// FeatureExtractor turns segmented swings into SwingFeatures
pub struct FeatureExtractor {
    angles: AngleNormalizer,
    energy_percentile: f64,
}

impl FeatureExtractor {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            angles: AngleNormalizer::new(config.angle_units, config.radian_peak_limit),
            energy_percentile: config.energy_percentile,
        }
    }

    /// Extract features from one swing
    ///
    /// # Returns
    /// `None` when the swing has no usable channel at all
    pub fn extract(&self, swing: &Swing) -> Option<SwingFeatures> {
        let mut features = SwingFeatures::new(swing.swing_id.clone(), swing.contact_method);

        let rotation = rotation_metrics(swing, &self.angles);
        features.pelvis_peak_velocity = rotation.pelvis.map(|p| p.value);
        features.torso_peak_velocity = rotation.torso.map(|p| p.value);
        features.separation_peak = rotation.separation_peak;
        features.separation_rate_peak = rotation.separation_rate_peak;
        features.proper_sequence = rotation.proper_sequence;
        features.timing.pelvis_velocity_ms = rotation.pelvis_peak_ms;
        features.timing.torso_velocity_ms = rotation.torso_peak_ms;

        for metric in energy_metrics(swing, self.energy_percentile) {
            features.set_energy(metric.channel, metric.level);
            if let Some(ms) = metric.peak_ms {
                features.timing.set_energy(metric.channel, ms);
            }
        }

        features.joint_angles = joint_angles_at_contact(swing, &self.angles)
            .into_iter()
            .collect();

        features.swing_duration_ms = swing
            .primary()
            .map(|track| (track.contact_time() - track.stride_time()) * 1000.0)
            .filter(|ms| ms.is_finite());

        if features.usable_metrics() == 0 {
            tracing::debug!(swing_id = swing.swing_id.as_str(), "swing has no usable channels");
            return None;
        }
        Some(features)
    }

    /// Extract every swing, returning the features and the ids dropped
    pub fn extract_all(&self, swings: &[Swing]) -> (Vec<SwingFeatures>, Vec<String>) {
        let mut kept = Vec::with_capacity(swings.len());
        let mut dropped = Vec::new();
        for swing in swings {
            match self.extract(swing) {
                Some(features) => kept.push(features),
                None => dropped.push(swing.swing_id.clone()),
            }
        }
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::segmenter::{SwingSegmenter, SwingTrack, TrackKind};
    use crate::config::SegmentationConfig;
    use crate::ingest::Channel;
    use std::collections::BTreeMap;

    fn build(columns: Vec<(Channel, Vec<f64>)>) -> Swing {
        let n = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let times = (0..n).map(|i| i as f64 / 240.0).collect();
        let columns: BTreeMap<Channel, Vec<f64>> = columns.into_iter().collect();
        let config = SegmentationConfig::default();
        SwingSegmenter::new(&config)
            .build_swing("9", Some(SwingTrack::from_columns(TrackKind::Kinematics, times, columns)), None)
            .unwrap()
    }

    #[test]
    fn test_extract_energy_only_swing() {
        let legs: Vec<f64> = (0..120).map(|i| if i < 80 { i as f64 } else { 80.0 }).collect();
        let swing = build(vec![(Channel::LegsKe, legs)]);
        let features = FeatureExtractor::new(&FeatureConfig::default())
            .extract(&swing)
            .unwrap();
        assert!(features.legs_energy.is_some());
        assert!(features.pelvis_peak_velocity.is_none());
        assert!(features.proper_sequence.is_none());
        assert!(features.has_energy());
        assert!(!features.has_rotation());
        assert!(features.swing_duration_ms.unwrap() > 0.0);
    }

    #[test]
    fn test_swing_without_usable_channels_dropped() {
        let swing = build(vec![(Channel::HandSpeed, vec![1.0; 40])]);
        let extractor = FeatureExtractor::new(&FeatureConfig::default());
        assert!(extractor.extract(&swing).is_none());
        let (kept, dropped) = extractor.extract_all(&[swing]);
        assert!(kept.is_empty());
        assert_eq!(dropped, vec!["9".to_string()]);
    }
}
