// Session aggregator - means, CVs, rates and data-quality flags
//
// Means use only the swings where a metric is present. CVs are withheld
// entirely below `min_swings_for_variance`; the gate is reported rather
// than extrapolated from too few samples. The same gate applies per metric
// when enough swings exist but too few of them carry that metric.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::analysis::features::SwingFeatures;
use crate::analysis::segmenter::{ContactConfidence, ContactMethod};
use crate::config::AggregationConfig;
use crate::ingest::Channel;

/// Metrics scored by their coefficient of variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvMetric {
    PelvisVelocity,
    TorsoVelocity,
    SwingDuration,
    DeliveredEnergy,
}

impl CvMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            CvMetric::PelvisVelocity => "pelvis velocity",
            CvMetric::TorsoVelocity => "torso velocity",
            CvMetric::SwingDuration => "swing duration",
            CvMetric::DeliveredEnergy => "delivered energy",
        }
    }
}

/// Session-level aggregates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetrics {
    pub swing_count: usize,

    pub pelvis_velocity: Option<f64>,
    pub torso_velocity: Option<f64>,
    pub separation: Option<f64>,
    pub separation_rate: Option<f64>,

    pub legs_energy: Option<f64>,
    pub torso_energy: Option<f64>,
    pub arms_energy: Option<f64>,
    pub bat_energy: Option<f64>,
    pub total_energy: Option<f64>,
    /// Energy reaching the bat (J), measured or proxied
    pub delivered_energy: Option<f64>,
    /// Delivered / total energy (%)
    pub delivery_efficiency: Option<f64>,
    /// Delivered energy came from arms energy x transfer ratio
    pub proxy_delivered_energy: bool,

    pub joint_angles: BTreeMap<Channel, f64>,
    pub swing_duration_ms: Option<f64>,

    pub pelvis_velocity_cv: Option<f64>,
    pub torso_velocity_cv: Option<f64>,
    pub swing_duration_cv: Option<f64>,
    pub delivered_energy_cv: Option<f64>,
    /// Consistency metrics withheld for lack of swings
    pub variance_gated: bool,
    /// CVs withheld because too few swings carried the metric
    pub gated_cv: BTreeSet<CvMetric>,

    /// Rates on 0..=1
    pub proper_sequence_rate: Option<f64>,
    pub legs_peak_after_contact_rate: Option<f64>,
    pub upper_before_lower_rate: Option<f64>,
    /// Mean lead time of the legs energy peak before contact (ms)
    pub ground_to_contact_ms: Option<f64>,

    pub has_energy_data: bool,
    pub contact_events_detected: bool,
    pub contact_methods: BTreeMap<ContactMethod, usize>,
    pub weakest_contact: Option<ContactConfidence>,
    /// Fraction of swings with meaningful bat energy
    pub bat_energy_coverage: f64,
    pub bat_energy_meaningful: bool,

    pub warnings: Vec<String>,
}

impl SessionMetrics {
    /// Whether the CV of `metric` is withheld, session-wide or on its own
    pub fn cv_gated(&self, metric: CvMetric) -> bool {
        self.variance_gated || self.gated_cv.contains(&metric)
    }
}

/// Aggregates SwingFeatures into SessionMetrics
pub struct SessionAggregator<'a> {
    config: &'a AggregationConfig,
}

impl<'a> SessionAggregator<'a> {
    pub fn new(config: &'a AggregationConfig) -> Self {
        Self { config }
    }

    pub fn aggregate(&self, swings: &[SwingFeatures]) -> SessionMetrics {
        let n = swings.len();
        let mut metrics = SessionMetrics {
            swing_count: n,
            ..SessionMetrics::default()
        };
        if n == 0 {
            return metrics;
        }

        metrics.pelvis_velocity = mean_of(swings, |s| s.pelvis_peak_velocity);
        metrics.torso_velocity = mean_of(swings, |s| s.torso_peak_velocity);
        metrics.separation = mean_of(swings, |s| s.separation_peak);
        metrics.separation_rate = mean_of(swings, |s| s.separation_rate_peak);
        metrics.legs_energy = mean_of(swings, |s| s.legs_energy);
        metrics.torso_energy = mean_of(swings, |s| s.torso_energy);
        metrics.arms_energy = mean_of(swings, |s| s.arms_energy);
        metrics.bat_energy = mean_of(swings, |s| s.bat_energy);
        metrics.total_energy = mean_of(swings, |s| s.total_energy);
        metrics.swing_duration_ms = mean_of(swings, |s| s.swing_duration_ms);
        metrics.has_energy_data = swings.iter().any(|s| s.has_energy());

        let mut angle_sums: BTreeMap<Channel, (f64, usize)> = BTreeMap::new();
        for swing in swings {
            for (channel, value) in &swing.joint_angles {
                let entry = angle_sums.entry(*channel).or_insert((0.0, 0));
                entry.0 += value;
                entry.1 += 1;
            }
        }
        metrics.joint_angles = angle_sums
            .into_iter()
            .map(|(channel, (sum, count))| (channel, sum / count as f64))
            .collect();

        self.delivered_energy(swings, &mut metrics);

        metrics.proper_sequence_rate = rate_of(swings, |s| s.proper_sequence);
        metrics.legs_peak_after_contact_rate = rate_of(swings, |s| s.legs_peak_after_contact());
        metrics.upper_before_lower_rate = rate_of(swings, |s| s.timing.upper_before_lower());
        metrics.ground_to_contact_ms = mean_of(swings, |s| s.timing.legs_ke_ms.map(|ms| -ms));

        for swing in swings {
            *metrics.contact_methods.entry(swing.contact_method).or_insert(0) += 1;
        }
        metrics.weakest_contact = swings.iter().map(|s| s.contact_confidence).max();
        metrics.contact_events_detected = swings
            .iter()
            .any(|s| s.contact_method != ContactMethod::FixedFraction);
        if !metrics.contact_events_detected {
            metrics
                .warnings
                .push("no contact events detected; contact estimated at a fixed fraction of each swing".to_string());
        }

        let min = self.config.min_swings_for_variance;
        if n < min {
            metrics.variance_gated = true;
            metrics.warnings.push(format!(
                "need {}+ swings for consistency scoring (found {})",
                min, n
            ));
        } else {
            let ratio = self.config.arm_transfer_ratio;
            let delivered = if metrics.proxy_delivered_energy {
                present(swings, |s| s.arms_energy.map(|e| e * ratio))
            } else {
                present(swings, |s| s.bat_energy)
            };
            let pelvis = present(swings, |s| s.pelvis_peak_velocity);
            let torso = present(swings, |s| s.torso_peak_velocity);
            let duration = present(swings, |s| s.swing_duration_ms);
            let pelvis_cv = self.gated_cv(&mut metrics, CvMetric::PelvisVelocity, pelvis);
            let torso_cv = self.gated_cv(&mut metrics, CvMetric::TorsoVelocity, torso);
            let duration_cv = self.gated_cv(&mut metrics, CvMetric::SwingDuration, duration);
            let delivered_cv = self.gated_cv(&mut metrics, CvMetric::DeliveredEnergy, delivered);
            metrics.pelvis_velocity_cv = pelvis_cv;
            metrics.torso_velocity_cv = torso_cv;
            metrics.swing_duration_cv = duration_cv;
            metrics.delivered_energy_cv = delivered_cv;
        }

        tracing::debug!(
            swings = n,
            gated = metrics.variance_gated,
            gated_cv = metrics.gated_cv.len(),
            proxy = metrics.proxy_delivered_energy,
            "session aggregated"
        );
        metrics
    }

    /// CV of `values`, or record the metric as gated when some swings carry
    /// it but fewer than `min_swings_for_variance`
    fn gated_cv(
        &self,
        metrics: &mut SessionMetrics,
        metric: CvMetric,
        values: Vec<f64>,
    ) -> Option<f64> {
        let min = self.config.min_swings_for_variance;
        if values.is_empty() {
            return None;
        }
        if values.len() < min {
            metrics.gated_cv.insert(metric);
            metrics.warnings.push(format!(
                "need {}+ swings with {} for consistency scoring (found {})",
                min,
                metric.as_str(),
                values.len()
            ));
            return None;
        }
        coefficient_of_variation(&values)
    }

    /// Measured bat energy when coverage is meaningful, else the arms proxy
    fn delivered_energy(&self, swings: &[SwingFeatures], metrics: &mut SessionMetrics) {
        let measured = swings
            .iter()
            .filter(|s| {
                s.bat_energy
                    .map_or(false, |e| e >= self.config.meaningful_bat_energy_j)
            })
            .count();
        metrics.bat_energy_coverage = measured as f64 / swings.len() as f64;
        metrics.bat_energy_meaningful =
            measured > 0 && metrics.bat_energy_coverage >= self.config.bat_coverage_min_fraction;

        if metrics.bat_energy_meaningful {
            metrics.delivered_energy = metrics.bat_energy;
        } else if let Some(arms) = metrics.arms_energy {
            metrics.delivered_energy = Some(arms * self.config.arm_transfer_ratio);
            metrics.proxy_delivered_energy = true;
            metrics.warnings.push(format!(
                "bat energy missing or below {} J in most swings; delivered energy estimated as arms energy x {}",
                self.config.meaningful_bat_energy_j, self.config.arm_transfer_ratio
            ));
        }

        metrics.delivery_efficiency = match (metrics.delivered_energy, metrics.total_energy) {
            (Some(delivered), Some(total)) if total > 0.0 => Some(delivered / total * 100.0),
            _ => None,
        };
    }
}

fn present<F>(swings: &[SwingFeatures], field: F) -> Vec<f64>
where
    F: Fn(&SwingFeatures) -> Option<f64>,
{
    swings
        .iter()
        .filter_map(|s| field(s))
        .filter(|v| v.is_finite())
        .collect()
}

fn mean_of<F>(swings: &[SwingFeatures], field: F) -> Option<f64>
where
    F: Fn(&SwingFeatures) -> Option<f64>,
{
    mean(&present(swings, field))
}

fn rate_of<F>(swings: &[SwingFeatures], flag: F) -> Option<f64>
where
    F: Fn(&SwingFeatures) -> Option<bool>,
{
    let flags: Vec<bool> = swings.iter().filter_map(|s| flag(s)).collect();
    if flags.is_empty() {
        return None;
    }
    Some(flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation / |mean| x 100; `None` for a zero mean
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m == 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / m.abs() * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swing(id: &str, pelvis: f64, legs_ms: f64, arms_ms: f64) -> SwingFeatures {
        let mut s = SwingFeatures::new(id, ContactMethod::EnergyPeak);
        s.pelvis_peak_velocity = Some(pelvis);
        s.torso_peak_velocity = Some(pelvis * 1.5);
        s.proper_sequence = Some(true);
        s.swing_duration_ms = Some(300.0);
        s.legs_energy = Some(300.0);
        s.arms_energy = Some(200.0);
        s.bat_energy = Some(400.0);
        s.total_energy = Some(1000.0);
        s.timing.legs_ke_ms = Some(legs_ms);
        s.timing.arms_ke_ms = Some(arms_ms);
        s
    }

    #[test]
    fn test_cv_population() {
        let cv = coefficient_of_variation(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((cv - 40.0).abs() < 1e-9);
        assert!(coefficient_of_variation(&[0.0, 0.0]).is_none());
        assert!(coefficient_of_variation(&[]).is_none());
    }

    #[test]
    fn test_gating_with_two_swings() {
        let config = AggregationConfig::default();
        let metrics = SessionAggregator::new(&config)
            .aggregate(&[swing("1", 500.0, -80.0, -40.0), swing("2", 600.0, -80.0, -40.0)]);
        assert!(metrics.variance_gated);
        assert!(metrics.pelvis_velocity_cv.is_none());
        assert_eq!(metrics.pelvis_velocity, Some(550.0));
        assert!(metrics
            .warnings
            .contains(&"need 3+ swings for consistency scoring (found 2)".to_string()));
    }

    #[test]
    fn test_cv_computed_with_three_swings() {
        let config = AggregationConfig::default();
        let metrics = SessionAggregator::new(&config).aggregate(&[
            swing("1", 500.0, -80.0, -40.0),
            swing("2", 600.0, -80.0, -40.0),
            swing("3", 700.0, -80.0, -40.0),
        ]);
        assert!(!metrics.variance_gated);
        let cv = metrics.pelvis_velocity_cv.unwrap();
        assert!((cv - 13.608_276).abs() < 1e-4);
        assert_eq!(metrics.delivered_energy_cv, Some(0.0));
    }

    #[test]
    fn test_sparse_metric_gated_on_its_own() {
        let config = AggregationConfig::default();
        let mut a = swing("1", 500.0, -80.0, -40.0);
        let b = swing("2", 600.0, -80.0, -40.0);
        let c = swing("3", 700.0, -80.0, -40.0);
        let mut d = swing("4", 800.0, -80.0, -40.0);
        a.pelvis_peak_velocity = None;
        d.pelvis_peak_velocity = Some(f64::NAN);
        let metrics = SessionAggregator::new(&config).aggregate(&[a, b, c, d]);

        assert!(!metrics.variance_gated);
        assert!(metrics.pelvis_velocity_cv.is_none());
        assert!(metrics.cv_gated(CvMetric::PelvisVelocity));
        assert!(!metrics.cv_gated(CvMetric::TorsoVelocity));
        assert!(metrics.torso_velocity_cv.is_some());
        assert_eq!(
            metrics.gated_cv.iter().copied().collect::<Vec<_>>(),
            vec![CvMetric::PelvisVelocity]
        );
        assert!(metrics.warnings.contains(
            &"need 3+ swings with pelvis velocity for consistency scoring (found 2)".to_string()
        ));
        assert!(!metrics
            .warnings
            .iter()
            .any(|w| w.starts_with("need 3+ swings for consistency")));
    }

    #[test]
    fn test_absent_metric_is_not_gated() {
        let config = AggregationConfig::default();
        let swings: Vec<SwingFeatures> = (1..=3)
            .map(|i| {
                let mut s = swing(&i.to_string(), 500.0, -80.0, -40.0);
                s.swing_duration_ms = None;
                s
            })
            .collect();
        let metrics = SessionAggregator::new(&config).aggregate(&swings);
        assert!(metrics.swing_duration_cv.is_none());
        assert!(!metrics.cv_gated(CvMetric::SwingDuration));
        assert!(metrics.gated_cv.is_empty());
    }

    #[test]
    fn test_rates_and_ground_timing() {
        let config = AggregationConfig::default();
        let metrics = SessionAggregator::new(&config).aggregate(&[
            swing("1", 500.0, -80.0, -40.0),
            swing("2", 500.0, 20.0, -40.0),
            swing("3", 500.0, -60.0, -90.0),
            swing("4", 500.0, -60.0, -40.0),
        ]);
        assert_eq!(metrics.proper_sequence_rate, Some(1.0));
        assert_eq!(metrics.legs_peak_after_contact_rate, Some(0.25));
        // Arms before legs only in swing 3 (-90 < -60) and swing 2 (-40 < 20).
        assert_eq!(metrics.upper_before_lower_rate, Some(0.5));
        assert_eq!(metrics.ground_to_contact_ms, Some(45.0));
        assert_eq!(metrics.contact_methods.get(&ContactMethod::EnergyPeak), Some(&4));
        assert_eq!(metrics.weakest_contact, Some(ContactConfidence::High));
        assert!(metrics.contact_events_detected);
    }

    #[test]
    fn test_measured_bat_energy_preferred() {
        let config = AggregationConfig::default();
        let metrics = SessionAggregator::new(&config)
            .aggregate(&[swing("1", 500.0, -80.0, -40.0)]);
        assert!(metrics.bat_energy_meaningful);
        assert!(!metrics.proxy_delivered_energy);
        assert_eq!(metrics.delivered_energy, Some(400.0));
        assert!((metrics.delivery_efficiency.unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_arms_proxy_when_bat_energy_sparse() {
        let config = AggregationConfig::default();
        let mut a = swing("1", 500.0, -80.0, -40.0);
        let mut b = swing("2", 500.0, -80.0, -40.0);
        let c = swing("3", 500.0, -80.0, -40.0);
        a.bat_energy = Some(1.0);
        b.bat_energy = None;
        let metrics = SessionAggregator::new(&config).aggregate(&[a, b, c]);
        assert!((metrics.bat_energy_coverage - 1.0 / 3.0).abs() < 1e-12);
        assert!(!metrics.bat_energy_meaningful);
        assert!(metrics.proxy_delivered_energy);
        assert!((metrics.delivered_energy.unwrap() - 130.0).abs() < 1e-9);
        assert!(metrics.warnings.iter().any(|w| w.contains("arms energy")));
    }

    #[test]
    fn test_empty_session() {
        let config = AggregationConfig::default();
        let metrics = SessionAggregator::new(&config).aggregate(&[]);
        assert_eq!(metrics.swing_count, 0);
        assert!(metrics.pelvis_velocity.is_none());
        assert!(!metrics.has_energy_data);
    }
}
