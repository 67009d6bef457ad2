// Segment kinetic energy - windowed percentiles and peak timing

use crate::analysis::segmenter::{peak_index, Swing};
use crate::ingest::Channel;

/// Energy summary for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyMetric {
    pub channel: Channel,
    /// Percentile of the channel inside the swing window (J)
    pub level: f64,
    /// Peak over the whole track, ms from contact
    pub peak_ms: Option<f64>,
}

/// Percentile with linear interpolation between closest ranks
///
/// Non-finite values are ignored; `None` when nothing finite remains.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Percentile level and peak timing of every energy channel present
///
/// Levels use the swing window; peak timing scans the whole track so a
/// peak after contact stays visible.
pub fn energy_metrics(swing: &Swing, pct: f64) -> Vec<EnergyMetric> {
    Channel::ENERGIES
        .iter()
        .filter_map(|&channel| {
            let (track, values) = swing.track_with(channel)?;
            let level = percentile(&values[track.window()], pct)?;
            let peak_ms = peak_index(values, 0..=values.len().saturating_sub(1))
                .map(|i| track.ms_from_contact(i));
            Some(EnergyMetric {
                channel,
                level,
                peak_ms,
            })
        })
        .collect()
}
