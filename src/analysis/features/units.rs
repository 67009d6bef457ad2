// Angle unit normalisation
//
// Exports disagree on whether angles are radians or degrees and rarely say
// which. Under the `auto` policy a channel whose peak magnitude stays below
// `radian_peak_limit` is taken to be radians; no human joint or segment
// rotation stays under 8 degrees through a swing, while radians never
// exceed ~6.3.

use serde::{Deserialize, Serialize};

/// How angle channels are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnitPolicy {
    /// Guess from the channel's peak magnitude
    Auto,
    /// Always degrees
    Degrees,
    /// Always radians
    Radians,
}

impl Default for AngleUnitPolicy {
    fn default() -> Self {
        AngleUnitPolicy::Auto
    }
}

/// Unit an angle series was read in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    Degrees,
    Radians,
}

/// Decides units for angle series and converts them to degrees
#[derive(Debug, Clone, Copy)]
pub struct AngleNormalizer {
    policy: AngleUnitPolicy,
    radian_peak_limit: f64,
}

impl AngleNormalizer {
    pub fn new(policy: AngleUnitPolicy, radian_peak_limit: f64) -> Self {
        Self {
            policy,
            radian_peak_limit,
        }
    }

    /// Unit of a whole channel
    pub fn detect(&self, values: &[f64]) -> AngleUnit {
        match self.policy {
            AngleUnitPolicy::Degrees => AngleUnit::Degrees,
            AngleUnitPolicy::Radians => AngleUnit::Radians,
            AngleUnitPolicy::Auto => {
                let peak = values
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold(0.0_f64, |acc, v| acc.max(v.abs()));
                if peak < self.radian_peak_limit {
                    AngleUnit::Radians
                } else {
                    AngleUnit::Degrees
                }
            }
        }
    }

    /// Channel values in degrees
    pub fn to_degrees(&self, values: &[f64]) -> Vec<f64> {
        match self.detect(values) {
            AngleUnit::Degrees => values.to_vec(),
            AngleUnit::Radians => values.iter().map(|v| v.to_degrees()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_detects_radians() {
        let normalizer = AngleNormalizer::new(AngleUnitPolicy::Auto, 8.0);
        let radians = [0.0, 0.5, 1.2, -1.5];
        assert_eq!(normalizer.detect(&radians), AngleUnit::Radians);
        let degrees = normalizer.to_degrees(&radians);
        assert!((degrees[2] - 68.754_935).abs() < 1e-4);
    }

    #[test]
    fn test_auto_keeps_degrees() {
        let normalizer = AngleNormalizer::new(AngleUnitPolicy::Auto, 8.0);
        let degrees = [0.0, 15.0, 90.0];
        assert_eq!(normalizer.detect(&degrees), AngleUnit::Degrees);
        assert_eq!(normalizer.to_degrees(&degrees), degrees.to_vec());
    }

    #[test]
    fn test_peak_ignores_nan() {
        let normalizer = AngleNormalizer::new(AngleUnitPolicy::Auto, 8.0);
        assert_eq!(normalizer.detect(&[f64::NAN, 1.0]), AngleUnit::Radians);
    }

    #[test]
    fn test_pinned_policies() {
        let deg = AngleNormalizer::new(AngleUnitPolicy::Degrees, 8.0);
        assert_eq!(deg.detect(&[0.1, 0.2]), AngleUnit::Degrees);
        let rad = AngleNormalizer::new(AngleUnitPolicy::Radians, 8.0);
        assert_eq!(rad.detect(&[45.0, 90.0]), AngleUnit::Radians);
    }
}
