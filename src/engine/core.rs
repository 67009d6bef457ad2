//! ScoringEngine: the single orchestration layer of the 4B pipeline.
//!
//! One engine serves every kind of session. `DataCapabilities` decides the
//! scoring path; each path runs its stages in order and assembles a fully
//! populated `FourBScore`. Nothing here performs I/O or fails: missing or
//! unusable data degrades to neutral scores with warnings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::analysis::aggregator::{CvMetric, SessionAggregator, SessionMetrics};
use crate::analysis::features::{FeatureExtractor, SwingFeatures};
use crate::analysis::leak::{LeakClassifier, LeakResult};
use crate::analysis::segmenter::SwingSegmenter;
use crate::calibration::PlayerCalibration;
use crate::config::{EngineConfig, PlayerLevel};
use crate::engine::capabilities::{DataCapabilities, ScoringMode};
use crate::error::CalibrationError;
use crate::ingest::{FrameTable, ParseReport, SensorTable};
use crate::prediction::projection::{EnergyInputs, ProjectionModel};
use crate::prediction::sensor::ConfidencePredictor;
use crate::scoring::composite::{CompositeScorer, DimensionSet, FlowScore};
use crate::scoring::normalizer::{ComponentStatus, MetricKey, ThresholdNormalizer};
use crate::scoring::report::{
    display_round, DataQualityReport, FourBScore, ParseSummary, SwingContact, SCHEMA_VERSION,
};

/// Flow names in the motion breakdown
pub const MOTION_FLOWS: [&str; 5] = ["ground", "core", "upper", "consistency", "output"];

/// Flow names in the sensor breakdown
pub const SENSOR_FLOWS: [&str; 4] = ["release", "timing", "upstream", "output"];

/// Everything known about one session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInput {
    pub kinematics: Option<FrameTable>,
    pub energy: Option<FrameTable>,
    pub sensor: Option<SensorTable>,
    pub level: PlayerLevel,
}

impl SessionInput {
    /// Motion-capture session from up to two exports
    pub fn motion(
        kinematics: Option<FrameTable>,
        energy: Option<FrameTable>,
        level: PlayerLevel,
    ) -> Self {
        Self {
            kinematics,
            energy,
            sensor: None,
            level,
        }
    }

    /// Bat-sensor session
    pub fn sensor(sensor: SensorTable, level: PlayerLevel) -> Self {
        Self {
            kinematics: None,
            energy: None,
            sensor: Some(sensor),
            level,
        }
    }

    pub fn capabilities(&self) -> DataCapabilities {
        DataCapabilities::detect(
            self.kinematics.as_ref(),
            self.energy.as_ref(),
            self.sensor.as_ref(),
        )
    }

    /// Parse counts of every table, merged
    fn parse_report(&self) -> ParseReport {
        let mut report = ParseReport::default();
        for table in self.kinematics.iter().chain(self.energy.iter()) {
            report.merge(table.report());
        }
        if let Some(sensor) = &self.sensor {
            report.merge(&sensor.report);
        }
        report
    }

    /// Canonical names of the channels carrying data
    fn channels_present(&self) -> Vec<String> {
        let mut names: BTreeSet<&'static str> = BTreeSet::new();
        for table in self.kinematics.iter().chain(self.energy.iter()) {
            names.extend(table.channels().into_iter().map(|c| c.name()));
        }
        if let Some(sensor) = &self.sensor {
            names.extend(sensor.report.recognised.iter().map(|c| c.name()));
        }
        names.into_iter().map(str::to_string).collect()
    }
}

/// ScoringEngine turns a SessionInput into a FourBScore
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct ScoringEngine {
    config: Arc<EngineConfig>,
    classifier: Arc<LeakClassifier>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ScoringEngine {
    /// Create an engine over an already validated configuration
    pub fn new(config: EngineConfig) -> Self {
        let classifier = LeakClassifier::new(&config.leak);
        Self {
            config: Arc::new(config),
            classifier: Arc::new(classifier),
        }
    }

    /// Create an engine with a player's calibration overlaid
    ///
    /// # Errors
    /// The calibration record failed validation; nothing is overridden
    pub fn with_calibration(
        mut config: EngineConfig,
        calibration: &PlayerCalibration,
    ) -> Result<Self, CalibrationError> {
        calibration.apply_to(&mut config)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score one session
    ///
    /// # Returns
    /// A fully populated score object; sessions without usable data
    /// produce the neutral object with a warning
    pub fn score(&self, input: &SessionInput) -> FourBScore {
        let capabilities = input.capabilities();
        let mode = capabilities.mode();
        tracing::info!(
            mode = mode.as_str(),
            level = input.level.as_str(),
            "scoring session"
        );

        let score = match mode {
            ScoringMode::FullMotion | ScoringMode::EnergyOnly | ScoringMode::KinematicsOnly => {
                self.score_motion(input, mode)
            }
            ScoringMode::SensorOnly => self.score_sensor(input),
            ScoringMode::Empty => self.neutral(input.level, self.base_quality(input)),
        };

        tracing::info!(
            mode = score.mode.as_str(),
            composite = score.composite.score,
            leak = score.leak.leak_type.as_str(),
            swings = score.data_quality.swing_count,
            "session scored"
        );
        score
    }

    /// Neutral object for a session that could not be scored
    pub fn neutral(&self, level: PlayerLevel, quality: DataQualityReport) -> FourBScore {
        FourBScore::neutral(
            &self.config.version,
            level,
            self.config.weights,
            self.classifier.unknown(),
            quality,
        )
    }

    fn score_motion(&self, input: &SessionInput, mode: ScoringMode) -> FourBScore {
        let config = &*self.config;
        let mut quality = self.base_quality(input);

        let outcome = SwingSegmenter::new(&config.segmentation)
            .segment(input.kinematics.as_ref(), input.energy.as_ref());
        let (features, dropped) =
            FeatureExtractor::new(&config.features).extract_all(&outcome.swings);

        quality.swings_discarded = outcome.discarded.len() + dropped.len();
        if !outcome.discarded.is_empty() {
            quality.warn(format!(
                "{} swing(s) discarded with fewer than {} frames",
                outcome.discarded.len(),
                config.segmentation.min_swing_frames
            ));
        }
        if !dropped.is_empty() {
            quality.warn(format!(
                "{} swing(s) dropped with no usable channels",
                dropped.len()
            ));
        }
        if features.is_empty() {
            return self.neutral(input.level, quality);
        }

        match mode {
            ScoringMode::KinematicsOnly => quality.warn(
                "no energy data: energy-based scores unavailable, reduced confidence",
            ),
            ScoringMode::EnergyOnly => {
                quality.warn("no kinematics data: rotation-based scores unavailable")
            }
            _ => {}
        }

        let metrics = SessionAggregator::new(&config.aggregation).aggregate(&features);
        fill_motion_quality(&mut quality, &metrics, &features);

        let normalizer = ThresholdNormalizer::new(&config.thresholds);
        let gated = |metric| metrics.cv_gated(metric);
        let ground = FlowScore::from_components(vec![
            normalizer.score(MetricKey::PelvisVelocity, metrics.pelvis_velocity),
            normalizer.score(MetricKey::LegsEnergy, metrics.legs_energy),
        ]);
        let core = FlowScore::from_components(vec![
            normalizer.score(MetricKey::TorsoVelocity, metrics.torso_velocity),
            normalizer.score(MetricKey::Separation, metrics.separation),
            normalizer.score(MetricKey::SeparationRate, metrics.separation_rate),
        ]);
        let upper = FlowScore::from_components(vec![
            normalizer.score(MetricKey::ArmsEnergy, metrics.arms_energy),
            normalizer.score(MetricKey::DeliveredEnergy, metrics.delivered_energy),
            normalizer.score(MetricKey::DeliveryEfficiency, metrics.delivery_efficiency),
        ]);
        let consistency = FlowScore::from_components(vec![
            normalizer.score_gated(
                MetricKey::PelvisVelocityCv,
                metrics.pelvis_velocity_cv,
                gated(CvMetric::PelvisVelocity),
            ),
            normalizer.score_gated(
                MetricKey::TorsoVelocityCv,
                metrics.torso_velocity_cv,
                gated(CvMetric::TorsoVelocity),
            ),
            normalizer.score_gated(
                MetricKey::SwingDurationCv,
                metrics.swing_duration_cv,
                gated(CvMetric::SwingDuration),
            ),
        ]);
        let output = FlowScore::from_components(vec![
            normalizer.score_gated(
                MetricKey::DeliveredEnergyCv,
                metrics.delivered_energy_cv,
                gated(CvMetric::DeliveredEnergy),
            ),
            normalizer.score(
                MetricKey::SequenceRate,
                metrics.proper_sequence_rate.map(|r| r * 100.0),
            ),
        ]);

        let scorer = CompositeScorer::new(config.weights);
        let dims = DimensionSet {
            body: scorer.dimension(&[&ground, &core]),
            bat: scorer.dimension(&[&upper]),
            brain: scorer.dimension(&[&consistency]),
            ball: scorer.dimension(&[&output]),
        };

        let leak = self.classifier.classify(&metrics);
        let projections = ProjectionModel::new(&config.projection).from_energy(
            EnergyInputs {
                delivered_j: metrics.delivered_energy,
                total_j: metrics.total_energy,
                efficiency_pct: metrics.delivery_efficiency,
                proxy: metrics.proxy_delivered_energy,
            },
            input.level,
            leak.severe,
        );

        let components: BTreeMap<String, FlowScore> = MOTION_FLOWS
            .iter()
            .map(|name| name.to_string())
            .zip([ground, core, upper, consistency, output])
            .collect();
        quality.gated_scores = gated_names(&components);

        let mut score = self.assemble(mode, input.level, dims, components, leak, quality);
        score.raw_metrics = motion_raw_metrics(&metrics);
        score.projections = projections;
        score
    }

    fn score_sensor(&self, input: &SessionInput) -> FourBScore {
        let config = &*self.config;
        let mut quality = self.base_quality(input);
        let Some(sensor) = input.sensor.as_ref() else {
            return self.neutral(input.level, quality);
        };

        let predictor = ConfidencePredictor::new(
            &config.sensor,
            &config.thresholds,
            config.aggregation.min_swings_for_variance,
        );
        let Some(assessment) = predictor.assess(&sensor.swings) else {
            return self.neutral(input.level, quality);
        };

        quality.swing_count = assessment.swing_count;
        if sensor.rejected > 0 {
            quality.warn(format!(
                "{} sensor row(s) rejected without positive bat and hand speed",
                sensor.rejected
            ));
        }
        if assessment.variance_gated {
            quality.warn(format!(
                "need {}+ swings for consistency scoring (found {})",
                config.aggregation.min_swings_for_variance, assessment.swing_count
            ));
        }
        quality.warn("sensor summaries cannot identify an energy leak; full-body capture required");

        let normalizer = ThresholdNormalizer::new(&config.thresholds);
        let release = FlowScore::from_components(vec![assessment.release.component.clone()]);
        let timing = FlowScore::from_components(vec![assessment.timing.component.clone()]);
        let upstream = FlowScore::from_components(vec![assessment.upstream.component.clone()]);
        let output = FlowScore::from_components(vec![normalizer.score_gated(
            MetricKey::BatSpeedCv,
            assessment.bat_speed_cv,
            assessment.variance_gated,
        )]);

        let scorer = CompositeScorer::new(config.weights);
        let dims = DimensionSet {
            bat: scorer.dimension(&[&release]),
            brain: scorer.dimension(&[&timing]),
            body: scorer.dimension(&[&upstream]),
            ball: scorer.dimension(&[&output]),
        };

        let projection = ProjectionModel::new(&config.projection).from_speed(
            assessment.mean_bat_speed_mph,
            assessment.kinetic_potential.total_mph,
            input.level,
            false,
        );

        let components: BTreeMap<String, FlowScore> = SENSOR_FLOWS
            .iter()
            .map(|name| name.to_string())
            .zip([release, timing, upstream, output])
            .collect();
        quality.gated_scores = gated_names(&components);

        let mut raw = BTreeMap::new();
        put(&mut raw, "mean_bat_speed_mph", Some(assessment.mean_bat_speed_mph));
        put(&mut raw, "mean_hand_speed_mph", Some(assessment.mean_hand_speed_mph));
        put(&mut raw, "release_ratio", Some(assessment.release_ratio));
        put(&mut raw, "time_to_contact_cv", assessment.time_to_contact_cv);
        put(&mut raw, "bat_speed_cv", assessment.bat_speed_cv);
        put(&mut raw, "attack_angle_std_deg", assessment.attack_angle_std_deg);

        let leak = self.classifier.unknown();
        let mut score = self.assemble(
            ScoringMode::SensorOnly,
            input.level,
            dims,
            components,
            leak,
            quality,
        );
        score.raw_metrics = raw;
        score.projections = Some(projection);
        score.predictions = vec![
            assessment.release.clone(),
            assessment.timing.clone(),
            assessment.upstream.clone(),
        ];
        score.kinetic_potential = Some(assessment.kinetic_potential);
        score
    }

    fn assemble(
        &self,
        mode: ScoringMode,
        level: PlayerLevel,
        dims: DimensionSet,
        components: BTreeMap<String, FlowScore>,
        leak: LeakResult,
        data_quality: DataQualityReport,
    ) -> FourBScore {
        let composite = CompositeScorer::new(self.config.weights).composite(&dims);
        FourBScore {
            schema_version: SCHEMA_VERSION.to_string(),
            config_version: self.config.version.clone(),
            mode,
            level,
            brain: dims.brain,
            body: dims.body,
            bat: dims.bat,
            ball: dims.ball,
            composite,
            weights: self.config.weights,
            components,
            raw_metrics: BTreeMap::new(),
            leak,
            data_quality,
            projections: None,
            kinetic_potential: None,
            predictions: Vec::new(),
        }
    }

    /// Parse counts and channel inventory shared by every path
    fn base_quality(&self, input: &SessionInput) -> DataQualityReport {
        let report = input.parse_report();
        let mut quality = DataQualityReport {
            channels_present: input.channels_present(),
            parse: ParseSummary::from(&report),
            ..DataQualityReport::default()
        };

        if report.coerced_cells > 0 {
            quality.warn(format!(
                "{} unparsable numeric cell(s) coerced to 0",
                report.coerced_cells
            ));
        }
        if report.dropped_rows > 0 {
            quality.warn(format!(
                "{} row(s) dropped for unparsable numeric cells",
                report.dropped_rows
            ));
        }
        if !report.unknown_headers.is_empty() {
            quality.warn(format!(
                "ignored unrecognised columns: {}",
                report.unknown_headers.join(", ")
            ));
        }
        if report.synthesized_time {
            quality.warn(format!(
                "no time column; time synthesised at {} Hz",
                self.config.ingest.default_sample_rate_hz
            ));
        }
        quality
    }
}

fn fill_motion_quality(
    quality: &mut DataQualityReport,
    metrics: &SessionMetrics,
    features: &[SwingFeatures],
) {
    quality.swing_count = metrics.swing_count;
    quality.contact_events_detected = metrics.contact_events_detected;
    quality.contact_methods = metrics
        .contact_methods
        .iter()
        .map(|(method, count)| (method.as_str().to_string(), *count))
        .collect();
    quality.weakest_contact_tier = metrics.weakest_contact;
    quality.swing_contacts = features
        .iter()
        .map(|swing| SwingContact {
            swing_id: swing.swing_id.clone(),
            method: swing.contact_method,
            tier: swing.contact_confidence,
        })
        .collect();
    quality.bat_energy_coverage = metrics.bat_energy_coverage;
    quality.bat_energy_meaningful = metrics.bat_energy_meaningful;
    quality.proxy_delivered_energy = metrics.proxy_delivered_energy;
    for warning in &metrics.warnings {
        quality.warn(warning.clone());
    }
}

/// "flow.metric" for every gated component
fn gated_names(components: &BTreeMap<String, FlowScore>) -> Vec<String> {
    components
        .iter()
        .flat_map(|(flow, score)| {
            score
                .components
                .iter()
                .filter(|c| c.status == ComponentStatus::Gated)
                .map(move |c| format!("{}.{}", flow, c.metric.as_str()))
        })
        .collect()
}

fn motion_raw_metrics(metrics: &SessionMetrics) -> BTreeMap<String, f64> {
    let pct = |rate: Option<f64>| rate.map(|r| r * 100.0);
    let mut raw = BTreeMap::new();
    put(&mut raw, "pelvis_velocity_dps", metrics.pelvis_velocity);
    put(&mut raw, "torso_velocity_dps", metrics.torso_velocity);
    put(&mut raw, "separation_deg", metrics.separation);
    put(&mut raw, "separation_rate_dps", metrics.separation_rate);
    put(&mut raw, "legs_energy_j", metrics.legs_energy);
    put(&mut raw, "torso_energy_j", metrics.torso_energy);
    put(&mut raw, "arms_energy_j", metrics.arms_energy);
    put(&mut raw, "bat_energy_j", metrics.bat_energy);
    put(&mut raw, "total_energy_j", metrics.total_energy);
    put(&mut raw, "delivered_energy_j", metrics.delivered_energy);
    put(&mut raw, "delivery_efficiency_pct", metrics.delivery_efficiency);
    put(&mut raw, "swing_duration_ms", metrics.swing_duration_ms);
    put(&mut raw, "pelvis_velocity_cv", metrics.pelvis_velocity_cv);
    put(&mut raw, "torso_velocity_cv", metrics.torso_velocity_cv);
    put(&mut raw, "swing_duration_cv", metrics.swing_duration_cv);
    put(&mut raw, "delivered_energy_cv", metrics.delivered_energy_cv);
    put(&mut raw, "proper_sequence_pct", pct(metrics.proper_sequence_rate));
    put(
        &mut raw,
        "legs_peak_after_contact_pct",
        pct(metrics.legs_peak_after_contact_rate),
    );
    put(&mut raw, "upper_before_lower_pct", pct(metrics.upper_before_lower_rate));
    put(&mut raw, "ground_to_contact_ms", metrics.ground_to_contact_ms);
    for (channel, angle) in &metrics.joint_angles {
        put(
            &mut raw,
            &format!("{}_at_contact_deg", channel.name()),
            Some(*angle),
        );
    }
    raw
}

fn put(raw: &mut BTreeMap<String, f64>, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        raw.insert(key.to_string(), display_round(v));
    }
}
