// Sensor swing summaries
//
// Bat-mounted sensors export one row per swing (bat speed, peak hand speed,
// time to contact, attack angle) instead of full-body time series. These rows
// feed the confidence-tiered predictor.

use std::io::Read;

use serde::{Deserialize, Serialize};

use super::columns::Channel;
use super::table::{FrameTable, ParseReport};
use crate::config::IngestConfig;
use crate::error::IngestError;

/// Time-to-contact values at or below this are read as seconds
const SECONDS_LIMIT: f64 = 5.0;

/// One sensor-reported swing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSwing {
    pub swing_id: String,
    pub bat_speed_mph: f64,
    pub hand_speed_mph: f64,
    pub time_to_contact_ms: Option<f64>,
    pub attack_angle_deg: Option<f64>,
}

/// Parsed sensor export
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorTable {
    pub swings: Vec<SensorSwing>,
    pub report: ParseReport,
    /// Rows rejected for a non-positive bat or hand speed
    pub rejected: usize,
}

impl SensorTable {
    pub fn new(swings: Vec<SensorSwing>) -> Self {
        Self {
            swings,
            report: ParseReport::default(),
            rejected: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.swings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.swings.len()
    }

    pub fn from_csv_str(text: &str, config: &IngestConfig) -> Result<Self, IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput);
        }
        Self::from_reader(text.as_bytes(), config)
    }

    /// Parse a sensor summary CSV
    ///
    /// Reuses the frame-table parser so header aliases and the parse policy
    /// behave identically; each row becomes one swing.
    pub fn from_reader<R: Read>(reader: R, config: &IngestConfig) -> Result<Self, IngestError> {
        let table = FrameTable::from_reader(reader, config)?;
        let bat = table.channel(Channel::BatSpeed);
        let hand = table.channel(Channel::HandSpeed);
        let ttc = table.channel(Channel::TimeToContact);
        let attack = table.channel(Channel::AttackAngle);

        let mut swings = Vec::with_capacity(table.len());
        let mut rejected = 0usize;
        for row in 0..table.len() {
            let bat_speed = bat.map(|c| c[row]).unwrap_or(f64::NAN);
            let hand_speed = hand.map(|c| c[row]).unwrap_or(f64::NAN);
            if !(bat_speed > 0.0 && hand_speed > 0.0) {
                rejected += 1;
                continue;
            }
            swings.push(SensorSwing {
                swing_id: table.swing_ids()[row].clone(),
                bat_speed_mph: bat_speed,
                hand_speed_mph: hand_speed,
                time_to_contact_ms: ttc
                    .map(|c| c[row])
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .map(time_to_contact_ms),
                attack_angle_deg: attack.map(|c| c[row]).filter(|v| v.is_finite()),
            });
        }

        // Swing ids repeat the default when the export has no id column.
        if !table.report().recognised.contains(&Channel::SwingId) {
            for (idx, swing) in swings.iter_mut().enumerate() {
                swing.swing_id = (idx + 1).to_string();
            }
        }

        if rejected > 0 {
            log::warn!(
                "[Ingest] Rejected {} sensor rows without positive bat/hand speed",
                rejected
            );
        }

        Ok(Self {
            swings,
            report: table.report().clone(),
            rejected,
        })
    }
}

/// Normalise a time-to-contact reading to milliseconds
///
/// Sensor exports disagree on units; values at or below five are seconds.
pub fn time_to_contact_ms(value: f64) -> f64 {
    if value <= SECONDS_LIMIT {
        value * 1000.0
    } else {
        value
    }
}
