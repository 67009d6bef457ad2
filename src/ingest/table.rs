// FrameTable - columnar store for one motion-capture export
//
// A FrameTable holds every row of a kinematics or energy export as typed
// numeric columns keyed by Channel, plus the swing id of each row and a
// time axis (read from the export, or synthesised from the row index when
// the export has no time column). Missing channels simply have no column.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use super::columns::Channel;
use crate::config::{IngestConfig, ParsePolicy};
use crate::error::IngestError;

/// Swing id assigned when the export has no id column
pub const DEFAULT_SWING_ID: &str = "1";

/// One sample of an export, for programmatic construction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawFrame {
    pub swing_id: String,
    /// Seconds; `None` lets the table synthesise time from the row index
    pub time: Option<f64>,
    pub values: BTreeMap<Channel, f64>,
}

impl RawFrame {
    pub fn new(swing_id: impl Into<String>, time: f64) -> Self {
        Self {
            swing_id: swing_id.into(),
            time: Some(time),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.values.insert(channel, value);
        self
    }
}

/// Bookkeeping from parsing, surfaced in the data-quality report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub coerced_cells: usize,
    pub dropped_rows: usize,
    pub recognised: Vec<Channel>,
    pub unknown_headers: Vec<String>,
    pub duplicate_headers: Vec<String>,
    pub synthesized_time: bool,
}

impl ParseReport {
    pub fn merge(&mut self, other: &ParseReport) {
        self.rows_read += other.rows_read;
        self.rows_kept += other.rows_kept;
        self.coerced_cells += other.coerced_cells;
        self.dropped_rows += other.dropped_rows;
        for channel in &other.recognised {
            if !self.recognised.contains(channel) {
                self.recognised.push(*channel);
            }
        }
        self.recognised.sort();
        for header in &other.unknown_headers {
            if !self.unknown_headers.contains(header) {
                self.unknown_headers.push(header.clone());
            }
        }
        for header in &other.duplicate_headers {
            if !self.duplicate_headers.contains(header) {
                self.duplicate_headers.push(header.clone());
            }
        }
        self.synthesized_time |= other.synthesized_time;
    }
}

/// Columnar frame table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameTable {
    swing_ids: Vec<String>,
    times: Vec<f64>,
    columns: BTreeMap<Channel, Vec<f64>>,
    report: ParseReport,
}

impl FrameTable {
    /// Build a table from rows
    ///
    /// A channel present in any frame becomes a column; frames lacking it
    /// hold NaN there, which every downstream computation skips.
    pub fn from_frames(frames: &[RawFrame], sample_rate_hz: f64) -> Self {
        let mut channels: Vec<Channel> = frames
            .iter()
            .flat_map(|frame| frame.values.keys().copied())
            .filter(|channel| channel.is_numeric() && *channel != Channel::Time)
            .collect();
        channels.sort();
        channels.dedup();

        let mut columns: BTreeMap<Channel, Vec<f64>> = channels
            .iter()
            .map(|channel| (*channel, Vec::with_capacity(frames.len())))
            .collect();
        let mut swing_ids = Vec::with_capacity(frames.len());
        let mut raw_times = Vec::with_capacity(frames.len());

        for frame in frames {
            let id = if frame.swing_id.trim().is_empty() {
                DEFAULT_SWING_ID.to_string()
            } else {
                frame.swing_id.trim().to_string()
            };
            swing_ids.push(id);
            raw_times.push(frame.time);
            for (channel, column) in columns.iter_mut() {
                column.push(frame.values.get(channel).copied().unwrap_or(f64::NAN));
            }
        }

        let synthesized_time = raw_times.iter().any(|t| t.is_none());
        let times = if synthesized_time {
            synthesize_times(&swing_ids, sample_rate_hz)
        } else {
            raw_times.into_iter().map(|t| t.unwrap_or(0.0)).collect()
        };

        let mut recognised = channels.clone();
        recognised.push(Channel::SwingId);
        if !synthesized_time {
            recognised.push(Channel::Time);
        }
        recognised.sort();

        Self {
            report: ParseReport {
                rows_read: frames.len(),
                rows_kept: frames.len(),
                recognised,
                synthesized_time,
                ..ParseReport::default()
            },
            swing_ids,
            times,
            columns,
        }
    }

    /// Parse CSV text
    pub fn from_csv_str(text: &str, config: &IngestConfig) -> Result<Self, IngestError> {
        if text.trim().is_empty() {
            return Err(IngestError::EmptyInput);
        }
        Self::from_reader(text.as_bytes(), config)
    }

    /// Parse CSV from any reader
    ///
    /// # Arguments
    /// * `reader` - CSV source with a header row
    /// * `config` - Parse policy and fallback sample rate
    ///
    /// # Returns
    /// * `Ok(FrameTable)` - Parsed table (possibly with zero rows)
    /// * `Err(IngestError)` - No header, no recognised column, or a CSV syntax error
    pub fn from_reader<R: Read>(reader: R, config: &IngestConfig) -> Result<Self, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(IngestError::MissingHeader);
        }

        let mut report = ParseReport::default();
        let mut mapping: Vec<Option<Channel>> = Vec::with_capacity(headers.len());
        for header in headers.iter() {
            match Channel::from_header(header) {
                Some(channel) if mapping.contains(&Some(channel)) => {
                    report.duplicate_headers.push(header.to_string());
                    mapping.push(None);
                }
                Some(channel) => mapping.push(Some(channel)),
                None => {
                    if !header.trim().is_empty() {
                        report.unknown_headers.push(header.to_string());
                    }
                    mapping.push(None);
                }
            }
        }

        if mapping.iter().all(|m| m.is_none()) {
            return Err(IngestError::NoKnownColumns {
                headers: headers.iter().map(|h| h.to_string()).collect(),
            });
        }

        let numeric: Vec<(usize, Channel)> = mapping
            .iter()
            .enumerate()
            .filter_map(|(idx, m)| m.map(|channel| (idx, channel)))
            .filter(|(_, channel)| channel.is_numeric())
            .collect();
        let id_column = mapping.iter().position(|m| *m == Some(Channel::SwingId));
        let time_column = mapping.iter().position(|m| *m == Some(Channel::Time));

        let mut columns: BTreeMap<Channel, Vec<f64>> = numeric
            .iter()
            .filter(|(_, channel)| *channel != Channel::Time)
            .map(|(_, channel)| (*channel, Vec::new()))
            .collect();
        let mut swing_ids = Vec::new();
        let mut times = Vec::new();

        let mut row_values: Vec<(Channel, f64)> = Vec::with_capacity(numeric.len());
        for record in csv_reader.records() {
            let record = record?;
            report.rows_read += 1;
            if record.iter().all(|cell| cell.is_empty()) {
                report.dropped_rows += 1;
                continue;
            }

            row_values.clear();
            let mut bad_cells = 0usize;
            for (idx, channel) in &numeric {
                let cell = record.get(*idx).unwrap_or("");
                match parse_cell(cell) {
                    Some(value) => row_values.push((*channel, value)),
                    None => {
                        bad_cells += 1;
                        row_values.push((*channel, 0.0));
                    }
                }
            }

            if bad_cells > 0 {
                match config.parse_policy {
                    ParsePolicy::CoerceZero => report.coerced_cells += bad_cells,
                    ParsePolicy::DropRow => {
                        report.dropped_rows += 1;
                        continue;
                    }
                }
            }

            let id = id_column
                .and_then(|idx| record.get(idx))
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .unwrap_or(DEFAULT_SWING_ID);
            swing_ids.push(id.to_string());

            for (channel, value) in &row_values {
                if *channel == Channel::Time {
                    times.push(*value);
                } else if let Some(column) = columns.get_mut(channel) {
                    column.push(*value);
                }
            }
            report.rows_kept += 1;
        }

        if time_column.is_none() {
            report.synthesized_time = true;
            times = synthesize_times(&swing_ids, config.default_sample_rate_hz);
        }

        report.recognised = mapping.iter().flatten().copied().collect();
        report.recognised.sort();
        report.recognised.dedup();

        log::debug!(
            "[Ingest] Parsed {} rows ({} kept, {} coerced cells, {} dropped), {} channels",
            report.rows_read,
            report.rows_kept,
            report.coerced_cells,
            report.dropped_rows,
            report.recognised.len()
        );

        Ok(Self {
            swing_ids,
            times,
            columns,
            report,
        })
    }

    pub fn len(&self) -> usize {
        self.swing_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swing_ids.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn swing_ids(&self) -> &[String] {
        &self.swing_ids
    }

    /// Column values, if the channel was present
    pub fn channel(&self, channel: Channel) -> Option<&[f64]> {
        self.columns.get(&channel).map(|c| c.as_slice())
    }

    /// Whether the channel exists with at least one finite value
    pub fn has_channel(&self, channel: Channel) -> bool {
        self.channel(channel)
            .map(|values| values.iter().any(|v| v.is_finite()))
            .unwrap_or(false)
    }

    /// Channels with at least one finite value
    pub fn channels(&self) -> Vec<Channel> {
        self.columns
            .keys()
            .copied()
            .filter(|channel| self.has_channel(*channel))
            .collect()
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    /// Row indices grouped by swing id
    ///
    /// Groups come out in order of first appearance; rows inside a group are
    /// ordered by time (stable for equal times).
    pub fn swing_groups(&self) -> Vec<(String, Vec<usize>)> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, id) in self.swing_ids.iter().enumerate() {
            let entry = groups.entry(id.as_str()).or_default();
            if entry.is_empty() {
                order.push(id.clone());
            }
            entry.push(row);
        }

        order
            .into_iter()
            .map(|id| {
                let mut rows = groups.remove(id.as_str()).unwrap_or_default();
                rows.sort_by(|a, b| self.times[*a].total_cmp(&self.times[*b]));
                (id, rows)
            })
            .collect()
    }
}

fn parse_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Time axis from row position within each swing
fn synthesize_times(swing_ids: &[String], sample_rate_hz: f64) -> Vec<f64> {
    let rate = if sample_rate_hz > 0.0 {
        sample_rate_hz
    } else {
        240.0
    };
    let mut counters: BTreeMap<&str, usize> = BTreeMap::new();
    swing_ids
        .iter()
        .map(|id| {
            let counter = counters.entry(id.as_str()).or_insert(0);
            let t = *counter as f64 / rate;
            *counter += 1;
            t
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: ParsePolicy) -> IngestConfig {
        IngestConfig {
            parse_policy: policy,
            default_sample_rate_hz: 100.0,
        }
    }

    #[test]
    fn test_parse_basic_csv() {
        let csv = "Swing ID,Time (s),Pelvis Rotation (deg),Torso_Rot,mystery\n\
                   1,0.00,10,5,x\n\
                   1,0.01,12,6,y\n\
                   2,0.00,11,4,z\n";
        let table = FrameTable::from_csv_str(csv, &config(ParsePolicy::CoerceZero)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.channel(Channel::PelvisRot), Some(&[10.0, 12.0, 11.0][..]));
        assert_eq!(table.report().unknown_headers, vec!["mystery".to_string()]);
        assert!(!table.report().synthesized_time);
        let groups = table.swing_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], ("1".to_string(), vec![0, 1]));
        assert_eq!(groups[1], ("2".to_string(), vec![2]));
    }

    #[test]
    fn test_coerce_zero_policy_counts_cells() {
        let csv = "swing,time,bat_ke\n1,0.0,abc\n1,0.1,\n1,0.2,4.5\n";
        let table = FrameTable::from_csv_str(csv, &config(ParsePolicy::CoerceZero)).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.channel(Channel::BatKe), Some(&[0.0, 0.0, 4.5][..]));
        assert_eq!(table.report().coerced_cells, 2);
        assert_eq!(table.report().dropped_rows, 0);
    }

    #[test]
    fn test_drop_row_policy() {
        let csv = "swing,time,bat_ke\n1,0.0,abc\n1,0.1,2.0\n1,0.2,4.5\n";
        let table = FrameTable::from_csv_str(csv, &config(ParsePolicy::DropRow)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.report().dropped_rows, 1);
        assert_eq!(table.times(), &[0.1, 0.2]);
    }

    #[test]
    fn test_missing_time_and_id_columns() {
        let csv = "pelvis_rot\n1\n2\n3\n";
        let table = FrameTable::from_csv_str(csv, &config(ParsePolicy::CoerceZero)).unwrap();
        assert!(table.report().synthesized_time);
        assert_eq!(table.times(), &[0.0, 0.01, 0.02]);
        assert!(table.swing_ids().iter().all(|id| id == DEFAULT_SWING_ID));
    }

    #[test]
    fn test_rows_sorted_by_time_within_swing() {
        let csv = "swing,time,torso\nA,0.2,3\nA,0.0,1\nA,0.1,2\n";
        let table = FrameTable::from_csv_str(csv, &config(ParsePolicy::CoerceZero)).unwrap();
        let groups = table.swing_groups();
        assert_eq!(groups[0].1, vec![1, 2, 0]);
    }

    #[test]
    fn test_empty_and_unknown_inputs() {
        assert_eq!(
            FrameTable::from_csv_str("   \n", &IngestConfig::default()),
            Err(IngestError::EmptyInput)
        );
        let err = FrameTable::from_csv_str("foo,bar\n1,2\n", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::NoKnownColumns { .. }));
    }

    #[test]
    fn test_header_only_table_is_empty_not_error() {
        let table =
            FrameTable::from_csv_str("swing,time,bat_ke\n", &IngestConfig::default()).unwrap();
        assert!(table.is_empty());
        assert!(table.swing_groups().is_empty());
    }

    #[test]
    fn test_from_frames_fills_missing_with_nan() {
        let frames = vec![
            RawFrame::new("1", 0.0).with(Channel::PelvisRot, 1.0),
            RawFrame::new("1", 0.1).with(Channel::TorsoRot, 2.0),
        ];
        let table = FrameTable::from_frames(&frames, 240.0);
        let pelvis = table.channel(Channel::PelvisRot).unwrap();
        assert_eq!(pelvis[0], 1.0);
        assert!(pelvis[1].is_nan());
        assert!(table.has_channel(Channel::TorsoRot));
        assert!(!table.has_channel(Channel::BatKe));
    }

    #[test]
    fn test_duplicate_headers_first_wins() {
        let csv = "swing,time,bat_ke,bat_energy\n1,0,5,9\n";
        let table = FrameTable::from_csv_str(csv, &IngestConfig::default()).unwrap();
        assert_eq!(table.channel(Channel::BatKe), Some(&[5.0][..]));
        assert_eq!(table.report().duplicate_headers, vec!["bat_energy".to_string()]);
    }
}
