//! Frame table normalizer
//!
//! Turns raw tabular exports (kinematics, segment energy, sensor swing
//! summaries) into typed numeric columns. Column names are matched against
//! known aliases; unknown or missing columns degrade the matching feature to
//! "unavailable" instead of failing the parse.

pub mod columns;
pub mod sensor;
pub mod table;

pub use columns::{normalize_header, Channel, ChannelKind};
pub use sensor::{SensorSwing, SensorTable};
pub use table::{FrameTable, ParseReport, RawFrame, DEFAULT_SWING_ID};
