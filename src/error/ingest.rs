// Ingest error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Ingest error code constants
///
/// Error code range: 1001-1005
pub struct IngestErrorCodes {}

impl IngestErrorCodes {
    /// Input contained no bytes or only whitespace
    pub const EMPTY_INPUT: i32 = 1001;

    /// Input had no header row
    pub const MISSING_HEADER: i32 = 1002;

    /// CSV reader rejected the input
    pub const MALFORMED_CSV: i32 = 1003;

    /// No column matched a known channel alias
    pub const NO_KNOWN_COLUMNS: i32 = 1004;

    /// Reading the underlying source failed
    pub const IO: i32 = 1005;
}

/// Log an ingest error with structured context
pub fn log_ingest_error(err: &IngestError, context: &str) {
    error!(
        "Ingest error in {}: code={}, component=FrameTableNormalizer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while turning raw tabular bytes into a frame table
///
/// Individual bad cells never produce one of these; they are coerced or
/// dropped according to the parse policy and counted in the parse report.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Nothing to parse
    EmptyInput,

    /// The first record could not be read as a header row
    MissingHeader,

    /// CSV syntax error at a given line
    MalformedCsv { line: u64, reason: String },

    /// None of the headers matched a known channel
    NoKnownColumns { headers: Vec<String> },

    /// Underlying reader failed
    Io { details: String },
}

impl ErrorCode for IngestError {
    fn code(&self) -> i32 {
        match self {
            IngestError::EmptyInput => IngestErrorCodes::EMPTY_INPUT,
            IngestError::MissingHeader => IngestErrorCodes::MISSING_HEADER,
            IngestError::MalformedCsv { .. } => IngestErrorCodes::MALFORMED_CSV,
            IngestError::NoKnownColumns { .. } => IngestErrorCodes::NO_KNOWN_COLUMNS,
            IngestError::Io { .. } => IngestErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            IngestError::EmptyInput => "Input table is empty".to_string(),
            IngestError::MissingHeader => "Input table has no header row".to_string(),
            IngestError::MalformedCsv { line, reason } => {
                format!("Malformed CSV at line {}: {}", line, reason)
            }
            IngestError::NoKnownColumns { headers } => {
                format!(
                    "No recognised columns among headers: [{}]",
                    headers.join(", ")
                )
            }
            IngestError::Io { details } => format!("Failed to read input: {}", details),
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for IngestError {}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line()).unwrap_or(0);
        if err.is_io_error() {
            return IngestError::Io {
                details: err.to_string(),
            };
        }
        IngestError::MalformedCsv {
            line,
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_error_codes() {
        assert_eq!(IngestError::EmptyInput.code(), 1001);
        assert_eq!(IngestError::MissingHeader.code(), 1002);
        assert_eq!(
            IngestError::MalformedCsv {
                line: 3,
                reason: "test".to_string()
            }
            .code(),
            1003
        );
        assert_eq!(
            IngestError::NoKnownColumns { headers: vec![] }.code(),
            1004
        );
        assert_eq!(
            IngestError::Io {
                details: "test".to_string()
            }
            .code(),
            1005
        );
    }

    #[test]
    fn test_ingest_error_messages() {
        let err = IngestError::MalformedCsv {
            line: 7,
            reason: "unequal lengths".to_string(),
        };
        assert_eq!(err.message(), "Malformed CSV at line 7: unequal lengths");

        let err = IngestError::NoKnownColumns {
            headers: vec!["foo".to_string(), "bar".to_string()],
        };
        assert!(err.message().contains("foo, bar"));
    }

    #[test]
    fn test_ingest_error_display() {
        let err = IngestError::EmptyInput;
        let display = format!("{}", err);
        assert!(display.contains("IngestError"));
        assert!(display.contains("1001"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing export");
        let err: IngestError = io_err.into();
        match err {
            IngestError::Io { details } => assert!(details.contains("missing export")),
            _ => panic!("Expected Io variant"),
        }
    }
}
