//! Record formatters
//!
//! A formatter turns one log record into its textual representation,
//! without the trailing newline. The ASCII formatter produces
//! delimiter-separated columns; the JSON formatter produces one object
//! per record. Writers cache a formatter at init and reuse it for every
//! record.

use thiserror::Error;

use vigil_record::{Field, LogRecord};

/// Delimiter-separated text formatter
pub mod ascii;

/// JSON-lines formatter
pub mod json;

pub use ascii::{AsciiFormatter, SeparatorInfo};
pub use json::JsonFormatter;

/// Errors raised while formatting a record
///
/// Formatting errors are per-record and non-fatal: the writer skips the
/// record and reports it.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The record could not be rendered
    #[error("couldn't format log record: {0}")]
    Render(String),

    /// JSON serialization failed
    #[error("couldn't serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// How time cells are rendered in JSON output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// Seconds since the epoch, fractional
    Epoch,

    /// Milliseconds since the epoch, integral
    Millis,

    /// ISO 8601 in UTC with microsecond precision
    Iso8601,
}

impl TimeFormat {
    /// Parse the script-level name of a time format
    pub fn from_config(value: &str) -> Option<Self> {
        match value {
            "JSON::TS_EPOCH" => Some(Self::Epoch),
            "JSON::TS_MILLIS" => Some(Self::Millis),
            "JSON::TS_ISO8601" => Some(Self::Iso8601),
            _ => None,
        }
    }
}

/// Renders one record as a line of text, newline excluded
pub trait LogFormatter: Send {
    /// Append the record's representation to `out`
    fn format(&self, fields: &[Field], record: &LogRecord, out: &mut String)
        -> Result<(), FormatError>;
}
