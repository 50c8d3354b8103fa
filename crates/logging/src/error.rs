//! Writer error types
//!
//! Two layers of errors cross the framework. [`WriterError`] is the fatal
//! layer: a hook returning it disables the writer's frontend and makes the
//! backend terminal. [`WriteError`] is the per-record layer used by
//! non-batch writers; its fatality flag decides whether the failure takes
//! the writer down. Batch writers report [`WriteErrorInfo`] ranges instead.

use thiserror::Error;

/// Fatal writer errors
#[derive(Debug, Error)]
pub enum WriterError {
    /// Writer initialization failed
    #[error("failed to initialize writer: {0}")]
    Init(String),

    /// Record schema disagrees with the fields installed at init
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Writing records failed fatally
    #[error("write failed: {0}")]
    Write(String),

    /// Flushing buffered output failed
    #[error("flush failed: {0}")]
    Flush(String),

    /// Rotating the output artifact failed
    #[error("rotation failed: {0}")]
    Rotate(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal protocol violation
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WriterError {
    /// Create an initialization error
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a rotation error
    pub fn rotate(msg: impl Into<String>) -> Self {
        Self::Rotate(msg.into())
    }
}

/// Result type for writer operations
pub type Result<T> = std::result::Result<T, WriterError>;

/// A single failed record write, reported by non-batch writers
#[derive(Debug, Error)]
#[error("{message}")]
pub struct WriteError {
    /// Description of the failure
    pub message: String,

    /// True if the underlying sink is irrecoverable
    pub is_fatal: bool,
}

impl WriteError {
    /// A failure the writer can survive (the record is skipped)
    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_fatal: false,
        }
    }

    /// A failure that must shut the writer down
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            is_fatal: true,
        }
    }
}

/// A problem that prevented writing a contiguous range of records
///
/// Batch writers return zero or more of these from `write_batch`; indices
/// are relative to the start of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteErrorInfo {
    /// Index of the first record the description applies to
    pub first_record_index: usize,

    /// Number of records in the range
    pub record_count: usize,

    /// Text description of the problem
    pub description: String,

    /// True if the writer must be shut down
    pub is_fatal: bool,
}

impl WriteErrorInfo {
    /// Create an error range
    pub fn new(
        first_record_index: usize,
        record_count: usize,
        description: impl Into<String>,
        is_fatal: bool,
    ) -> Self {
        Self {
            first_record_index,
            record_count,
            description: description.into(),
            is_fatal,
        }
    }
}

/// Description used for records skipped after an earlier fatal failure
pub const NOT_WRITTEN_DESCRIPTION: &str = "Not written due to previous error";
