//! Message protocol between frontend and backend
//!
//! Each writer has two unidirectional FIFO queues: input messages travel
//! main thread -> writer task, output messages travel writer task -> main
//! thread. Records inside a `Write` message are owned and move with it;
//! after dispatch the main side never touches them again.
//!
//! ```text
//! [Frontend] --InputMessage--> [Backend task] --OutputMessage--> [Frontend pump]
//! ```

use vigil_record::{Field, LogRecord, Value};

/// Messages from the frontend to its backend
#[derive(Debug)]
pub enum InputMessage {
    /// One-time initialization with the writer's schema
    Init { fields: Vec<Field> },

    /// A bulk write; `num_fields` must match the schema installed at init
    Write {
        num_fields: usize,
        records: Vec<LogRecord>,
    },

    /// Change the buffering state
    SetBuf { enabled: bool },

    /// Flush buffered output
    Flush { network_time: f64 },

    /// Rotate the output artifact
    Rotate {
        rotated_path: String,
        open: f64,
        close: f64,
        terminating: bool,
    },

    /// Periodic tick from the threading substrate
    Heartbeat { network_time: f64, current_time: f64 },

    /// Terminator: the backend drains everything queued before this
    /// message, processes it, and exits
    Finish { network_time: f64 },
}

/// Messages from a backend to the main thread
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    /// A rotation request has been processed
    ///
    /// `success` is true when there is a rotated artifact for
    /// post-processing; a writer with nothing to rotate reports
    /// `success == false` with no names.
    RotationFinished {
        new_name: Option<String>,
        old_name: Option<String>,
        open: f64,
        close: f64,
        success: bool,
        terminating: bool,
    },

    /// Ask the frontend to dispatch its buffered writes
    FlushWriteBuffer,

    /// Disable the frontend; it drops every further operation
    Disable,

    /// A structured event for the analysis engine
    Event(WriterEvent),
}

/// Name of the periodic statistics event
pub const LOG_STATISTICS: &str = "Log::statistics";

/// Name of the write-error event
pub const LOG_WRITE_ERROR: &str = "Log::write_error";

/// A named event carrying owned value cells back to the analysis engine
#[derive(Debug, Clone, PartialEq)]
pub struct WriterEvent {
    /// Event name, e.g. `Log::write_error`
    pub name: String,

    /// Event arguments
    pub values: Vec<Value>,
}

impl WriterEvent {
    /// Create an event
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a `Log::statistics` event from running totals
    pub fn statistics(records_received: u64, write_attempts: u64, writes_succeeded: u64) -> Self {
        Self::new(
            LOG_STATISTICS,
            vec![
                Value::count(records_received),
                Value::count(write_attempts),
                Value::count(writes_succeeded),
            ],
        )
    }

    /// Build a `Log::write_error` event for a range of failed records
    pub fn write_error(description: impl Into<String>, is_fatal: bool, count: u64) -> Self {
        Self::new(
            LOG_WRITE_ERROR,
            vec![
                Value::string(description),
                Value::bool(is_fatal),
                Value::count(count),
            ],
        )
    }
}
