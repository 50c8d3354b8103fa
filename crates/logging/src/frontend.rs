//! Writer frontend
//!
//! The main-thread side of a writer. The analysis engine calls plain
//! methods here; the frontend turns them into input messages for the
//! backend task. Single-record writes are buffered and dispatched in bulk,
//! either when the buffer fills or when an explicit flush is requested
//! (the backend asks for one at every heartbeat).
//!
//! Once disabled - typically by a `Disable` output message after a fatal
//! backend error - every further operation is silently dropped and owned
//! inputs are destroyed on the spot.

use tokio::sync::mpsc;

use vigil_record::{Field, LogRecord, WriterInfo};

use crate::message::{InputMessage, OutputMessage};

/// Records buffered per frontend before a bulk dispatch
pub const WRITER_BUFFER_SIZE: usize = 1000;

/// Main-thread shim for one writer instance
pub struct WriterFrontend {
    /// Descriptive writer name, e.g. `conn/Log::WRITER_ASCII`
    name: String,

    /// Writer metadata (a copy also lives in the backend)
    info: WriterInfo,

    /// Schema size fixed at init
    num_fields: usize,

    /// Input queue to the backend task; enqueue never blocks
    input: mpsc::UnboundedSender<InputMessage>,

    /// Output queue from the backend task
    output: mpsc::UnboundedReceiver<OutputMessage>,

    /// Buffer for bulk writes
    write_buffer: Vec<LogRecord>,

    disabled: bool,
    initialized: bool,
    buffering: bool,
}

impl WriterFrontend {
    /// Create a frontend over an input/output channel pair
    pub fn new(
        name: impl Into<String>,
        info: WriterInfo,
        input: mpsc::UnboundedSender<InputMessage>,
        output: mpsc::UnboundedReceiver<OutputMessage>,
    ) -> Self {
        Self {
            name: name.into(),
            info,
            num_fields: 0,
            input,
            output,
            write_buffer: Vec::new(),
            disabled: false,
            initialized: false,
            buffering: true,
        }
    }

    /// Descriptive writer name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writer metadata
    #[inline]
    pub fn info(&self) -> &WriterInfo {
        &self.info
    }

    /// Number of schema fields installed at init
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// True once the frontend has been disabled
    #[inline]
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// Initialize the writer with its schema
    ///
    /// Must be called once, before any write.
    pub fn init(&mut self, fields: Vec<Field>) {
        if self.disabled {
            return;
        }
        if self.initialized {
            tracing::warn!(writer = %self.name, "duplicate init ignored");
            return;
        }

        self.num_fields = fields.len();
        self.initialized = true;
        self.send(InputMessage::Init { fields });
    }

    /// Queue one record for writing
    ///
    /// Buffered locally; a bulk `Write` message goes out when the buffer
    /// reaches [`WRITER_BUFFER_SIZE`] or on [`flush_write_buffer`].
    ///
    /// [`flush_write_buffer`]: Self::flush_write_buffer
    pub fn write(&mut self, record: LogRecord) {
        if self.disabled || !self.initialized {
            return;
        }

        self.write_buffer.push(record);
        if self.write_buffer.len() >= WRITER_BUFFER_SIZE {
            self.flush_write_buffer();
        }
    }

    /// Change the backend's buffering state
    pub fn set_buf(&mut self, enabled: bool) {
        if self.disabled {
            return;
        }
        self.buffering = enabled;
        self.send(InputMessage::SetBuf { enabled });
    }

    /// Flush the writer's output, dispatching buffered writes first
    pub fn flush(&mut self, network_time: f64) {
        if self.disabled {
            return;
        }
        self.flush_write_buffer();
        self.send(InputMessage::Flush { network_time });
    }

    /// Trigger rotation of the writer's output artifact
    pub fn rotate(&mut self, rotated_path: impl Into<String>, open: f64, close: f64, terminating: bool) {
        if self.disabled {
            return;
        }
        self.flush_write_buffer();
        self.send(InputMessage::Rotate {
            rotated_path: rotated_path.into(),
            open,
            close,
            terminating,
        });
    }

    /// Dispatch all buffered writes to the backend now
    pub fn flush_write_buffer(&mut self) {
        if self.disabled || self.write_buffer.is_empty() {
            return;
        }
        let records = std::mem::take(&mut self.write_buffer);
        self.send(InputMessage::Write {
            num_fields: self.num_fields,
            records,
        });
    }

    /// Stop the writer: dispatch buffered writes, then the terminator
    ///
    /// The backend drains everything queued before the terminator, so no
    /// record sent before `stop` is lost.
    pub fn stop(&mut self, network_time: f64) {
        if self.disabled {
            return;
        }
        self.flush_write_buffer();
        self.send(InputMessage::Finish { network_time });
    }

    /// Disable the frontend; all further operations become no-ops
    pub fn set_disable(&mut self) {
        self.disabled = true;
        self.write_buffer.clear();
    }

    /// Drain pending output messages in FIFO order
    ///
    /// `Disable` and `FlushWriteBuffer` are applied to the frontend
    /// itself; rotation completions and writer events are returned for
    /// the analysis engine.
    pub fn process_output(&mut self) -> Vec<OutputMessage> {
        let mut for_engine = Vec::new();
        while let Ok(msg) = self.output.try_recv() {
            match msg {
                OutputMessage::Disable => self.set_disable(),
                OutputMessage::FlushWriteBuffer => self.flush_write_buffer(),
                other => for_engine.push(other),
            }
        }
        for_engine
    }

    fn send(&mut self, msg: InputMessage) {
        // A closed channel means the backend already exited; dropping the
        // message matches the disabled-frontend contract.
        if self.input.send(msg).is_err() {
            self.disabled = true;
        }
    }
}

#[cfg(test)]
#[path = "frontend_test.rs"]
mod frontend_test;
