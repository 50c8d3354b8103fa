//! Null writer
//!
//! Discards every record it is handed, counting as it goes. Useful as a
//! benchmark baseline and as the smallest possible record-at-a-time
//! writer.

use vigil_logging::{BackendCore, PushWriter, Result, WriteError, WriterPlugin};
use vigil_record::{Field, LogRecord};

/// Writer that discards all records
#[derive(Debug, Default)]
pub struct NullWriter {
    records_discarded: u64,
}

impl NullWriter {
    /// Create a null writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records discarded so far
    pub fn records_discarded(&self) -> u64 {
        self.records_discarded
    }
}

impl WriterPlugin for NullWriter {
    fn do_init(&mut self, _core: &mut BackendCore) -> Result<()> {
        Ok(())
    }

    fn do_flush(&mut self, _core: &mut BackendCore, _network_time: f64) -> Result<()> {
        Ok(())
    }

    fn do_rotate(
        &mut self,
        core: &mut BackendCore,
        _rotated_path: &str,
        _open: f64,
        _close: f64,
        _terminating: bool,
    ) -> Result<()> {
        // Nothing to rotate, but the protocol still wants an answer.
        core.finished_rotation_aborted();
        Ok(())
    }

    fn do_finish(&mut self, _core: &mut BackendCore, _network_time: f64) -> Result<()> {
        Ok(())
    }
}

impl PushWriter for NullWriter {
    fn write_record(
        &mut self,
        _fields: &[Field],
        _record: &LogRecord,
    ) -> std::result::Result<(), WriteError> {
        self.records_discarded += 1;
        Ok(())
    }
}

#[cfg(test)]
#[path = "null_test.rs"]
mod null_test;
