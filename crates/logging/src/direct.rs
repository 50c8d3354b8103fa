//! Record-at-a-time dispatch adapter
//!
//! Drives a [`PushWriter`] by iterating every record of a bulk write in
//! order and calling `write_record` for each. The loop stops at the first
//! failure; the failing index and the trailing unwritten range are
//! reported as `Log::write_error` events. All records are dropped before
//! returning, written or not.

use vigil_record::{ConfigMap, LogRecord};

use crate::backend::BackendCore;
use crate::error::{Result, WriterError};
use crate::plugin::{Dispatch, PushWriter, WriterPlugin};

/// Dispatch adapter for the record-at-a-time contract
pub struct DirectDispatch<W: PushWriter> {
    writer: W,
}

impl<W: PushWriter> DirectDispatch<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: PushWriter> Dispatch for DirectDispatch<W> {
    type Plugin = W;

    fn plugin_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    fn default_config() -> ConfigMap {
        ConfigMap::new()
    }

    fn write_logs(
        &mut self,
        core: &mut BackendCore,
        records: Vec<LogRecord>,
        _now: f64,
    ) -> Result<()> {
        let total = records.len();
        let mut succeeded = 0usize;
        let mut failure = None;

        for record in &records {
            match self.writer.write_record(core.fields(), record) {
                Ok(()) => succeeded += 1,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        let no_fatal = match &failure {
            Some(err) => core.handle_write_failure(succeeded, total, &err.message, err.is_fatal),
            None => true,
        };

        drop(records);
        core.report_write_statistics(total as u64, succeeded as u64);

        if no_fatal {
            Ok(())
        } else {
            Err(WriterError::write(
                failure.map(|e| e.message).unwrap_or_default(),
            ))
        }
    }

    fn heartbeat(
        &mut self,
        core: &mut BackendCore,
        network_time: f64,
        current_time: f64,
    ) -> Result<()> {
        self.writer.do_heartbeat(core, network_time, current_time)
    }

    fn finish(&mut self, core: &mut BackendCore, network_time: f64) -> Result<()> {
        self.writer.do_finish(core, network_time)
    }
}

#[cfg(test)]
#[path = "direct_test.rs"]
mod direct_test;
