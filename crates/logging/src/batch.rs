//! Batching dispatch adapter
//!
//! Drives a [`BatchWriter`] by caching incoming records and flushing the
//! whole cache at once when a size or age threshold is met. Records reach
//! `write_batch` in the exact order the main thread produced them.
//!
//! # Flush criterion
//!
//! A flush happens when forced (termination), when the cache has at least
//! `batch:max_records` records (0 disables the size criterion), or when
//! the first cached record is older than `batch:max_delay_secs` seconds
//! (0 disables the age criterion). Heartbeats evaluate the age criterion
//! opportunistically.
//!
//! # Cache invariants
//!
//! A non-empty cache always has the enqueue timestamp of its first record;
//! emptying the cache clears it. After a flush completes the cache is
//! empty, so its size never exceeds the threshold across flushes.

use vigil_record::{ConfigMap, LogRecord};

use crate::backend::{wallclock, BackendCore};
use crate::error::{Result, WriteErrorInfo, WriterError, NOT_WRITTEN_DESCRIPTION};
use crate::plugin::{BatchWriter, Dispatch, WriterPlugin};

/// Maximum cached records before a flush; `"0"` means unbounded
pub const MAX_RECORDS_KEY: &str = "batch:max_records";

/// Maximum age of the oldest cached record before a flush, seconds
pub const MAX_DELAY_KEY: &str = "batch:max_delay_secs";

/// Dispatch adapter for the whole-batch contract
pub struct BatchDispatch<W: BatchWriter> {
    writer: W,

    /// Size threshold; 0 disables
    max_records: usize,

    /// Age threshold in seconds; 0 disables
    max_delay_secs: f64,

    /// Records waiting for the next flush, in arrival order
    cache: Vec<LogRecord>,

    /// Wall-clock time the first cached record was enqueued
    first_cached_at: Option<f64>,
}

impl<W: BatchWriter> BatchDispatch<W> {
    pub(crate) fn new(writer: W, core: &BackendCore) -> Result<Self> {
        let raw = core.config_value(MAX_RECORDS_KEY);
        let max_records = crate::config::parse_usize(MAX_RECORDS_KEY, &raw)?;

        let raw = core.config_value(MAX_DELAY_KEY);
        let max_delay_secs = crate::config::parse_f64(MAX_DELAY_KEY, &raw)?.max(0.0);

        Ok(Self {
            writer,
            max_records,
            max_delay_secs,
            cache: Vec::new(),
            first_cached_at: None,
        })
    }

    /// Number of records currently cached
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Flush the cache if the batch criterion is met
    ///
    /// `now` is the wall clock used for the age criterion. On a flush the
    /// writer's reported error ranges become `Log::write_error` events and
    /// every cached record is dropped, whatever the outcome.
    fn write_batch_if_needed(&mut self, core: &mut BackendCore, now: f64, force: bool) -> Result<()> {
        if self.cache.is_empty() {
            return Ok(());
        }

        let mut write_batch = force;
        if !write_batch && self.max_records > 0 {
            write_batch = self.cache.len() >= self.max_records;
        }
        if !write_batch && self.max_delay_secs > 0.0 {
            if let Some(first) = self.first_cached_at {
                write_batch = now - first >= self.max_delay_secs;
            }
        }
        if !write_batch {
            return Ok(());
        }

        let total = self.cache.len();
        let mut errors = self.writer.write_batch(core, &self.cache);

        // A fatal range discards the rest of the batch; report the
        // remainder unless the writer already did.
        if let Some(fatal) = errors.iter().find(|e| e.is_fatal) {
            let next = fatal.first_record_index + fatal.record_count;
            let reported = errors.iter().any(|e| e.first_record_index >= next);
            if next < total && !reported {
                errors.push(WriteErrorInfo::new(
                    next,
                    total - next,
                    NOT_WRITTEN_DESCRIPTION,
                    false,
                ));
            }
        }

        let no_fatal = core.handle_write_errors(&errors);

        let attempted = total as u64;
        let failed: u64 = errors.iter().map(|e| e.record_count as u64).sum();
        core.report_write_statistics(attempted, attempted.saturating_sub(failed));

        self.cache.clear();
        self.first_cached_at = None;

        if no_fatal {
            Ok(())
        } else {
            Err(WriterError::write("fatal error writing batch"))
        }
    }
}

impl<W: BatchWriter> Dispatch for BatchDispatch<W> {
    type Plugin = W;

    fn plugin_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    fn default_config() -> ConfigMap {
        ConfigMap::from([
            (MAX_RECORDS_KEY, "0"), // Indefinite
            (MAX_DELAY_KEY, "1"),
        ])
    }

    fn write_logs(
        &mut self,
        core: &mut BackendCore,
        records: Vec<LogRecord>,
        now: f64,
    ) -> Result<()> {
        if !records.is_empty() {
            if self.cache.is_empty() {
                self.first_cached_at = Some(now);
            }
            self.cache.extend(records);
        }

        self.write_batch_if_needed(core, now, false)
    }

    fn heartbeat(
        &mut self,
        core: &mut BackendCore,
        network_time: f64,
        current_time: f64,
    ) -> Result<()> {
        self.write_batch_if_needed(core, current_time, false)?;
        self.writer.do_heartbeat(core, network_time, current_time)
    }

    fn finish(&mut self, core: &mut BackendCore, network_time: f64) -> Result<()> {
        self.write_batch_if_needed(core, wallclock(), true)?;
        self.writer.do_finish(core, network_time)
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod batch_test;
