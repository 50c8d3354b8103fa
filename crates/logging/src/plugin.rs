//! Writer plugin traits
//!
//! Concrete writers plug into the framework through a base lifecycle trait
//! plus exactly one of two write contracts:
//!
//! - [`PushWriter`]: a record-at-a-time hook, driven in a loop by the
//!   direct dispatch adapter. Right for sinks that can write each record
//!   independently (text logs, line-delimited JSON).
//! - [`BatchWriter`]: a whole-batch hook, driven by the batch dispatch
//!   adapter which caches records and flushes on size or age thresholds.
//!
//! All hooks run on the writer task and get the [`BackendCore`] for
//! services (schema access, config resolution, rotation completion, event
//! emission).

use vigil_record::{ConfigMap, Field, LogRecord};

use crate::backend::BackendCore;
use crate::error::{Result, WriteError, WriteErrorInfo};

/// Lifecycle hooks every writer implements
///
/// A hook returning an error is treated as fatal: the backend disables its
/// frontend and becomes terminal.
pub trait WriterPlugin: Send + 'static {
    /// Defaults for config keys this writer introduces
    ///
    /// Composed leaf-first with the adapter and base layers; a writer's
    /// entry wins over a parent's on collision.
    fn default_config(&self) -> ConfigMap {
        ConfigMap::new()
    }

    /// One-time initialization; the schema and writer-info are available
    /// through `core`
    fn do_init(&mut self, core: &mut BackendCore) -> Result<()>;

    /// Buffering state changed; default ignores the call
    fn do_set_buf(&mut self, _core: &mut BackendCore, _enabled: bool) -> Result<()> {
        Ok(())
    }

    /// Flush buffered output
    fn do_flush(&mut self, core: &mut BackendCore, network_time: f64) -> Result<()>;

    /// Rotate the output artifact
    ///
    /// Implementations must call exactly one of
    /// [`BackendCore::finished_rotation`] or
    /// [`BackendCore::finished_rotation_aborted`] before returning.
    fn do_rotate(
        &mut self,
        core: &mut BackendCore,
        rotated_path: &str,
        open: f64,
        close: f64,
        terminating: bool,
    ) -> Result<()>;

    /// Final call before the writer task exits
    fn do_finish(&mut self, core: &mut BackendCore, network_time: f64) -> Result<()>;

    /// Periodic tick; default does nothing
    fn do_heartbeat(
        &mut self,
        _core: &mut BackendCore,
        _network_time: f64,
        _current_time: f64,
    ) -> Result<()> {
        Ok(())
    }
}

/// Record-at-a-time write contract
pub trait PushWriter: WriterPlugin {
    /// Write one record
    ///
    /// A returned error stops the current bulk write; its fatality flag
    /// decides whether the writer survives.
    fn write_record(&mut self, fields: &[Field], record: &LogRecord)
        -> std::result::Result<(), WriteError>;
}

/// Whole-batch write contract
pub trait BatchWriter: WriterPlugin {
    /// Write a batch of records, in production order
    ///
    /// Returns one [`WriteErrorInfo`] per failed range; an empty vector
    /// means every record was written.
    fn write_batch(&mut self, core: &mut BackendCore, records: &[LogRecord]) -> Vec<WriteErrorInfo>;
}

/// Dispatch adapter between the base backend and a write contract
///
/// The two implementations ([`crate::direct::DirectDispatch`] and
/// [`crate::batch::BatchDispatch`]) specialize how bulk writes reach the
/// plugin; everything else delegates through `plugin_mut`.
pub trait Dispatch: Send + 'static {
    /// The wrapped writer type
    type Plugin: WriterPlugin;

    /// Access the wrapped writer for lifecycle delegation
    fn plugin_mut(&mut self) -> &mut Self::Plugin;

    /// Defaults contributed by this adapter layer
    fn default_config() -> ConfigMap;

    /// Consume a bulk write; the adapter owns the records from here on
    ///
    /// `now` is the wall clock in seconds, used by the batch adapter's
    /// age criterion.
    fn write_logs(
        &mut self,
        core: &mut BackendCore,
        records: Vec<LogRecord>,
        now: f64,
    ) -> Result<()>;

    /// Adapter part of the heartbeat, then the plugin's hook
    fn heartbeat(&mut self, core: &mut BackendCore, network_time: f64, current_time: f64)
        -> Result<()>;

    /// Adapter part of termination, then the plugin's hook
    fn finish(&mut self, core: &mut BackendCore, network_time: f64) -> Result<()>;
}
