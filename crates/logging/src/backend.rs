//! Base writer backend
//!
//! A [`WriterBackend`] owns one writer task: it drains its input queue in
//! FIFO order, validates incoming records against the schema installed at
//! init, hands them to its dispatch adapter, and drives the rotation,
//! flush, heartbeat and termination protocols. Everything a concrete
//! writer needs from the framework - schema access, config resolution,
//! rotation completion, event emission - is reachable through the
//! [`BackendCore`] passed into its hooks.
//!
//! # Lifecycle
//!
//! ```text
//!                  init ok                    finish
//! [Constructed] -----------> [Running] ----------------> [Finished]
//!       |  init fail             |  any fatal                ^
//!       +------------------------+--------> [Disabled] ------+
//!                                  (stays on task, drains mail)
//! ```
//!
//! A disabled backend keeps draining its queue so records already in
//! flight are dropped rather than stranded.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use vigil_record::{ConfigMap, Field, LogRecord, WriterInfo};

use crate::batch::BatchDispatch;
use crate::config::{
    base_defaults, clamp_statistics_interval, compose_defaults, parse_f64, resolve,
    STATISTICS_INTERVAL_KEY,
};
use crate::direct::DirectDispatch;
use crate::error::{Result, WriteErrorInfo, WriterError, NOT_WRITTEN_DESCRIPTION};
use crate::message::{InputMessage, OutputMessage, WriterEvent};
use crate::plugin::{BatchWriter, Dispatch, PushWriter, WriterPlugin};
use crate::stats::WriteStats;

/// Wall clock in seconds since the epoch
pub(crate) fn wallclock() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// Derive the backend name from a writer's descriptive name
///
/// `conn/Log::WRITER_ASCII` becomes `ascii`; a name without the writer
/// enum marker is used lowercased as-is.
fn derive_backend_name(name: &str) -> String {
    const MARKER: &str = "log::writer_";
    let lowered = name.to_ascii_lowercase();
    match lowered.rfind(MARKER) {
        Some(pos) => lowered[pos + MARKER.len()..].to_string(),
        None => lowered,
    }
}

/// Framework services shared with dispatch adapters and writer plugins
///
/// Lives on the writer task; none of these methods block on the main
/// thread. Output messages are posted asynchronously.
pub struct BackendCore {
    /// Descriptive writer name, e.g. `conn/Log::WRITER_ASCII`
    name: String,

    /// Short backend name used for prefixed config keys, e.g. `ascii`
    backend_name: String,

    /// Writer metadata as passed at creation
    info: WriterInfo,

    /// Schema installed at init
    fields: Vec<Field>,

    /// Current buffering state (on by default)
    buffering: bool,

    /// Tracks finished_rotation calls during do_rotate
    rotation_counter: i32,

    /// Composed built-in defaults for config resolution
    defaults: ConfigMap,

    /// Running write statistics
    stats: WriteStats,

    /// Seconds between statistics events
    stats_interval: f64,

    /// Next wall-clock instant a statistics event is due
    next_stats_time: f64,

    /// Output queue to the main thread
    output: mpsc::UnboundedSender<OutputMessage>,
}

impl BackendCore {
    fn new(name: String, info: WriterInfo, output: mpsc::UnboundedSender<OutputMessage>) -> Self {
        let backend_name = derive_backend_name(&name);
        Self {
            name,
            backend_name,
            info,
            fields: Vec::new(),
            buffering: true,
            rotation_counter: 0,
            defaults: ConfigMap::new(),
            stats: WriteStats::new(),
            stats_interval: 0.0,
            next_stats_time: 0.0,
            output,
        }
    }

    /// Install the composed defaults and read the base-layer config
    fn install_defaults(&mut self, defaults: ConfigMap) -> Result<()> {
        self.defaults = defaults;
        let raw = self.config_value(STATISTICS_INTERVAL_KEY);
        self.stats_interval = clamp_statistics_interval(parse_f64(STATISTICS_INTERVAL_KEY, &raw)?);
        Ok(())
    }

    pub(crate) fn init(&mut self, fields: Vec<Field>) {
        self.fields = fields;
    }

    /// Descriptive writer name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short backend name, e.g. `ascii`
    #[inline]
    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    /// `<path>:<backend>` identification for log lines
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.info.path, self.backend_name)
    }

    /// Writer metadata
    #[inline]
    pub fn info(&self) -> &WriterInfo {
        &self.info
    }

    /// Schema installed at init
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Number of schema fields
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Current buffering state
    #[inline]
    pub fn is_buf(&self) -> bool {
        self.buffering
    }

    /// Running statistics
    #[inline]
    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Resolve a configuration string
    ///
    /// Precedence: composed defaults, then the unprefixed writer-config
    /// entry, then the `<backend-name>:key` entry. Panics when `key` has
    /// no registered default.
    pub fn config_value(&self, key: &str) -> String {
        resolve(&self.defaults, &self.info.config, &self.backend_name, key)
    }

    /// Post an event to the analysis engine
    pub fn send_event(&mut self, event: WriterEvent) {
        self.send(OutputMessage::Event(event));
    }

    /// Ask the frontend to stop forwarding operations
    pub fn disable_frontend(&mut self) {
        self.send(OutputMessage::Disable);
    }

    /// Record a write attempt's outcome for later statistics emission
    pub fn report_write_statistics(&mut self, attempted: u64, succeeded: u64) {
        self.stats.record_attempt(attempted, succeeded);
    }

    /// Signal a finished rotation with an artifact for post-processing
    ///
    /// Exactly one of the two completion forms must be called from within
    /// `do_rotate`.
    pub fn finished_rotation(
        &mut self,
        new_name: impl Into<String>,
        old_name: impl Into<String>,
        open: f64,
        close: f64,
        terminating: bool,
    ) {
        self.rotation_counter -= 1;
        self.send(OutputMessage::RotationFinished {
            new_name: Some(new_name.into()),
            old_name: Some(old_name.into()),
            open,
            close,
            success: true,
            terminating,
        });
    }

    /// Signal a processed rotation with nothing to post-process
    pub fn finished_rotation_aborted(&mut self) {
        self.rotation_counter -= 1;
        self.send(OutputMessage::RotationFinished {
            new_name: None,
            old_name: None,
            open: 0.0,
            close: 0.0,
            success: false,
            terminating: false,
        });
    }

    /// Emit `Log::write_error` events for the reported ranges
    ///
    /// Returns true when none of the ranges was fatal.
    pub fn handle_write_errors(&mut self, errors: &[WriteErrorInfo]) -> bool {
        let mut has_fatal = false;
        for err in errors {
            self.send_event(WriterEvent::write_error(
                err.description.as_str(),
                err.is_fatal,
                err.record_count as u64,
            ));
            has_fatal |= err.is_fatal;
        }
        !has_fatal
    }

    /// Report a stopped record-at-a-time write
    ///
    /// Fabricates the failing-record range and, when records remain, the
    /// trailing "not written" range. Returns true when the failure was
    /// survivable.
    pub fn handle_write_failure(
        &mut self,
        error_index: usize,
        total: usize,
        description: &str,
        is_fatal: bool,
    ) -> bool {
        if total == 0 {
            return true;
        }

        let mut errors = vec![WriteErrorInfo::new(error_index, 1, description, is_fatal)];
        let next = error_index + 1;
        if next < total {
            errors.push(WriteErrorInfo::new(
                next,
                total - next,
                NOT_WRITTEN_DESCRIPTION,
                false,
            ));
        }
        self.handle_write_errors(&errors)
    }

    fn record_received(&mut self, count: u64) {
        self.stats.record_received(count);
    }

    fn request_flush_write_buffer(&mut self) {
        self.send(OutputMessage::FlushWriteBuffer);
    }

    /// Emit a statistics event when the schedule says one is due
    fn maybe_send_statistics(&mut self, current_time: f64) {
        if current_time < self.next_stats_time {
            return;
        }
        let stats = self.stats;
        self.send_event(WriterEvent::statistics(
            stats.records_received,
            stats.write_attempts,
            stats.writes_succeeded,
        ));
        self.next_stats_time = current_time + self.stats_interval;
    }

    fn begin_rotation(&mut self) {
        self.rotation_counter = 1;
    }

    fn send(&mut self, msg: OutputMessage) {
        // The receiver only disappears at shutdown; drop silently then.
        let _ = self.output.send(msg);
    }
}

/// Backend lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendState {
    Constructed,
    Running,
    Disabled,
    Finished,
}

/// A writer backend bound to its input queue
///
/// Construct with [`WriterBackend::direct`] or [`WriterBackend::batched`]
/// and drive it with [`WriterBackend::run`] on a dedicated task.
pub struct WriterBackend<D: Dispatch> {
    core: BackendCore,
    dispatch: D,
    input: mpsc::UnboundedReceiver<InputMessage>,
    state: BackendState,
}

impl<W: PushWriter> WriterBackend<DirectDispatch<W>> {
    /// Create a backend driving a record-at-a-time writer
    pub fn direct(
        name: impl Into<String>,
        info: WriterInfo,
        writer: W,
        input: mpsc::UnboundedReceiver<InputMessage>,
        output: mpsc::UnboundedSender<OutputMessage>,
    ) -> Result<Self> {
        let mut core = BackendCore::new(name.into(), info, output);
        let defaults = compose_defaults(&[
            writer.default_config(),
            DirectDispatch::<W>::default_config(),
            base_defaults(),
        ]);
        core.install_defaults(defaults)?;

        Ok(Self {
            core,
            dispatch: DirectDispatch::new(writer),
            input,
            state: BackendState::Constructed,
        })
    }
}

impl<W: BatchWriter> WriterBackend<BatchDispatch<W>> {
    /// Create a backend driving a batching writer
    pub fn batched(
        name: impl Into<String>,
        info: WriterInfo,
        writer: W,
        input: mpsc::UnboundedReceiver<InputMessage>,
        output: mpsc::UnboundedSender<OutputMessage>,
    ) -> Result<Self> {
        let mut core = BackendCore::new(name.into(), info, output);
        let defaults = compose_defaults(&[
            writer.default_config(),
            BatchDispatch::<W>::default_config(),
            base_defaults(),
        ]);
        core.install_defaults(defaults)?;
        let dispatch = BatchDispatch::new(writer, &core)?;

        Ok(Self {
            core,
            dispatch,
            input,
            state: BackendState::Constructed,
        })
    }
}

impl<D: Dispatch> WriterBackend<D> {
    /// Process input messages until the terminator arrives or the channel
    /// closes, then return the final statistics
    pub async fn run(mut self) -> WriteStats {
        tracing::info!(writer = %self.core.full_name(), "writer backend starting");

        while let Some(msg) = self.input.recv().await {
            if !self.handle(msg) {
                break;
            }
        }

        let stats = self.core.stats();
        tracing::info!(
            writer = %self.core.full_name(),
            received = stats.records_received,
            attempts = stats.write_attempts,
            succeeded = stats.writes_succeeded,
            "writer backend shutting down"
        );
        stats
    }

    /// Handle one message; returns false when the task should exit
    fn handle(&mut self, msg: InputMessage) -> bool {
        match msg {
            InputMessage::Init { fields } => self.handle_init(fields),
            InputMessage::Write {
                num_fields,
                records,
            } => self.handle_write(num_fields, records),
            InputMessage::SetBuf { enabled } => self.handle_set_buf(enabled),
            InputMessage::Flush { network_time } => self.handle_flush(network_time),
            InputMessage::Rotate {
                rotated_path,
                open,
                close,
                terminating,
            } => self.handle_rotate(&rotated_path, open, close, terminating),
            InputMessage::Heartbeat {
                network_time,
                current_time,
            } => self.handle_heartbeat(network_time, current_time),
            InputMessage::Finish { network_time } => {
                self.handle_finish(network_time);
                return false;
            }
        }
        true
    }

    fn handle_init(&mut self, fields: Vec<Field>) {
        if self.state != BackendState::Constructed {
            tracing::warn!(writer = %self.core.full_name(), "duplicate init message ignored");
            return;
        }

        self.core.init(fields);
        match self.dispatch.plugin_mut().do_init(&mut self.core) {
            Ok(()) => self.state = BackendState::Running,
            Err(err) => self.fatal(&err),
        }
    }

    fn handle_write(&mut self, num_fields: usize, records: Vec<LogRecord>) {
        if self.state != BackendState::Running {
            // Dropped here so queued records never leak past a failure.
            return;
        }

        self.core.record_received(records.len() as u64);

        if num_fields != self.core.num_fields() {
            self.schema_violation(format!(
                "number of fields doesn't match ({} vs. {})",
                num_fields,
                self.core.num_fields()
            ));
            return;
        }

        for record in &records {
            if record.len() != num_fields {
                self.schema_violation(format!(
                    "record has {} cells, schema has {}",
                    record.len(),
                    num_fields
                ));
                return;
            }
            for (idx, (value, field)) in record.iter().zip(self.core.fields()).enumerate() {
                if !value.matches(field) {
                    self.schema_violation(format!(
                        "field #{} type doesn't match ({} vs. {})",
                        idx,
                        value.tag(),
                        field.tag
                    ));
                    return;
                }
            }
        }

        let now = wallclock();
        if let Err(err) = self.dispatch.write_logs(&mut self.core, records, now) {
            self.fatal(&err);
        }
    }

    fn handle_set_buf(&mut self, enabled: bool) {
        if self.state != BackendState::Running || enabled == self.core.is_buf() {
            return;
        }

        self.core.buffering = enabled;
        if let Err(err) = self.dispatch.plugin_mut().do_set_buf(&mut self.core, enabled) {
            self.fatal(&err);
        }
    }

    fn handle_flush(&mut self, network_time: f64) {
        if self.state != BackendState::Running {
            return;
        }

        if let Err(err) = self.dispatch.plugin_mut().do_flush(&mut self.core, network_time) {
            self.fatal(&err);
        }
    }

    fn handle_rotate(&mut self, rotated_path: &str, open: f64, close: f64, terminating: bool) {
        if self.state != BackendState::Running {
            return;
        }

        self.core.begin_rotation();
        match self
            .dispatch
            .plugin_mut()
            .do_rotate(&mut self.core, rotated_path, open, close, terminating)
        {
            Err(err) => self.fatal(&err),
            Ok(()) => {
                if self.core.rotation_counter > 0 {
                    tracing::error!(
                        writer = %self.core.full_name(),
                        "writer did not call finished_rotation() in do_rotate()"
                    );
                } else if self.core.rotation_counter < 0 {
                    tracing::error!(
                        writer = %self.core.full_name(),
                        "writer called finished_rotation() more than once in do_rotate()"
                    );
                }
            }
        }
    }

    fn handle_heartbeat(&mut self, network_time: f64, current_time: f64) {
        if self.state != BackendState::Running {
            return;
        }

        self.core.request_flush_write_buffer();
        self.core.maybe_send_statistics(current_time);

        if let Err(err) = self.dispatch.heartbeat(&mut self.core, network_time, current_time) {
            self.fatal(&err);
        }
    }

    fn handle_finish(&mut self, network_time: f64) {
        if self.state == BackendState::Running {
            if let Err(err) = self.dispatch.finish(&mut self.core, network_time) {
                self.fatal(&err);
            }
        }
        self.state = BackendState::Finished;
    }

    fn schema_violation(&mut self, detail: String) {
        let err = WriterError::SchemaViolation(detail);
        self.fatal(&err);
    }

    fn fatal(&mut self, err: &WriterError) {
        tracing::error!(writer = %self.core.full_name(), error = %err, "writer disabled");
        self.core.disable_frontend();
        self.state = BackendState::Disabled;
    }
}

#[cfg(test)]
pub(crate) fn test_core(
    info: WriterInfo,
    layers: &[ConfigMap],
    fields: Vec<Field>,
) -> (BackendCore, mpsc::UnboundedReceiver<OutputMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut core = BackendCore::new("test/Log::WRITER_TEST".to_string(), info, tx);
    let mut all = layers.to_vec();
    all.push(base_defaults());
    core.install_defaults(compose_defaults(&all))
        .expect("test defaults install");
    core.init(fields);
    (core, rx)
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod backend_test;
