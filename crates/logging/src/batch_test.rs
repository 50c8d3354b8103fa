//! Tests for the batching dispatch adapter

use tokio::sync::mpsc;

use vigil_record::{Field, LogRecord, TypeTag, Value, ValueData, WriterInfo};

use super::{BatchDispatch, MAX_DELAY_KEY, MAX_RECORDS_KEY};
use crate::backend::{test_core, BackendCore};
use crate::error::{Result, WriteErrorInfo};
use crate::message::{OutputMessage, WriterEvent, LOG_WRITE_ERROR};
use crate::plugin::{BatchWriter, Dispatch, WriterPlugin};

/// Batch writer that records every batch it is handed, as the string
/// content of each record's first cell
struct StubBatch {
    batches: Vec<Vec<String>>,
    errors_once: Vec<WriteErrorInfo>,
    finished: bool,
}

impl StubBatch {
    fn new() -> Self {
        Self {
            batches: Vec::new(),
            errors_once: Vec::new(),
            finished: false,
        }
    }

    fn with_errors(errors: Vec<WriteErrorInfo>) -> Self {
        Self {
            errors_once: errors,
            ..Self::new()
        }
    }
}

impl WriterPlugin for StubBatch {
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
        core.finished_rotation_aborted();
        Ok(())
    }

    fn do_finish(&mut self, _core: &mut BackendCore, _network_time: f64) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

impl BatchWriter for StubBatch {
    fn write_batch(
        &mut self,
        _core: &mut BackendCore,
        records: &[LogRecord],
    ) -> Vec<WriteErrorInfo> {
        let names = records
            .iter()
            .map(|r| match r[0].data() {
                Some(ValueData::String(s)) => s.clone(),
                other => panic!("unexpected cell: {:?}", other),
            })
            .collect();
        self.batches.push(names);
        std::mem::take(&mut self.errors_once)
    }
}

fn setup(
    writer: StubBatch,
    max_records: &str,
    max_delay_secs: &str,
) -> (
    BatchDispatch<StubBatch>,
    BackendCore,
    mpsc::UnboundedReceiver<OutputMessage>,
) {
    let fields = vec![Field::new("msg", TypeTag::String)];
    let mut info = WriterInfo::new("test");
    info.config.insert(MAX_RECORDS_KEY, max_records);
    info.config.insert(MAX_DELAY_KEY, max_delay_secs);

    let (core, rx) = test_core(
        info,
        &[BatchDispatch::<StubBatch>::default_config()],
        fields,
    );
    let dispatch = BatchDispatch::new(writer, &core).unwrap();
    (dispatch, core, rx)
}

fn records(names: &[&str]) -> Vec<LogRecord> {
    names.iter().map(|n| vec![Value::string(*n)]).collect()
}

fn write_error_events(rx: &mut mpsc::UnboundedReceiver<OutputMessage>) -> Vec<WriterEvent> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let OutputMessage::Event(event) = msg {
            assert_eq!(event.name, LOG_WRITE_ERROR);
            events.push(event);
        }
    }
    events
}

#[test]
fn test_no_flush_below_count_threshold() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "3", "0");

    dispatch
        .write_logs(&mut core, records(&["a", "b"]), 0.0)
        .unwrap();

    assert!(dispatch.plugin_mut().batches.is_empty());
    assert_eq!(dispatch.cached(), 2);
}

#[test]
fn test_flush_by_count() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "3", "0");

    dispatch
        .write_logs(&mut core, records(&["a", "b"]), 0.0)
        .unwrap();
    dispatch.write_logs(&mut core, records(&["c"]), 0.1).unwrap();

    assert_eq!(dispatch.plugin_mut().batches, vec![vec!["a", "b", "c"]]);
    assert_eq!(dispatch.cached(), 0);
}

#[test]
fn test_flush_by_age_on_heartbeat() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "0", "1");

    dispatch.write_logs(&mut core, records(&["a"]), 0.0).unwrap();
    assert!(dispatch.plugin_mut().batches.is_empty());

    // Not old enough yet.
    dispatch.heartbeat(&mut core, 0.5, 0.5).unwrap();
    assert!(dispatch.plugin_mut().batches.is_empty());

    // Crossed the age threshold.
    dispatch.heartbeat(&mut core, 1.1, 1.1).unwrap();
    assert_eq!(dispatch.plugin_mut().batches, vec![vec!["a"]]);
    assert_eq!(dispatch.cached(), 0);
}

#[test]
fn test_unbounded_cache_flushes_only_on_finish() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "0", "0");

    for i in 0..10 {
        let record = vec![Value::string(format!("r{i}"))];
        dispatch.write_logs(&mut core, vec![record], i as f64).unwrap();
    }
    dispatch.heartbeat(&mut core, 100.0, 100.0).unwrap();
    assert!(dispatch.plugin_mut().batches.is_empty());

    dispatch.finish(&mut core, 100.0).unwrap();
    assert_eq!(dispatch.plugin_mut().batches.len(), 1);
    assert_eq!(dispatch.plugin_mut().batches[0].len(), 10);
    assert!(dispatch.plugin_mut().finished);
}

#[test]
fn test_order_preserved_across_writes() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "4", "0");

    dispatch.write_logs(&mut core, records(&["a"]), 0.0).unwrap();
    dispatch
        .write_logs(&mut core, records(&["b", "c"]), 0.1)
        .unwrap();
    dispatch.write_logs(&mut core, records(&["d"]), 0.2).unwrap();

    assert_eq!(
        dispatch.plugin_mut().batches,
        vec![vec!["a", "b", "c", "d"]]
    );
}

#[test]
fn test_fatal_error_emits_both_ranges_and_fails() {
    let errors = vec![WriteErrorInfo::new(1, 1, "disk full", true)];
    let (mut dispatch, mut core, mut rx) = setup(StubBatch::with_errors(errors), "3", "0");

    let result = dispatch.write_logs(&mut core, records(&["a", "b", "c"]), 0.0);
    assert!(result.is_err());

    let events = write_error_events(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].values[0], Value::string("disk full"));
    assert_eq!(events[0].values[1], Value::bool(true));
    assert_eq!(events[0].values[2], Value::count(1));
    assert_eq!(
        events[1].values[0],
        Value::string("Not written due to previous error")
    );
    assert_eq!(events[1].values[1], Value::bool(false));
    assert_eq!(events[1].values[2], Value::count(1));

    // The cache is dropped whatever the outcome.
    assert_eq!(dispatch.cached(), 0);
}

#[test]
fn test_non_fatal_error_keeps_writer_alive() {
    let errors = vec![WriteErrorInfo::new(0, 1, "bad record", false)];
    let (mut dispatch, mut core, mut rx) = setup(StubBatch::with_errors(errors), "2", "0");

    dispatch
        .write_logs(&mut core, records(&["a", "b"]), 0.0)
        .unwrap();

    let events = write_error_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].values[1], Value::bool(false));
}

#[test]
fn test_trailing_range_not_duplicated() {
    // The writer already reported the remainder itself.
    let errors = vec![
        WriteErrorInfo::new(0, 1, "disk full", true),
        WriteErrorInfo::new(1, 2, "Not written due to previous error", false),
    ];
    let (mut dispatch, mut core, mut rx) = setup(StubBatch::with_errors(errors), "3", "0");

    let _ = dispatch.write_logs(&mut core, records(&["a", "b", "c"]), 0.0);

    let events = write_error_events(&mut rx);
    assert_eq!(events.len(), 2);
}

#[test]
fn test_cache_empty_or_criterion_false_after_dispatch() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "3", "0");

    dispatch
        .write_logs(&mut core, records(&["a", "b"]), 0.0)
        .unwrap();

    // Criterion must be false for whatever remains cached.
    assert!(dispatch.cached() < 3);
}

#[test]
fn test_flush_reports_statistics() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "2", "0");

    dispatch
        .write_logs(&mut core, records(&["a", "b"]), 0.0)
        .unwrap();

    let stats = core.stats();
    assert_eq!(stats.write_attempts, 2);
    assert_eq!(stats.writes_succeeded, 2);
}

#[test]
fn test_invalid_batch_config_is_rejected() {
    let fields = vec![Field::new("msg", TypeTag::String)];
    let mut info = WriterInfo::new("test");
    info.config.insert(MAX_RECORDS_KEY, "many");

    let (core, _rx) = test_core(
        info,
        &[BatchDispatch::<StubBatch>::default_config()],
        fields,
    );
    assert!(BatchDispatch::new(StubBatch::new(), &core).is_err());
}

#[test]
fn test_negative_delay_clamps_to_zero() {
    let (mut dispatch, mut core, _rx) = setup(StubBatch::new(), "0", "-5");

    dispatch.write_logs(&mut core, records(&["a"]), 0.0).unwrap();
    dispatch.heartbeat(&mut core, 1000.0, 1000.0).unwrap();

    // Age criterion disabled: nothing flushes.
    assert!(dispatch.plugin_mut().batches.is_empty());
}

#[test]
fn test_default_config_layers() {
    let defaults = BatchDispatch::<StubBatch>::default_config();
    assert_eq!(defaults.get(MAX_RECORDS_KEY), Some("0"));
    assert_eq!(defaults.get(MAX_DELAY_KEY), Some("1"));
}
