//! Tests for the record-at-a-time dispatch adapter

use tokio::sync::mpsc;

use vigil_record::{Field, LogRecord, TypeTag, Value, ValueData, WriterInfo};

use super::DirectDispatch;
use crate::backend::{test_core, BackendCore};
use crate::error::{Result, WriteError};
use crate::message::{OutputMessage, WriterEvent, LOG_WRITE_ERROR};
use crate::plugin::{Dispatch, PushWriter, WriterPlugin};

/// Push writer that records what it was asked to write and can be told
/// to fail at a given record index
struct StubPush {
    written: Vec<String>,
    fail_at: Option<usize>,
    fatal: bool,
    calls: usize,
}

impl StubPush {
    fn new() -> Self {
        Self {
            written: Vec::new(),
            fail_at: None,
            fatal: false,
            calls: 0,
        }
    }

    fn failing_at(index: usize, fatal: bool) -> Self {
        Self {
            fail_at: Some(index),
            fatal,
            ..Self::new()
        }
    }
}

impl WriterPlugin for StubPush {
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
        Ok(())
    }
}

impl PushWriter for StubPush {
    fn write_record(
        &mut self,
        _fields: &[Field],
        record: &LogRecord,
    ) -> std::result::Result<(), WriteError> {
        let index = self.calls;
        self.calls += 1;

        if self.fail_at == Some(index) {
            return if self.fatal {
                Err(WriteError::fatal("disk full"))
            } else {
                Err(WriteError::non_fatal("bad record"))
            };
        }

        if let Some(ValueData::String(s)) = record[0].data() {
            self.written.push(s.clone());
        }
        Ok(())
    }
}

fn setup(
    writer: StubPush,
) -> (
    DirectDispatch<StubPush>,
    crate::backend::BackendCore,
    mpsc::UnboundedReceiver<OutputMessage>,
) {
    let fields = vec![Field::new("msg", TypeTag::String)];
    let (core, rx) = test_core(WriterInfo::new("test"), &[], fields);
    (DirectDispatch::new(writer), core, rx)
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
fn test_writes_all_records_in_order() {
    let (mut dispatch, mut core, mut rx) = setup(StubPush::new());

    dispatch
        .write_logs(&mut core, records(&["a", "b", "c"]), 0.0)
        .unwrap();

    assert_eq!(dispatch.plugin_mut().written, vec!["a", "b", "c"]);
    assert!(write_error_events(&mut rx).is_empty());

    let stats = core.stats();
    assert_eq!(stats.write_attempts, 3);
    assert_eq!(stats.writes_succeeded, 3);
}

#[test]
fn test_stops_at_first_failure() {
    let (mut dispatch, mut core, mut rx) = setup(StubPush::failing_at(1, false));

    dispatch
        .write_logs(&mut core, records(&["a", "b", "c", "d"]), 0.0)
        .unwrap();

    // Only the record before the failure was written.
    assert_eq!(dispatch.plugin_mut().written, vec!["a"]);

    let events = write_error_events(&mut rx);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].values[0], Value::string("bad record"));
    assert_eq!(events[0].values[1], Value::bool(false));
    assert_eq!(events[0].values[2], Value::count(1));
    assert_eq!(
        events[1].values[0],
        Value::string("Not written due to previous error")
    );
    assert_eq!(events[1].values[2], Value::count(2));

    let stats = core.stats();
    assert_eq!(stats.write_attempts, 4);
    assert_eq!(stats.writes_succeeded, 1);
}

#[test]
fn test_fatal_failure_returns_error() {
    let (mut dispatch, mut core, mut rx) = setup(StubPush::failing_at(0, true));

    let result = dispatch.write_logs(&mut core, records(&["a", "b"]), 0.0);
    assert!(result.is_err());

    let events = write_error_events(&mut rx);
    assert_eq!(events[0].values[0], Value::string("disk full"));
    assert_eq!(events[0].values[1], Value::bool(true));
}

#[test]
fn test_failure_on_last_record_has_no_trailing_range() {
    let (mut dispatch, mut core, mut rx) = setup(StubPush::failing_at(2, false));

    dispatch
        .write_logs(&mut core, records(&["a", "b", "c"]), 0.0)
        .unwrap();

    let events = write_error_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].values[2], Value::count(1));
}

#[test]
fn test_empty_write_is_a_no_op() {
    let (mut dispatch, mut core, mut rx) = setup(StubPush::new());

    dispatch.write_logs(&mut core, Vec::new(), 0.0).unwrap();

    assert!(write_error_events(&mut rx).is_empty());
    assert_eq!(core.stats().write_attempts, 0);
}
