//! Tests for the JSON formatter

use serde_json::json;

use vigil_record::{Field, TypeTag, Value};

use super::JsonFormatter;
use crate::format::{LogFormatter, TimeFormat};

fn render(formatter: &JsonFormatter, fields: &[Field], record: Vec<Value>) -> serde_json::Value {
    let mut out = String::new();
    formatter.format(fields, &record, &mut out).unwrap();
    serde_json::from_str(&out).unwrap()
}

#[test]
fn test_object_per_record() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![
        Field::new("id", TypeTag::String),
        Field::new("n", TypeTag::Count),
    ];
    let parsed = render(&formatter, &fields, vec![Value::string("abc"), Value::count(7)]);
    assert_eq!(parsed, json!({"id": "abc", "n": 7}));
}

#[test]
fn test_unset_fields_are_omitted() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![
        Field::new("id", TypeTag::String),
        Field::new("n", TypeTag::Count),
    ];
    let parsed = render(
        &formatter,
        &fields,
        vec![Value::string("abc"), Value::unset(TypeTag::Count)],
    );
    assert_eq!(parsed, json!({"id": "abc"}));
}

#[test]
fn test_epoch_timestamps() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![Field::new("ts", TypeTag::Time)];
    let parsed = render(&formatter, &fields, vec![Value::time(1000.5)]);
    assert_eq!(parsed, json!({"ts": 1000.5}));
}

#[test]
fn test_millis_timestamps() {
    let formatter = JsonFormatter::new(TimeFormat::Millis);
    let fields = vec![Field::new("ts", TypeTag::Time)];
    let parsed = render(&formatter, &fields, vec![Value::time(1000.5)]);
    assert_eq!(parsed, json!({"ts": 1000500}));
}

#[test]
fn test_iso8601_timestamps() {
    let formatter = JsonFormatter::new(TimeFormat::Iso8601);
    let fields = vec![Field::new("ts", TypeTag::Time)];
    let parsed = render(&formatter, &fields, vec![Value::time(0.0)]);
    assert_eq!(parsed, json!({"ts": "1970-01-01T00:00:00.000000Z"}));
}

#[test]
fn test_containers_become_arrays() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![Field::with_subtype("tags", TypeTag::Vector, TypeTag::String)];
    let parsed = render(
        &formatter,
        &fields,
        vec![Value::vector(vec![Value::string("a"), Value::string("b")])],
    );
    assert_eq!(parsed, json!({"tags": ["a", "b"]}));
}

#[test]
fn test_addr_renders_as_string() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![Field::new("ip", TypeTag::Addr)];
    let parsed = render(
        &formatter,
        &fields,
        vec![Value::addr("192.168.0.1".parse().unwrap())],
    );
    assert_eq!(parsed, json!({"ip": "192.168.0.1"}));
}

#[test]
fn test_interval_and_bool() {
    let formatter = JsonFormatter::new(TimeFormat::Epoch);
    let fields = vec![
        Field::new("d", TypeTag::Interval),
        Field::new("ok", TypeTag::Bool),
    ];
    let parsed = render(
        &formatter,
        &fields,
        vec![Value::interval(1.5), Value::bool(true)],
    );
    assert_eq!(parsed, json!({"d": 1.5, "ok": true}));
}
