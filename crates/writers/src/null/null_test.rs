//! Tests for the null writer

use vigil_logging::PushWriter;
use vigil_record::{Field, TypeTag, Value};

use super::NullWriter;

#[test]
fn test_discards_and_counts() {
    let mut writer = NullWriter::new();
    let fields = vec![Field::new("msg", TypeTag::String)];

    for i in 0..5 {
        writer
            .write_record(&fields, &vec![Value::string(format!("r{i}"))])
            .unwrap();
    }

    assert_eq!(writer.records_discarded(), 5);
}

#[test]
fn test_starts_at_zero() {
    let writer = NullWriter::new();
    assert_eq!(writer.records_discarded(), 0);
}
