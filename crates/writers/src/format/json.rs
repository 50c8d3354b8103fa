//! JSON-lines formatter
//!
//! Renders each record as one JSON object keyed by field name. Unset
//! cells are omitted entirely rather than serialized as null, and time
//! cells follow the configured [`TimeFormat`].

use chrono::{TimeZone, Utc};
use serde_json::{Map, Number, Value as Json};

use vigil_record::{Field, LogRecord, Value, ValueData};

use super::{FormatError, LogFormatter, TimeFormat};

/// Formatter for JSON-lines output
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    timestamps: TimeFormat,
}

impl JsonFormatter {
    /// Create a formatter with the given time rendering
    pub fn new(timestamps: TimeFormat) -> Self {
        Self { timestamps }
    }

    fn time_to_json(&self, secs: f64) -> Json {
        match self.timestamps {
            TimeFormat::Epoch => json_f64(secs),
            TimeFormat::Millis => Json::Number(Number::from((secs * 1000.0) as i64)),
            TimeFormat::Iso8601 => {
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                let rendered = Utc
                    .timestamp_opt(whole as i64, nanos)
                    .single()
                    .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
                    .unwrap_or_else(|| format!("{secs}"));
                Json::String(rendered)
            }
        }
    }

    fn value_to_json(&self, value: &Value) -> Json {
        let Some(data) = value.data() else {
            return Json::Null;
        };

        match data {
            ValueData::Bool(b) => Json::Bool(*b),
            ValueData::Count(v) => Json::Number(Number::from(*v)),
            ValueData::Int(v) => Json::Number(Number::from(*v)),
            ValueData::Double(v) | ValueData::Interval(v) => json_f64(*v),
            ValueData::Time(v) => self.time_to_json(*v),
            ValueData::String(s) => Json::String(s.clone()),
            ValueData::Port(p) => Json::Number(Number::from(*p)),
            ValueData::Addr(a) => Json::String(a.to_string()),
            ValueData::Subnet(s) => Json::String(s.to_string()),
            ValueData::Enum(e) => Json::String(e.clone()),
            ValueData::Set(elems) | ValueData::Vector(elems) | ValueData::Record(elems) => {
                Json::Array(elems.iter().map(|e| self.value_to_json(e)).collect())
            }
            ValueData::Table(entries) => {
                let mut map = Map::new();
                for (key, val) in entries {
                    map.insert(json_key(key), self.value_to_json(val));
                }
                Json::Object(map)
            }
        }
    }
}

/// Render a table key as a JSON object key
fn json_key(value: &Value) -> String {
    match value.data() {
        Some(ValueData::String(s)) => s.clone(),
        Some(ValueData::Enum(e)) => e.clone(),
        Some(ValueData::Count(v)) => v.to_string(),
        Some(ValueData::Int(v)) => v.to_string(),
        Some(ValueData::Addr(a)) => a.to_string(),
        other => format!("{other:?}"),
    }
}

fn json_f64(v: f64) -> Json {
    Number::from_f64(v).map(Json::Number).unwrap_or(Json::Null)
}

impl LogFormatter for JsonFormatter {
    fn format(
        &self,
        fields: &[Field],
        record: &LogRecord,
        out: &mut String,
    ) -> Result<(), FormatError> {
        let mut map = Map::new();
        for (field, value) in fields.iter().zip(record) {
            if value.is_unset() {
                continue;
            }
            map.insert(field.name.clone(), self.value_to_json(value));
        }

        out.push_str(&serde_json::to_string(&Json::Object(map))?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "json_test.rs"]
mod json_test;
