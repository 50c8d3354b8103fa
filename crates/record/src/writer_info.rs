//! Per-writer initialization metadata
//!
//! A [`WriterInfo`] travels from the analysis engine to a writer backend at
//! creation time and is kept by the backend for its lifetime. It also has a
//! self-describing wire form (a five-element JSON array) so that writer
//! instances can be mirrored to remote peers; decoding an encoded info
//! yields an equal value.

use serde_json::{json, Value as Json};

use crate::config_map::ConfigMap;
use crate::error::WireError;

/// Initialization metadata for one writer instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriterInfo {
    /// Path value configured for the logging filter; interpretation is
    /// up to the writer (file-based writers treat it as a filename stem)
    pub path: String,

    /// Rotation interval in seconds as configured for this writer
    pub rotation_interval: f64,

    /// Base offset for the rotation schedule, seconds
    pub rotation_base: f64,

    /// Network time when the writer was created
    pub network_time: f64,

    /// Per-writer key/value configuration
    pub config: ConfigMap,
}

impl WriterInfo {
    /// Create an info with the given path and an empty config
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Encode to the wire form
    ///
    /// Layout: `[path, rotation_base, rotation_interval, network_time,
    /// {config}]`.
    pub fn to_wire(&self) -> Json {
        let config: serde_json::Map<String, Json> = self
            .config
            .iter()
            .map(|(k, v)| (k.to_string(), Json::String(v.to_string())))
            .collect();

        json!([
            self.path,
            self.rotation_base,
            self.rotation_interval,
            self.network_time,
            config,
        ])
    }

    /// Decode from the wire form
    pub fn from_wire(wire: &Json) -> Result<Self, WireError> {
        let parts = wire.as_array().filter(|v| v.len() == 5).ok_or(WireError::Shape)?;

        let path = parts[0]
            .as_str()
            .ok_or(WireError::FieldType("path"))?
            .to_string();
        let rotation_base = parts[1].as_f64().ok_or(WireError::FieldType("rotation_base"))?;
        let rotation_interval = parts[2]
            .as_f64()
            .ok_or(WireError::FieldType("rotation_interval"))?;
        let network_time = parts[3].as_f64().ok_or(WireError::FieldType("network_time"))?;
        let table = parts[4].as_object().ok_or(WireError::FieldType("config"))?;

        let mut config = ConfigMap::new();
        for (key, value) in table {
            let value = value
                .as_str()
                .ok_or_else(|| WireError::ConfigEntry(key.clone()))?;
            config.insert(key.clone(), value);
        }

        Ok(Self {
            path,
            rotation_interval,
            rotation_base,
            network_time,
            config,
        })
    }
}

#[cfg(test)]
#[path = "writer_info_test.rs"]
mod writer_info_test;
