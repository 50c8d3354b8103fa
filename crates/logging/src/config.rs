//! Layered configuration resolution
//!
//! Every backend resolves configuration strings through three tiers, later
//! tiers overriding earlier ones:
//!
//! 1. composed built-in defaults for the writer's class stack
//! 2. the unprefixed entry in the writer-info config
//! 3. the `<backend-name>:key` entry in the writer-info config
//!
//! Defaults compose leaf to root with the leaf winning on collision, so a
//! concrete writer can re-default a key its adapter layer introduced. A key
//! with no registered default is a programmer error: defaults must cover
//! every key the code queries.

use vigil_record::ConfigMap;

use crate::error::{Result, WriterError};

/// Config key for the statistics emission interval, seconds
pub const STATISTICS_INTERVAL_KEY: &str = "statistics_interval_seconds";

/// Bounds applied to the statistics interval on read
const STATISTICS_INTERVAL_MIN: f64 = 0.001;
const STATISTICS_INTERVAL_MAX: f64 = 86_400.0;

/// Defaults contributed by the base backend layer
pub fn base_defaults() -> ConfigMap {
    ConfigMap::from([(STATISTICS_INTERVAL_KEY, "10")])
}

/// Compose per-layer default maps, leaf first
///
/// The result starts from the leaf map; each following (parent) layer only
/// fills in keys the composition does not have yet.
pub fn compose_defaults(layers: &[ConfigMap]) -> ConfigMap {
    let mut composed = layers.first().cloned().unwrap_or_default();
    for parent in layers.iter().skip(1) {
        composed.merge_defaults(parent);
    }
    composed
}

/// Resolve a configuration string through the three tiers
///
/// # Panics
///
/// Panics if `key` has no entry in `defaults` - every queried key must be
/// covered by a built-in default.
pub fn resolve(defaults: &ConfigMap, config: &ConfigMap, backend_name: &str, key: &str) -> String {
    let mut value = defaults
        .get(key)
        .unwrap_or_else(|| panic!("config key '{key}' has no registered default"))
        .to_string();

    if let Some(v) = config.get(key) {
        value = v.to_string();
    }

    let prefixed = format!("{backend_name}:{key}");
    if let Some(v) = config.get(&prefixed) {
        value = v.to_string();
    }

    value
}

/// Parse a float config value, mapping failures to a config error
pub fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| WriterError::config(format!("invalid value '{value}' for '{key}', must be a number")))
}

/// Parse an unsigned config value, mapping failures to a config error
pub fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value.parse::<usize>().map_err(|_| {
        WriterError::config(format!(
            "invalid value '{value}' for '{key}', must be a non-negative integer"
        ))
    })
}

/// Clamp a statistics interval into its supported range
pub fn clamp_statistics_interval(secs: f64) -> f64 {
    secs.clamp(STATISTICS_INTERVAL_MIN, STATISTICS_INTERVAL_MAX)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
