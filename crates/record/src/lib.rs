//! Vigil - Typed record model
//!
//! Core data types shared between the analysis engine and the log-writer
//! subsystem: field descriptors, tagged value cells, and the per-writer
//! initialization metadata with its self-describing wire form.
//!
//! # Ownership
//!
//! A [`LogRecord`] has exactly one owner at any instant. Records are created
//! on the main thread and *moved* into the writer backend through its input
//! channel; the backend consumes and drops them. Field descriptors are
//! installed once at writer initialization and are immutable afterwards.

/// Field descriptors and type tags
pub mod field;

/// Tagged value cells
pub mod value;

/// Insertion-ordered string-to-string configuration map
pub mod config_map;

/// Per-writer initialization metadata and wire form
pub mod writer_info;

/// Wire decoding errors
pub mod error;

pub use config_map::ConfigMap;
pub use error::WireError;
pub use field::{Field, TypeTag};
pub use value::{LogRecord, Subnet, Value, ValueData};
pub use writer_info::WriterInfo;
