//! Vigil - Log-writer framework
//!
//! Thread-per-writer dispatch layer between the analysis engine and
//! pluggable output writers. Each writer instance is a main-thread
//! [`WriterFrontend`] paired with a [`WriterBackend`] running on its own
//! task; the two communicate exclusively over a pair of FIFO message
//! queues, so no locks are shared between them.
//!
//! ```text
//! [Engine] -> [Frontend] --InputMessage--> [Backend task] -> [Writer plugin] -> bytes
//!                 ^                             |
//!                 +--------OutputMessage--------+  (events, rotation acks, disable)
//! ```
//!
//! Writers implement [`WriterPlugin`] plus exactly one of two contracts:
//! [`PushWriter`] for record-at-a-time output, or [`BatchWriter`] for
//! sinks that want whole batches, cached and flushed on size or age
//! thresholds. Records move by ownership end to end: the engine gives
//! them up at `write`, and the backend drops every record it receives.

/// Base backend: validation, lifecycle, rotation and heartbeat protocols
pub mod backend;

/// Batching dispatch adapter
pub mod batch;

/// Layered configuration resolution
pub mod config;

/// Record-at-a-time dispatch adapter
pub mod direct;

/// Writer error types
pub mod error;

/// Main-thread frontend shim
pub mod frontend;

/// Frontend/backend message protocol
pub mod message;

/// Writer plugin traits
pub mod plugin;

/// Writer task wiring and heartbeats
pub mod runner;

/// Running write statistics
pub mod stats;

pub use backend::{BackendCore, WriterBackend};
pub use batch::BatchDispatch;
pub use direct::DirectDispatch;
pub use error::{Result, WriteError, WriteErrorInfo, WriterError, NOT_WRITTEN_DESCRIPTION};
pub use frontend::{WriterFrontend, WRITER_BUFFER_SIZE};
pub use message::{InputMessage, OutputMessage, WriterEvent, LOG_STATISTICS, LOG_WRITE_ERROR};
pub use plugin::{BatchWriter, Dispatch, PushWriter, WriterPlugin};
pub use runner::{spawn_batch_writer, spawn_push_writer, HeartbeatConfig};
pub use stats::WriteStats;
