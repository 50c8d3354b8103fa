//! Writer task wiring
//!
//! Glue between a frontend and its backend: builds the two message queues,
//! spawns the backend's run loop as a dedicated task, and starts a ticker
//! task that feeds heartbeat messages into the input queue. The ticker
//! exits on its own once the backend is gone.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use vigil_record::WriterInfo;

use crate::backend::{wallclock, WriterBackend};
use crate::frontend::WriterFrontend;
use crate::message::InputMessage;
use crate::plugin::{BatchWriter, PushWriter};
use crate::stats::WriteStats;

/// Heartbeat cadence for a writer task
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between heartbeat messages
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

impl HeartbeatConfig {
    /// Heartbeats far enough apart to never fire in short-lived tests
    pub fn disabled() -> Self {
        Self {
            interval: Duration::from_secs(3600),
        }
    }
}

/// Spawn a writer around a record-at-a-time plugin
///
/// Returns the main-thread frontend and the backend task handle; awaiting
/// the handle after [`WriterFrontend::stop`] yields the final statistics.
pub fn spawn_push_writer<W: PushWriter>(
    name: impl Into<String>,
    info: WriterInfo,
    writer: W,
    heartbeat: HeartbeatConfig,
) -> crate::error::Result<(WriterFrontend, JoinHandle<WriteStats>)> {
    let name = name.into();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();

    let backend = WriterBackend::direct(name.clone(), info.clone(), writer, input_rx, output_tx)?;
    let handle = tokio::spawn(backend.run());
    spawn_heartbeat(input_tx.downgrade(), heartbeat);

    Ok((WriterFrontend::new(name, info, input_tx, output_rx), handle))
}

/// Spawn a writer around a batching plugin
pub fn spawn_batch_writer<W: BatchWriter>(
    name: impl Into<String>,
    info: WriterInfo,
    writer: W,
    heartbeat: HeartbeatConfig,
) -> crate::error::Result<(WriterFrontend, JoinHandle<WriteStats>)> {
    let name = name.into();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();

    let backend = WriterBackend::batched(name.clone(), info.clone(), writer, input_rx, output_tx)?;
    let handle = tokio::spawn(backend.run());
    spawn_heartbeat(input_tx.downgrade(), heartbeat);

    Ok((WriterFrontend::new(name, info, input_tx, output_rx), handle))
}

/// Periodic heartbeat feeder for one writer task
///
/// Holds only a weak sender so a dropped frontend still closes the input
/// queue and lets the backend exit.
fn spawn_heartbeat(input: mpsc::WeakUnboundedSender<InputMessage>, config: HeartbeatConfig) {
    tokio::spawn(async move {
        // Start one period out; an immediate first beat would race init.
        let start = tokio::time::Instant::now() + config.interval;
        let mut ticker = tokio::time::interval_at(start, config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let Some(sender) = input.upgrade() else {
                break;
            };
            let now = wallclock();
            let beat = InputMessage::Heartbeat {
                network_time: now,
                current_time: now,
            };
            if sender.send(beat).is_err() {
                break;
            }
        }
    });
}
