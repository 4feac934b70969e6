// src/engine/events.rs

//! Status and log events flowing from the engine to the presentation layer.
//!
//! The channel is unbounded so the worker never blocks on a slow consumer.
//! If the consumer goes away, events are silently dropped.

use tokio::sync::mpsc;
use tracing::trace;

use crate::engine::job::JobId;
use crate::engine::status::JobRunState;

/// How a stretch of queue processing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEnd {
    /// Every queued job was processed.
    Completed,
    /// A `stop_queue` job failed; remaining jobs were discarded.
    StoppedByPolicy,
    /// `cancel_all` was requested; remaining jobs were discarded.
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// One line of process output or a control line (start, exit, retry ...).
    Log(String),
    /// New state of a job.
    Status { job: JobId, state: JobRunState },
    /// The worker ran out of work or was stopped.
    QueueFinished(QueueEnd),
}

/// Create the sink used by the engine and the stream handed to the consumer.
pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventStream { rx })
}

/// Sending half; cloned into every task that reports progress.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    pub fn log(&self, line: impl Into<String>) {
        self.send(EngineEvent::Log(line.into()));
    }

    pub fn status(&self, job: &JobId, state: JobRunState) {
        self.send(EngineEvent::Status {
            job: job.clone(),
            state,
        });
    }

    pub fn queue_finished(&self, end: QueueEnd) {
        self.send(EngineEvent::QueueFinished(end));
    }

    fn send(&self, event: EngineEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = ?e.0, "event stream dropped; discarding event");
        }
    }
}

/// Receiving half, owned by the presentation layer.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EventStream {
    /// Next event; `None` once the engine and all its tasks are gone.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }
}
