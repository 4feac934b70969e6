// src/engine/mod.rs

//! Sequential render-job engine.
//!
//! - `job`     – immutable job descriptors
//! - `queue`   – FIFO hand-off from producers to the worker
//! - `retry`   – pure retry / fail-policy state machine
//! - `worker`  – the background loop that runs one job at a time
//! - `events`  – log and status events for the presentation layer
//! - `status`  – per-job status as seen by the presentation layer
//! - `handle`  – the public [`Engine`] handle

pub mod events;
pub mod job;
pub mod queue;
pub mod retry;
pub mod status;

mod current;
mod handle;
mod worker;

use std::path::PathBuf;
use std::time::Duration;

use crate::config::ConfigSection;

pub use events::{EngineEvent, EventSink, EventStream, QueueEnd};
pub use handle::Engine;
pub use job::{JobDescriptor, JobId};
pub use retry::{AttemptOutcome, Decision, JobState, RetryMachine};
pub use status::{JobRunState, JobStatus, StatusBoard};

/// Knobs for the worker and attempt supervision.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory receiving one log file per attempt.
    pub logs_dir: PathBuf,
    /// How long the worker waits on an empty queue before rechecking the
    /// stop flag.
    pub poll_interval: Duration,
    /// Period of the elapsed/progress status updates while rendering.
    pub status_interval: Duration,
    /// How long to keep forwarding output after the process has exited.
    pub drain_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("render_logs"),
            poll_interval: Duration::from_millis(250),
            status_interval: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &ConfigSection) -> Self {
        Self {
            logs_dir: PathBuf::from(&config.logs_dir),
            ..Self::default()
        }
    }
}
