// src/engine/status.rs

//! Per-job display status and a board that folds status events together.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::engine::events::EngineEvent;
use crate::engine::job::JobId;

/// What a job is doing right now, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Rendering {
        elapsed: Duration,
        /// Latest percentage seen in the output, if any.
        progress: Option<u8>,
    },
    Done {
        elapsed: Duration,
    },
    /// `exit_code` is `None` when the process could not be started.
    Failed {
        exit_code: Option<i32>,
    },
    Cancelled,
    /// Skipped because the job's command was incomplete.
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Queued | JobStatus::Rendering { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("Queued"),
            JobStatus::Rendering {
                elapsed,
                progress: None,
            } => write!(f, "Rendering {}", format_elapsed(*elapsed)),
            JobStatus::Rendering {
                elapsed,
                progress: Some(pct),
            } => write!(f, "Rendering {pct}% {}", format_elapsed(*elapsed)),
            JobStatus::Done { elapsed } => write!(f, "Done ({})", format_elapsed(*elapsed)),
            JobStatus::Failed {
                exit_code: Some(code),
            } => write!(f, "Failed (rc={code})"),
            JobStatus::Failed { exit_code: None } => f.write_str("Failed (start error)"),
            JobStatus::Cancelled => f.write_str("Cancelled"),
            JobStatus::Skipped => f.write_str("Skipped (incomplete)"),
        }
    }
}

/// `mm:ss`; minutes keep counting past 59.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Session-scoped state of one job identity.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRunState {
    pub status: JobStatus,
    /// Start of the latest attempt.
    pub started_at: Option<DateTime<Local>>,
    /// End of the latest attempt.
    pub ended_at: Option<DateTime<Local>>,
}

impl JobRunState {
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            started_at: None,
            ended_at: None,
        }
    }
}

impl Default for JobRunState {
    fn default() -> Self {
        Self::queued()
    }
}

/// Presentation-side view of every job seen on the event stream.
///
/// Jobs are listed in the order their first status arrived. A job that is
/// enqueued again keeps its position and has its state replaced.
#[derive(Debug, Default)]
pub struct StatusBoard {
    order: Vec<JobId>,
    states: HashMap<JobId, JobRunState>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in; non-status events are ignored.
    pub fn apply(&mut self, event: &EngineEvent) {
        if let EngineEvent::Status { job, state } = event {
            if !self.states.contains_key(job) {
                self.order.push(job.clone());
            }
            self.states.insert(job.clone(), state.clone());
        }
    }

    pub fn get(&self, job: &str) -> Option<&JobRunState> {
        self.states.get(job)
    }

    pub fn status(&self, job: &str) -> Option<&JobStatus> {
        self.get(job).map(|s| &s.status)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobId, &JobRunState)> {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|state| (id, state)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
