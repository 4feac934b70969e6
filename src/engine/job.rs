// src/engine/job.rs

//! Job identity and the immutable per-job descriptor.

use std::borrow::Borrow;
use std::fmt;
use std::time::Duration;

use crate::config::model::{ConfigSection, JobConfig};
use crate::types::FailPolicy;

/// Stable identity of a job, used to correlate status updates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Everything the worker needs to run a job, captured at enqueue time.
///
/// Options are copied in when the descriptor is built, so later edits to the
/// job file or CLI state never affect a job that is already queued. Retries
/// reuse the same descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub id: JobId,
    /// Literal invocation: executable followed by its arguments.
    pub command: Vec<String>,
    pub display_name: String,
    /// Additional attempts allowed after a failed first attempt.
    pub retry_limit: u32,
    pub fail_policy: FailPolicy,
    /// Grace period between terminate and forced kill on cancellation.
    pub kill_timeout: Duration,
}

impl JobDescriptor {
    /// A descriptor with no retries, the default policy and a 10s kill timeout.
    pub fn new(id: impl Into<JobId>, display_name: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            id: id.into(),
            command,
            display_name: display_name.into(),
            retry_limit: 0,
            fail_policy: FailPolicy::default(),
            kill_timeout: Duration::from_secs(10),
        }
    }

    /// Resolve a `[[job]]` entry against the queue-wide defaults.
    pub fn from_config(job: &JobConfig, defaults: &ConfigSection) -> Self {
        Self {
            id: JobId::new(job.name.clone()),
            command: job.command(defaults),
            display_name: job.name.clone(),
            retry_limit: job.effective_retries(defaults),
            fail_policy: job.effective_fail_policy(defaults),
            kill_timeout: job.effective_kill_timeout(defaults),
        }
    }

    /// Check that every command field is filled in.
    ///
    /// The error names the first missing field; such jobs are skipped rather
    /// than attempted.
    pub fn validate(&self) -> Result<(), String> {
        if self.command.is_empty() {
            return Err("command is empty".to_string());
        }
        if let Some(idx) = self.command.iter().position(|part| part.trim().is_empty()) {
            return Err(if idx == 0 {
                "program is not set".to_string()
            } else {
                format!("argument #{idx} is empty")
            });
        }
        Ok(())
    }

    /// Attempts allowed in total (first attempt plus retries).
    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    /// Human-readable invocation for logs; arguments containing whitespace
    /// are quoted.
    pub fn command_line(&self) -> String {
        self.command
            .iter()
            .map(|part| {
                if part.is_empty() || part.chars().any(char::is_whitespace) {
                    format!("\"{part}\"")
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}
