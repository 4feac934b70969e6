// src/engine/retry.rs

//! Pure retry / failure-policy state machine for a single job.
//!
//! No processes, channels or clocks in here: the worker reports how each
//! attempt ended and the machine says what to do next. This keeps every
//! policy interaction unit-testable.

use crate::engine::job::JobDescriptor;
use crate::types::FailPolicy;

/// How one attempt ended, as far as the policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The process ran and exited with this code.
    Exited(i32),
    /// The process never ran.
    StartFailed,
}

/// Lifecycle of a job inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    /// Attempt `n` (1-based) is running.
    Attempting(u32),
    /// Attempt `n` failed and another one will follow.
    Retrying(u32),
    Succeeded,
    Failed { exit_code: Option<i32> },
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed { .. } | JobState::Cancelled
        )
    }
}

/// What the worker should do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Succeeded,
    /// Run the same descriptor again.
    Retry,
    /// Give up on this job; `stop_queue` asks the worker to halt the queue.
    Failed {
        exit_code: Option<i32>,
        stop_queue: bool,
    },
    Cancelled,
}

/// Decide the transition after attempt number `attempts` (1-based).
///
/// Order matters:
/// 1. exit code 0 always succeeds, even if a cancel raced the exit;
/// 2. a requested cancellation wins over any policy;
/// 3. `StopQueue` halts on the first failure, before retries are considered;
/// 4. retries are consumed while `attempts <= retry_limit`;
/// 5. otherwise the job fails and the queue moves on.
///
/// A start failure is never retried and goes straight to the policy.
pub fn decide(
    outcome: AttemptOutcome,
    attempts: u32,
    retry_limit: u32,
    policy: FailPolicy,
    cancel_requested: bool,
) -> Decision {
    let exit_code = match outcome {
        AttemptOutcome::Exited(0) => return Decision::Succeeded,
        AttemptOutcome::Exited(code) => Some(code),
        AttemptOutcome::StartFailed => None,
    };

    if cancel_requested {
        return Decision::Cancelled;
    }

    if policy == FailPolicy::StopQueue {
        return Decision::Failed {
            exit_code,
            stop_queue: true,
        };
    }

    if exit_code.is_some() && attempts <= retry_limit {
        return Decision::Retry;
    }

    Decision::Failed {
        exit_code,
        stop_queue: false,
    }
}

/// Tracks attempts and state for one job while the worker drives it.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    retry_limit: u32,
    policy: FailPolicy,
    attempts: u32,
    state: JobState,
}

impl RetryMachine {
    pub fn new(retry_limit: u32, policy: FailPolicy) -> Self {
        Self {
            retry_limit,
            policy,
            attempts: 0,
            state: JobState::Pending,
        }
    }

    pub fn for_job(job: &JobDescriptor) -> Self {
        Self::new(job.retry_limit, job.fail_policy)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry_limit.saturating_add(1)
    }

    /// Move to `Attempting(n)` and return `n`.
    pub fn begin_attempt(&mut self) -> u32 {
        debug_assert!(
            matches!(self.state, JobState::Pending | JobState::Retrying(_)),
            "begin_attempt in state {:?}",
            self.state
        );
        self.attempts += 1;
        self.state = JobState::Attempting(self.attempts);
        self.attempts
    }

    /// Record how the current attempt ended and return the decision.
    pub fn record(&mut self, outcome: AttemptOutcome, cancel_requested: bool) -> Decision {
        let decision = decide(
            outcome,
            self.attempts,
            self.retry_limit,
            self.policy,
            cancel_requested,
        );
        self.state = match decision {
            Decision::Succeeded => JobState::Succeeded,
            Decision::Retry => JobState::Retrying(self.attempts),
            Decision::Failed { exit_code, .. } => JobState::Failed { exit_code },
            Decision::Cancelled => JobState::Cancelled,
        };
        decision
    }

    /// Cancelled between attempts (stop-all before a retry).
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            self.state = JobState::Cancelled;
        }
    }
}
