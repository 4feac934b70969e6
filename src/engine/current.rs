// src/engine/current.rs

//! The single "current attempt" record shared between the worker and the
//! cancellation calls.
//!
//! Only the worker writes it (set at attempt start, cleared after exit);
//! `cancel_current` reads it from whatever thread the caller is on.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::engine::job::JobId;

#[derive(Debug)]
struct AttemptControl {
    job: JobId,
    attempt: u32,
    cancel: CancellationToken,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CurrentAttempt {
    slot: Arc<Mutex<Option<AttemptControl>>>,
}

impl CurrentAttempt {
    pub(crate) fn set(&self, job: JobId, attempt: u32, cancel: CancellationToken) {
        *self.lock() = Some(AttemptControl {
            job,
            attempt,
            cancel,
        });
    }

    pub(crate) fn clear(&self) {
        *self.lock() = None;
    }

    /// Cancel the in-flight attempt, returning which job and attempt it was.
    pub(crate) fn cancel(&self) -> Option<(JobId, u32)> {
        let guard = self.lock();
        let current = guard.as_ref()?;
        current.cancel.cancel();
        Some((current.job.clone(), current.attempt))
    }

    pub(crate) fn job(&self) -> Option<JobId> {
        self.lock().as_ref().map(|c| c.job.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<AttemptControl>> {
        // The record is always left consistent, so a poisoned lock is usable.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_fires_token_of_current_attempt_only() {
        let current = CurrentAttempt::default();
        assert!(current.cancel().is_none());

        let token = CancellationToken::new();
        current.set(JobId::new("a"), 2, token.clone());
        assert_eq!(current.job(), Some(JobId::new("a")));

        assert_eq!(current.cancel(), Some((JobId::new("a"), 2)));
        assert!(token.is_cancelled());

        current.clear();
        assert!(current.job().is_none());
        assert!(current.cancel().is_none());
    }
}
