// src/engine/queue.rs

//! Unbounded FIFO of job descriptors between producers and the worker.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::engine::job::JobDescriptor;

/// Create a connected producer/consumer pair.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (JobSender { tx }, JobReceiver { rx })
}

/// Producer side. Cheap to clone, usable from any thread.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<JobDescriptor>,
}

impl JobSender {
    /// Append a job. Never blocks; only fails (handing the job back) once the
    /// consumer is gone.
    pub fn enqueue(&self, job: JobDescriptor) -> Result<(), JobDescriptor> {
        self.tx.send(job).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Result of a bounded wait on the queue.
#[derive(Debug)]
pub enum Dequeued {
    Job(JobDescriptor),
    /// Nothing arrived within the timeout.
    Empty,
    /// Every sender is gone and the queue is drained.
    Closed,
}

/// Consumer side, owned by exactly one worker.
#[derive(Debug)]
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<JobDescriptor>,
}

impl JobReceiver {
    /// Take the next job, waiting at most `timeout`.
    pub async fn dequeue(&mut self, timeout: Duration) -> Dequeued {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(job)) => Dequeued::Job(job),
            Ok(None) => Dequeued::Closed,
            Err(_) => Dequeued::Empty,
        }
    }

    /// Remove everything currently queued without waiting.
    pub fn drain(&mut self) -> Vec<JobDescriptor> {
        let mut jobs = Vec::new();
        while let Ok(job) = self.rx.try_recv() {
            jobs.push(job);
        }
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(name: &str) -> JobDescriptor {
        JobDescriptor::new(name, name, vec!["true".to_string()])
    }

    #[tokio::test]
    async fn preserves_fifo_order() {
        let (tx, mut rx) = job_queue();
        for name in ["a", "b", "c"] {
            tx.enqueue(job(name)).unwrap();
        }

        let mut order = Vec::new();
        while let Dequeued::Job(j) = rx.dequeue(Duration::from_millis(10)).await {
            order.push(j.display_name);
        }
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_queue_times_out() {
        let (_tx, mut rx) = job_queue();
        assert!(matches!(rx.dequeue(Duration::from_millis(10)).await, Dequeued::Empty));
    }

    #[tokio::test]
    async fn closed_after_senders_drop_and_queue_drains() {
        let (tx, mut rx) = job_queue();
        tx.enqueue(job("a")).unwrap();
        drop(tx);

        assert!(matches!(rx.dequeue(Duration::from_millis(10)).await, Dequeued::Job(_)));
        assert!(matches!(rx.dequeue(Duration::from_millis(10)).await, Dequeued::Closed));
    }

    #[tokio::test]
    async fn enqueue_hands_job_back_when_consumer_is_gone() {
        let (tx, rx) = job_queue();
        drop(rx);
        assert!(tx.is_closed());
        let back = tx.enqueue(job("a")).unwrap_err();
        assert_eq!(back.display_name, "a");
    }

    #[test]
    fn drain_takes_everything_queued() {
        let (tx, mut rx) = job_queue();
        tx.enqueue(job("a")).unwrap();
        tx.enqueue(job("b")).unwrap();
        assert_eq!(rx.drain().len(), 2);
        assert!(rx.drain().is_empty());
    }
}
