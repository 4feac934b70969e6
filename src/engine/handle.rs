// src/engine/handle.rs

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine::EngineOptions;
use crate::engine::current::CurrentAttempt;
use crate::engine::events::{EventSink, EventStream, event_channel};
use crate::engine::job::{JobDescriptor, JobId};
use crate::engine::queue::{JobSender, job_queue};
use crate::engine::status::JobRunState;
use crate::engine::worker::Worker;

/// Handle to the render engine.
///
/// Cheap to clone; every clone drives the same queue and worker. All methods
/// are synchronous and may be called from any thread.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    runtime: Handle,
    options: EngineOptions,
    events: EventSink,
    current: CurrentAttempt,
    slot: Mutex<WorkerSlot>,
}

/// The live worker generation, if any.
#[derive(Debug)]
struct WorkerSlot {
    queue: Option<JobSender>,
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl WorkerSlot {
    fn needs_new_generation(&self) -> bool {
        let Some(queue) = &self.queue else {
            return true;
        };
        queue.is_closed()
            || self.stop.is_cancelled()
            || self.handle.as_ref().is_none_or(|h| h.is_finished())
    }
}

impl Engine {
    /// Create an engine bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime; use
    /// [`Engine::with_runtime`] to pass a handle explicitly.
    pub fn new(options: EngineOptions) -> (Self, EventStream) {
        Self::with_runtime(options, Handle::current())
    }

    pub fn with_runtime(options: EngineOptions, runtime: Handle) -> (Self, EventStream) {
        let (events, stream) = event_channel();
        let engine = Self {
            shared: Arc::new(Shared {
                runtime,
                options,
                events,
                current: CurrentAttempt::default(),
                slot: Mutex::new(WorkerSlot {
                    queue: None,
                    stop: CancellationToken::new(),
                    handle: None,
                }),
            }),
        };
        (engine, stream)
    }

    /// Append a job to the queue, starting the worker if none is running.
    ///
    /// The job is reported `Queued` immediately. Never blocks.
    pub fn enqueue(&self, job: JobDescriptor) {
        info!(job = %job.id, name = %job.display_name, "job enqueued");
        self.shared.events.status(&job.id, JobRunState::queued());

        let mut slot = self.lock_slot();
        if slot.needs_new_generation() {
            self.spawn_generation(&mut slot);
        }

        let rejected = match slot.queue.as_ref() {
            Some(queue) => queue.enqueue(job).err(),
            None => Some(job),
        };

        // The worker closed its queue between the check and the send.
        if let Some(job) = rejected {
            debug!(job = %job.id, "queue closed under us; starting a new worker");
            self.spawn_generation(&mut slot);
            if let Some(queue) = slot.queue.as_ref() {
                if let Err(job) = queue.enqueue(job) {
                    error!(job = %job.id, "could not hand job to a fresh worker");
                }
            }
        }
    }

    /// Cancel the in-flight attempt only; the queue keeps going.
    ///
    /// Returns `false` when nothing was running.
    pub fn cancel_current(&self) -> bool {
        match self.shared.current.cancel() {
            Some((job, attempt)) => {
                info!(job = %job, attempt, "cancel current requested");
                true
            }
            None => {
                debug!("cancel current requested with no running process");
                self.shared.events.log("[Cancel] No running process");
                false
            }
        }
    }

    /// Stop the worker: cancel the in-flight attempt and discard the queue.
    pub fn cancel_all(&self) {
        info!("stop-all requested");
        self.lock_slot().stop.cancel();
        // The attempt token is a child of the stop token; this is only for
        // reporting which job was hit.
        if let Some((job, attempt)) = self.shared.current.cancel() {
            debug!(job = %job, attempt, "cancelled in-flight attempt");
        }
        self.shared.events.log("[Cancel] Stop-all requested.");
    }

    /// Whether a worker generation is alive.
    pub fn is_running(&self) -> bool {
        self.lock_slot()
            .handle
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Job whose process is running right now, if any.
    pub fn current_job(&self) -> Option<JobId> {
        self.shared.current.job()
    }

    /// Close the queue and wait for the worker to finish what it holds.
    ///
    /// Jobs already queued still run unless `cancel_all` was called.
    pub async fn shutdown(&self) {
        let handle = {
            let mut slot = self.lock_slot();
            slot.queue = None;
            slot.handle.take()
        };
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker ended abnormally");
            }
        }
        info!("engine shut down");
    }

    /// Replace the slot's generation with a fresh worker chained after the
    /// previous one.
    fn spawn_generation(&self, slot: &mut WorkerSlot) {
        let (queue, receiver) = job_queue();
        let stop = CancellationToken::new();
        let previous = slot.handle.take();

        let worker = Worker::new(
            receiver,
            stop.clone(),
            self.shared.current.clone(),
            self.shared.events.clone(),
            self.shared.options.clone(),
        );
        let handle = self.shared.runtime.spawn(worker.run(previous));
        debug!("spawned worker generation");

        slot.queue = Some(queue);
        slot.stop = stop;
        slot.handle = Some(handle);
    }

    fn lock_slot(&self) -> MutexGuard<'_, WorkerSlot> {
        self.shared.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}
