// src/engine/worker.rs

//! The single background worker that drains the job queue.
//!
//! One worker exists per "generation": it is spawned by the first enqueue
//! into an idle engine and keeps polling across submissions until its stop
//! token fires (cancel-all or a `stop_queue` failure) or the queue closes.
//! A new generation waits for the previous worker to finish first, so two
//! processes never run at once.

use chrono::Local;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::EngineOptions;
use crate::engine::current::CurrentAttempt;
use crate::engine::events::{EventSink, QueueEnd};
use crate::engine::job::JobDescriptor;
use crate::engine::queue::{Dequeued, JobReceiver};
use crate::engine::retry::{Decision, RetryMachine};
use crate::engine::status::{JobRunState, JobStatus, format_elapsed};
use crate::exec::attempt::{AttemptContext, run_attempt};

pub(crate) struct Worker {
    queue: JobReceiver,
    stop: CancellationToken,
    current: CurrentAttempt,
    events: EventSink,
    options: EngineOptions,
    stopped_by_policy: bool,
}

impl Worker {
    pub(crate) fn new(
        queue: JobReceiver,
        stop: CancellationToken,
        current: CurrentAttempt,
        events: EventSink,
        options: EngineOptions,
    ) -> Self {
        Self {
            queue,
            stop,
            current,
            events,
            options,
            stopped_by_policy: false,
        }
    }

    /// Main loop. Returns when stopped or when every sender is dropped.
    pub(crate) async fn run(mut self, previous: Option<JoinHandle<()>>) {
        if let Some(previous) = previous {
            debug!("waiting for previous worker to finish");
            if let Err(e) = previous.await {
                warn!(error = %e, "previous worker ended abnormally");
            }
        }

        info!("worker loop started");

        // Jobs taken since the queue was last empty.
        let mut position = 0usize;

        loop {
            if self.stop.is_cancelled() {
                self.finish_stopped(position);
                break;
            }

            match self.queue.dequeue(self.options.poll_interval).await {
                Dequeued::Job(job) => {
                    if self.stop.is_cancelled() {
                        // Discarded together with the rest of the queue.
                        drop(job);
                        self.finish_stopped(position + 1);
                        break;
                    }
                    position += 1;
                    self.process_job(position, job).await;
                }
                Dequeued::Empty => {
                    if position > 0 {
                        position = 0;
                        info!("queue drained");
                        self.events.log("== Queue complete ==");
                        self.events.queue_finished(QueueEnd::Completed);
                    }
                }
                Dequeued::Closed => {
                    info!("job queue closed");
                    break;
                }
            }
        }

        info!("worker loop finished");
    }

    /// Discard what is still queued and report why the queue stopped.
    ///
    /// A worker stopped while idle with nothing queued exits quietly.
    fn finish_stopped(&mut self, position: usize) {
        let discarded = self.queue.drain();
        if position == 0 && discarded.is_empty() {
            debug!("stopped while idle");
            return;
        }
        if !discarded.is_empty() {
            info!(count = discarded.len(), "discarding queued jobs");
            self.events.log(format!(
                "[Cancel] Discarded {} queued job(s)",
                discarded.len()
            ));
        }

        if self.stopped_by_policy {
            info!("queue stopped by fail policy");
            self.events.log("== Queue stopped by policy ==");
            self.events.queue_finished(QueueEnd::StoppedByPolicy);
        } else {
            info!("queue cancelled");
            self.events.log("[Cancel] Stop-all while processing queue");
            self.events.log("== Queue cancelled ==");
            self.events.queue_finished(QueueEnd::Cancelled);
        }
    }

    async fn process_job(&mut self, position: usize, job: JobDescriptor) {
        let tag = format!("[{position}] {}", job.display_name);

        if let Err(reason) = job.validate() {
            warn!(job = %job.id, reason = %reason, "skipping incomplete job");
            self.events.log(format!("{tag} Skipped: {reason}"));
            self.events.status(
                &job.id,
                JobRunState {
                    status: JobStatus::Skipped,
                    ..JobRunState::queued()
                },
            );
            return;
        }

        let mut machine = RetryMachine::for_job(&job);
        let mut state = JobRunState::queued();

        loop {
            if self.stop.is_cancelled() {
                machine.cancel();
                info!(job = %job.id, "stop requested before next attempt");
                self.events.log(format!("{tag} Cancelled before next attempt"));
                state.status = JobStatus::Cancelled;
                self.events.status(&job.id, state.clone());
                return;
            }

            let attempt = machine.begin_attempt();

            // Cancellable from the moment the attempt is announced.
            let cancel = self.stop.child_token();
            self.current.set(job.id.clone(), attempt, cancel.clone());

            self.events.log(format!(
                "{tag} Start (try {attempt}/{}): {}",
                machine.max_attempts(),
                job.command_line()
            ));

            let started_at = Local::now();
            state.started_at = Some(started_at);
            state.ended_at = None;
            state.status = JobStatus::Rendering {
                elapsed: Default::default(),
                progress: None,
            };
            self.events.status(&job.id, state.clone());

            let report = run_attempt(AttemptContext {
                job: &job,
                attempt,
                started_at,
                cancel: cancel.clone(),
                events: &self.events,
                options: &self.options,
            })
            .await;

            self.current.clear();
            state.ended_at = Some(report.ended_at);

            let decision = machine.record(report.outcome, cancel.is_cancelled());
            debug!(job = %job.id, attempt, ?decision, "attempt decision");

            match decision {
                Decision::Succeeded => {
                    state.status = JobStatus::Done {
                        elapsed: report.elapsed,
                    };
                    self.events
                        .log(format!("{tag} Done in {}", format_elapsed(report.elapsed)));
                }
                Decision::Retry => {
                    info!(job = %job.id, attempt, "attempt failed; retrying");
                    self.events.log(format!("{tag} Will retry…"));
                    continue;
                }
                Decision::Cancelled => {
                    info!(job = %job.id, attempt, "job cancelled");
                    self.events.log(format!("{tag} Cancelled"));
                    state.status = JobStatus::Cancelled;
                }
                Decision::Failed {
                    exit_code,
                    stop_queue,
                } => {
                    state.status = JobStatus::Failed { exit_code };
                    if stop_queue {
                        warn!(job = %job.id, ?exit_code, "job failed; stopping queue by policy");
                        self.events.log(format!("{tag} Fail → stop queue by policy"));
                        self.stopped_by_policy = true;
                        self.stop.cancel();
                    } else {
                        warn!(
                            job = %job.id,
                            ?exit_code,
                            attempts = machine.attempts(),
                            "job failed"
                        );
                        self.events.log(format!(
                            "{tag} Failed after {} attempt(s)",
                            machine.attempts()
                        ));
                    }
                }
            }

            self.events.status(&job.id, state.clone());
            return;
        }
    }
}
