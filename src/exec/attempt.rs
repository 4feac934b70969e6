// src/exec/attempt.rs

//! One supervised attempt of a job.
//!
//! While the process runs, two helper tasks live alongside it:
//! - the output pump, forwarding every line to the event sink and the
//!   attempt log and feeding the progress extractor;
//! - the status ticker, publishing elapsed time (and the latest progress)
//!   once per `status_interval`.
//!
//! Both are torn down before [`run_attempt`] returns, so nothing from an
//! attempt outlives it.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::engine::EngineOptions;
use crate::engine::events::EventSink;
use crate::engine::job::{JobDescriptor, JobId};
use crate::engine::retry::AttemptOutcome;
use crate::engine::status::{JobRunState, JobStatus};
use crate::exec::log_file::AttemptLog;
use crate::exec::process::{LineStream, NO_EXIT_CODE, ProcessHandle};
use crate::exec::progress;

/// Inputs for one attempt.
#[derive(Debug)]
pub struct AttemptContext<'a> {
    pub job: &'a JobDescriptor,
    /// 1-based attempt number.
    pub attempt: u32,
    pub started_at: DateTime<Local>,
    /// Fires on cancel-current or cancel-all.
    pub cancel: CancellationToken,
    pub events: &'a EventSink,
    pub options: &'a EngineOptions,
}

/// What happened during one attempt.
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub outcome: AttemptOutcome,
    pub ended_at: DateTime<Local>,
    pub elapsed: Duration,
    pub log_path: PathBuf,
}

/// Run one attempt to completion (or cancellation) and report the outcome.
///
/// Never returns an error: start failures become
/// [`AttemptOutcome::StartFailed`], wait failures are logged and reported as
/// [`NO_EXIT_CODE`].
pub async fn run_attempt(ctx: AttemptContext<'_>) -> AttemptReport {
    let job = ctx.job;
    let clock = Instant::now();

    let mut log = AttemptLog::open(&ctx.options.logs_dir, &job.display_name, ctx.started_at).await;
    log.write_header(&job.command_line(), ctx.started_at).await;
    let log_path = log.path().to_path_buf();

    let mut handle = match ProcessHandle::start(&job.command) {
        Ok(handle) => handle,
        Err(e) => {
            error!(
                job = %job.id,
                attempt = ctx.attempt,
                error = %e,
                "failed to start process"
            );
            ctx.events
                .log(format!("[{}] Failed to start: {e}", job.display_name));
            log.write_line(&format!("START FAILED: {e}")).await;
            let ended_at = Local::now();
            log.finish(ended_at, None).await;
            return AttemptReport {
                outcome: AttemptOutcome::StartFailed,
                ended_at,
                elapsed: clock.elapsed(),
                log_path,
            };
        }
    };

    info!(
        job = %job.id,
        attempt = ctx.attempt,
        pid = ?handle.pid(),
        log = %log_path.display(),
        "attempt started"
    );

    let progress = Arc::new(ProgressCell::default());
    let log = Arc::new(Mutex::new(log));

    let pump = handle.take_lines().map(|lines| {
        tokio::spawn(pump_output(
            lines,
            Arc::clone(&log),
            ctx.events.clone(),
            Arc::clone(&progress),
            job.display_name.clone(),
        ))
    });

    let ticker_stop = CancellationToken::new();
    let ticker = tokio::spawn(tick_status(
        job.id.clone(),
        ctx.started_at,
        clock,
        Arc::clone(&progress),
        ctx.events.clone(),
        ctx.options.status_interval,
        ticker_stop.clone(),
    ));

    let exit = tokio::select! {
        res = handle.wait() => res,
        _ = ctx.cancel.cancelled() => {
            info!(
                job = %job.id,
                attempt = ctx.attempt,
                kill_timeout_s = job.kill_timeout.as_secs_f64(),
                "cancellation requested; stopping process"
            );
            ctx.events
                .log(format!("[Cancel] Sent terminate to {}", job.display_name));
            handle.cancel(job.kill_timeout).await
        }
    };

    let exit_code = match exit {
        Ok(code) => code,
        Err(e) => {
            warn!(job = %job.id, error = %e, "waiting for process failed");
            NO_EXIT_CODE
        }
    };
    let ended_at = Local::now();
    let elapsed = clock.elapsed();

    ticker_stop.cancel();
    if let Err(e) = ticker.await {
        debug!(job = %job.id, error = %e, "status ticker ended abnormally");
    }

    if let Some(mut pump) = pump {
        match tokio::time::timeout(ctx.options.drain_timeout, &mut pump).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(job = %job.id, error = %e, "output pump ended abnormally"),
            Err(_) => {
                // Typically a grandchild that inherited the pipes.
                warn!(
                    job = %job.id,
                    "output still open after process exit; stopping forwarding"
                );
                pump.abort();
            }
        }
    }

    log.lock().await.finish(ended_at, Some(exit_code)).await;

    info!(
        job = %job.id,
        attempt = ctx.attempt,
        exit_code,
        elapsed_s = elapsed.as_secs_f64(),
        "attempt finished"
    );
    ctx.events
        .log(format!("[{}] Exit code: {exit_code}", job.display_name));

    AttemptReport {
        outcome: AttemptOutcome::Exited(exit_code),
        ended_at,
        elapsed,
        log_path,
    }
}

async fn pump_output(
    mut lines: LineStream,
    log: Arc<Mutex<AttemptLog>>,
    events: EventSink,
    progress: Arc<ProgressCell>,
    name: String,
) {
    while let Some(next) = lines.next_line().await {
        match next {
            Ok(line) => {
                trace!(job = %name, "output: {}", line);
                if let Some(pct) = progress::extract(&line) {
                    progress.set(pct);
                }
                events.log(line.clone());
                log.lock().await.write_line(&line).await;
            }
            Err(e) => {
                warn!(job = %name, error = %e, "reading process output failed");
                events.log(format!("[{name}] Output read error: {e}"));
            }
        }
    }
    debug!(job = %name, "output stream ended");
}

async fn tick_status(
    job: JobId,
    started_at: DateTime<Local>,
    clock: Instant,
    progress: Arc<ProgressCell>,
    events: EventSink,
    period: Duration,
    stop: CancellationToken,
) {
    let period = period.max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = interval.tick() => {
                events.status(
                    &job,
                    JobRunState {
                        status: JobStatus::Rendering {
                            elapsed: clock.elapsed(),
                            progress: progress.get(),
                        },
                        started_at: Some(started_at),
                        ended_at: None,
                    },
                );
            }
        }
    }
}

/// Latest progress percentage shared between the pump and the ticker.
#[derive(Debug)]
struct ProgressCell(AtomicU8);

impl ProgressCell {
    const UNKNOWN: u8 = u8::MAX;

    fn set(&self, pct: u8) {
        self.0.store(pct.min(100), Ordering::Relaxed);
    }

    fn get(&self) -> Option<u8> {
        match self.0.load(Ordering::Relaxed) {
            Self::UNKNOWN => None,
            pct => Some(pct),
        }
    }
}

impl Default for ProgressCell {
    fn default() -> Self {
        Self(AtomicU8::new(Self::UNKNOWN))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::engine::events::{EngineEvent, event_channel};

    fn options(dir: &std::path::Path) -> EngineOptions {
        EngineOptions {
            logs_dir: dir.to_path_buf(),
            poll_interval: Duration::from_millis(20),
            status_interval: Duration::from_millis(50),
            drain_timeout: Duration::from_millis(500),
        }
    }

    fn sh_job(script: &str) -> JobDescriptor {
        JobDescriptor::new(
            "job",
            "job",
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        )
    }

    #[tokio::test]
    async fn ticker_publishes_latest_progress() {
        let dir = tempfile::tempdir().unwrap();
        let opts = options(dir.path());
        let (events, mut stream) = event_channel();
        let job = sh_job("echo 'frame 1/4'; sleep 0.3; echo 'progress=50'; sleep 0.3");

        let report = run_attempt(AttemptContext {
            job: &job,
            attempt: 1,
            started_at: Local::now(),
            cancel: CancellationToken::new(),
            events: &events,
            options: &opts,
        })
        .await;

        assert_eq!(report.outcome, AttemptOutcome::Exited(0));

        let mut progress_seen = Vec::new();
        while let Some(ev) = stream.try_recv() {
            if let EngineEvent::Status { state, .. } = ev {
                if let JobStatus::Rendering { progress: Some(p), .. } = state.status {
                    progress_seen.push(p);
                }
            }
        }
        assert!(progress_seen.contains(&25), "saw {progress_seen:?}");
        assert!(progress_seen.contains(&50), "saw {progress_seen:?}");
    }

    #[test]
    fn progress_cell_starts_unknown() {
        let cell = ProgressCell::default();
        assert_eq!(cell.get(), None);
        cell.set(100);
        assert_eq!(cell.get(), Some(100));
        cell.set(0);
        assert_eq!(cell.get(), Some(0));
    }
}
