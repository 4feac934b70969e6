// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, JobConfig};
use crate::engine::{
    Engine, EngineEvent, EngineOptions, JobDescriptor, JobId, JobStatus, QueueEnd, StatusBoard,
};
use crate::errors::RenderqError;

/// How a `renderq` run ended.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// `None` for a dry run or when the engine went away early.
    pub end: Option<QueueEnd>,
    /// Final status of every launched job, in launch order.
    pub jobs: Vec<(JobId, JobStatus)>,
}

impl RunSummary {
    /// True when every launched job ended `Done`.
    pub fn all_done(&self) -> bool {
        self.jobs
            .iter()
            .all(|(_, status)| matches!(status, JobStatus::Done { .. }))
    }
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - job file loading and job selection
/// - the engine (queue, worker, process supervision)
/// - Ctrl-C and optional stdin control
/// - printing of the live log and the final summary
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading job file {}", config_path.display()))?;

    let selected = select_jobs(&cfg, &args)?;
    info!(count = selected.len(), "jobs selected");

    if args.dry_run {
        print_dry_run(&cfg, &selected);
        return Ok(RunSummary {
            end: None,
            jobs: Vec::new(),
        });
    }

    if selected.is_empty() {
        println!("No jobs to run.");
        return Ok(RunSummary {
            end: None,
            jobs: Vec::new(),
        });
    }

    let (engine, mut events) = Engine::new(EngineOptions::from_config(&cfg.config));

    println!("== Launch {} job(s) ==", selected.len());
    for job in &selected {
        engine.enqueue(JobDescriptor::from_config(job, &cfg.config));
    }

    // Ctrl-C → stop everything.
    {
        let engine = engine.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                info!("Ctrl+C received");
                engine.cancel_all();
            }
        });
    }

    if args.interactive {
        spawn_stdin_control(engine.clone());
    }

    let mut board = StatusBoard::new();
    let mut end = None;
    while let Some(event) = events.recv().await {
        board.apply(&event);
        match event {
            EngineEvent::Log(line) => println!("{line}"),
            EngineEvent::Status { job, state } => {
                debug!(job = %job, status = %state.status, "status update");
            }
            EngineEvent::QueueFinished(queue_end) => {
                end = Some(queue_end);
                break;
            }
        }
    }

    engine.shutdown().await;

    let summary = RunSummary {
        end,
        jobs: board
            .iter()
            .map(|(id, state)| (id.clone(), state.status.clone()))
            .collect(),
    };
    print_summary(&summary);
    Ok(summary)
}

/// Pick the jobs to launch, in job-file order.
///
/// - `--job NAME ...`: exactly those jobs, enabled or not
/// - `--all`: every job
/// - otherwise: enabled jobs only
fn select_jobs<'a>(cfg: &'a ConfigFile, args: &CliArgs) -> Result<Vec<&'a JobConfig>, RenderqError> {
    if !args.jobs.is_empty() {
        if let Some(missing) = args.jobs.iter().find(|name| cfg.find_job(name).is_none()) {
            return Err(RenderqError::UnknownJob(missing.clone()));
        }
        return Ok(cfg
            .job
            .iter()
            .filter(|job| args.jobs.contains(&job.name))
            .collect());
    }

    Ok(cfg
        .job
        .iter()
        .filter(|job| args.all || job.enabled)
        .collect())
}

/// `skip` cancels the current job, `stop` cancels the queue.
fn spawn_stdin_control(engine: Engine) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match line.trim() {
                    "" => {}
                    "skip" => {
                        engine.cancel_current();
                    }
                    "stop" => engine.cancel_all(),
                    other => eprintln!("unknown command {other:?} (expected `skip` or `stop`)"),
                },
                Ok(None) => {
                    debug!("stdin closed; interactive control off");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "reading stdin failed; interactive control off");
                    return;
                }
            }
        }
    });
}

fn print_dry_run(cfg: &ConfigFile, selected: &[&JobConfig]) {
    println!("renderq dry-run");
    println!("  config.logs_dir = {}", cfg.config.logs_dir);
    println!();

    println!("jobs ({} of {}):", selected.len(), cfg.job.len());
    for job in selected {
        let descriptor = JobDescriptor::from_config(job, &cfg.config);
        println!("  - {}", job.name);
        println!("      cmd: {}", descriptor.command_line());
        println!(
            "      retries: {}  fail_policy: {}  kill_timeout_s: {}",
            descriptor.retry_limit,
            descriptor.fail_policy,
            descriptor.kill_timeout.as_secs()
        );
        if !job.enabled {
            println!("      enabled: false");
        }
        if !job.notes.is_empty() {
            println!("      notes: {}", job.notes);
        }
        if let Err(reason) = descriptor.validate() {
            println!("      incomplete: {reason} (will be skipped)");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("== Summary ==");
    for (id, status) in &summary.jobs {
        println!("  {:<24} {status}", id.as_str());
    }
}
