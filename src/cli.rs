// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `renderq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "renderq",
    version,
    about = "Run a queue of render jobs as external processes, with retries and cancellation.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the job file (TOML).
    ///
    /// Default: `Renderq.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Renderq.toml")]
    pub config: String,

    /// Run only the named job(s), in job-file order. May be repeated.
    ///
    /// Selected jobs run even when they are disabled in the job file.
    #[arg(long = "job", value_name = "NAME")]
    pub jobs: Vec<String>,

    /// Also run jobs marked `enabled = false`.
    #[arg(long, conflicts_with = "jobs")]
    pub all: bool,

    /// Read `skip` / `stop` commands from stdin while the queue runs.
    ///
    /// `skip` cancels the current job, `stop` cancels the whole queue.
    #[arg(long)]
    pub interactive: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RENDERQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the resolved commands, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
