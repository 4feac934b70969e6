// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`process`] owns a single OS process: spawn, merged output, wait,
//!   terminate-then-kill.
//! - [`progress`] turns an output line into an optional percentage.
//! - [`log_file`] writes the per-attempt log file.
//! - [`attempt`] supervises one attempt end to end and reports how it ended.

pub mod attempt;
pub mod log_file;
pub mod process;
pub mod progress;

pub use attempt::{AttemptContext, AttemptReport, run_attempt};
pub use process::{LineStream, ProcessHandle, StartError};
