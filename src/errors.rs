// src/errors.rs

//! Errors raised while reading the job file and selecting jobs.
//!
//! Process-level failures never surface here: a job that cannot start or
//! exits non-zero is reported through its status, not as an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderqError {
    /// The job file parsed but breaks a rule (no jobs, duplicate names ...).
    #[error("Invalid job file: {0}")]
    ConfigError(String),

    #[error("Cannot read job file: {0}")]
    IoError(#[from] std::io::Error),

    /// `--job NAME` named a job that is not in the file.
    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Malformed job file: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RenderqError>;
