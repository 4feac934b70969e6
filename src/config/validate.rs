// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RenderqError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RenderqError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.job))
    }
}

// Incomplete commands (no program, blank arguments) are deliberately not
// rejected here; the worker skips those jobs with a log line.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_job_names(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(RenderqError::ConfigError(
            "job file must contain at least one [[job]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.logs_dir.trim().is_empty() {
        return Err(RenderqError::ConfigError(
            "[config].logs_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_job_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, job) in cfg.job.iter().enumerate() {
        if job.name.trim().is_empty() {
            return Err(RenderqError::ConfigError(format!(
                "job #{} has an empty `name`",
                idx + 1
            )));
        }
        if !seen.insert(job.name.as_str()) {
            return Err(RenderqError::ConfigError(format!(
                "duplicate job name '{}'",
                job.name
            )));
        }
    }
    Ok(())
}
