// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::FailPolicy;

/// Job file exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// program = "/opt/tool/render-cmd"
/// extra_args = ["-log"]
/// retries = 1
/// fail_policy = "retry_then_next"
/// kill_timeout_s = 10
///
/// [[job]]
/// name = "shot_010"
/// args = ["Project.uproject", "/Game/Maps/Main"]
/// ```
///
/// All sections are optional at this level; [`ConfigFile`] is the validated
/// form the rest of the crate works with.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Queue-wide defaults from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Jobs from `[[job]]`, in file order.
    #[serde(default)]
    pub job: Vec<JobConfig>,
}

/// Validated job file. Construct it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub job: Vec<JobConfig>,
}

impl ConfigFile {
    /// Build without validation. Only `TryFrom<RawConfigFile>` calls this.
    pub(crate) fn new_unchecked(config: ConfigSection, job: Vec<JobConfig>) -> Self {
        Self { config, job }
    }

    pub fn find_job(&self, name: &str) -> Option<&JobConfig> {
        self.job.iter().find(|j| j.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Executable used for jobs that don't name their own `program`.
    #[serde(default)]
    pub program: String,

    /// Free-form arguments appended to every job's command line.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Additional attempts after a failed first attempt.
    #[serde(default)]
    pub retries: u32,

    #[serde(default)]
    pub fail_policy: FailPolicy,

    /// Seconds between the terminate signal and the forced kill on cancel.
    #[serde(default = "default_kill_timeout_s")]
    pub kill_timeout_s: u64,

    /// Directory (relative to the working directory) for per-attempt logs.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

fn default_kill_timeout_s() -> u64 {
    10
}

fn default_logs_dir() -> String {
    "render_logs".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            program: String::new(),
            extra_args: Vec::new(),
            retries: 0,
            fail_policy: FailPolicy::default(),
            kill_timeout_s: default_kill_timeout_s(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// One `[[job]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Display identity; also used for log file names and `--job` selection.
    pub name: String,

    /// Arguments passed after the program.
    #[serde(default)]
    pub args: Vec<String>,

    /// Disabled jobs only run with `--all` or when selected by name.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub notes: String,

    /// Per-job overrides of the `[config]` values.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub fail_policy: Option<FailPolicy>,
    #[serde(default)]
    pub kill_timeout_s: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl JobConfig {
    pub fn effective_program<'a>(&'a self, defaults: &'a ConfigSection) -> &'a str {
        self.program.as_deref().unwrap_or(&defaults.program)
    }

    pub fn effective_retries(&self, defaults: &ConfigSection) -> u32 {
        self.retries.unwrap_or(defaults.retries)
    }

    pub fn effective_fail_policy(&self, defaults: &ConfigSection) -> FailPolicy {
        self.fail_policy.unwrap_or(defaults.fail_policy)
    }

    pub fn effective_kill_timeout(&self, defaults: &ConfigSection) -> Duration {
        Duration::from_secs(self.kill_timeout_s.unwrap_or(defaults.kill_timeout_s))
    }

    /// Full command line: program, job arguments, then the queue-wide extras.
    pub fn command(&self, defaults: &ConfigSection) -> Vec<String> {
        let mut cmd = Vec::with_capacity(1 + self.args.len() + defaults.extra_args.len());
        cmd.push(self.effective_program(defaults).trim().to_string());
        cmd.extend(self.args.iter().cloned());
        cmd.extend(defaults.extra_args.iter().cloned());
        cmd
    }
}
