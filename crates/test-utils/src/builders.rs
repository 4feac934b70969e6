#![allow(dead_code)]

use std::time::Duration;

use renderq::config::{ConfigFile, ConfigSection, JobConfig, RawConfigFile};
use renderq::engine::JobDescriptor;
use renderq::types::FailPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                job: Vec::new(),
            },
        }
    }

    pub fn program(mut self, program: &str) -> Self {
        self.config.config.program = program.to_string();
        self
    }

    pub fn extra_arg(mut self, arg: &str) -> Self {
        self.config.config.extra_args.push(arg.to_string());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.config.config.retries = retries;
        self
    }

    pub fn fail_policy(mut self, policy: FailPolicy) -> Self {
        self.config.config.fail_policy = policy;
        self
    }

    pub fn with_job(mut self, job: JobConfig) -> Self {
        self.config.job.push(job);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            job: JobConfig {
                name: name.to_string(),
                args: Vec::new(),
                enabled: true,
                notes: String::new(),
                program: None,
                retries: None,
                fail_policy: None,
                kill_timeout_s: None,
            },
        }
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.job.args.push(arg.to_string());
        self
    }

    pub fn enabled(mut self, val: bool) -> Self {
        self.job.enabled = val;
        self
    }

    pub fn program(mut self, program: &str) -> Self {
        self.job.program = Some(program.to_string());
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.job.retries = Some(retries);
        self
    }

    pub fn fail_policy(mut self, policy: FailPolicy) -> Self {
        self.job.fail_policy = Some(policy);
        self
    }

    pub fn kill_timeout_s(mut self, secs: u64) -> Self {
        self.job.kill_timeout_s = Some(secs);
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for `JobDescriptor` running a `sh -c` script.
pub struct DescriptorBuilder {
    job: JobDescriptor,
}

impl DescriptorBuilder {
    pub fn sh(name: &str, script: &str) -> Self {
        Self::command(name, crate::scripts::sh(script))
    }

    pub fn command(name: &str, command: Vec<String>) -> Self {
        Self {
            job: JobDescriptor::new(name, name, command),
        }
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.job.retry_limit = retries;
        self
    }

    pub fn fail_policy(mut self, policy: FailPolicy) -> Self {
        self.job.fail_policy = policy;
        self
    }

    pub fn kill_timeout(mut self, timeout: Duration) -> Self {
        self.job.kill_timeout = timeout;
        self
    }

    pub fn build(self) -> JobDescriptor {
        self.job
    }
}
