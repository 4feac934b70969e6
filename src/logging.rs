// src/logging.rs

//! Diagnostics for `renderq` itself, on stderr.
//!
//! stdout is reserved for the queue's log stream (process output and control
//! lines); everything traced here goes to stderr so the two never mix.
//!
//! The filter comes from `--log-level` when given. Otherwise `RENDERQ_LOG` is
//! read as an `EnvFilter` directive (`debug`, `renderq::exec=trace,warn`, ...),
//! falling back to `info` when unset or unparsable.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable consulted when no `--log-level` is given.
pub const LOG_ENV: &str = "RENDERQ_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(directive(level)),
        None => filter_from_env(std::env::var(LOG_ENV).ok().as_deref()),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn filter_from_env(value: Option<&str>) -> EnvFilter {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn cli_levels_map_to_directives() {
        assert_eq!(directive(LogLevel::Warn), "warn");
        assert_eq!(directive(LogLevel::Trace), "trace");
    }

    #[test]
    fn env_value_accepts_per_module_directives() {
        let filter = filter_from_env(Some("renderq::exec=trace,warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn missing_or_invalid_env_value_falls_back_to_info() {
        let info = Some(LevelFilter::INFO);
        assert_eq!(filter_from_env(None).max_level_hint(), info);
        assert_eq!(filter_from_env(Some("   ")).max_level_hint(), info);
        assert_eq!(filter_from_env(Some("renderq=loud")).max_level_hint(), info);
    }
}
