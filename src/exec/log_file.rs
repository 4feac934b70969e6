// src/exec/log_file.rs

//! Append-only log file for one attempt.
//!
//! Layout:
//!
//! ```text
//! CMD: <invocation>
//! START: <timestamp>
//! <raw process output>
//! END: <timestamp>
//! EXIT: <code>
//! ```
//!
//! Writing is best effort: the first I/O error is logged and the file is
//! abandoned, the attempt itself carries on.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct AttemptLog {
    path: PathBuf,
    file: Option<File>,
}

impl AttemptLog {
    /// Open (or append to) the log file for an attempt starting at `started_at`.
    pub async fn open(logs_dir: &Path, display_name: &str, started_at: DateTime<Local>) -> Self {
        let path = logs_dir.join(log_file_name(display_name, started_at));
        let file = match open_append(logs_dir, &path).await {
            Ok(file) => {
                debug!(path = %path.display(), "opened attempt log");
                Some(file)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not open attempt log; output will only be forwarded live"
                );
                None
            }
        };
        Self { path, file }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether output is still being written to disk.
    pub fn is_writable(&self) -> bool {
        self.file.is_some()
    }

    pub async fn write_header(&mut self, command_line: &str, started_at: DateTime<Local>) {
        self.write_line(&format!("CMD: {command_line}")).await;
        self.write_line(&format!("START: {}", timestamp(started_at))).await;
    }

    pub async fn write_line(&mut self, line: &str) {
        let Some(file) = self.file.as_mut() else {
            return;
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        if let Err(e) = file.write_all(buf.as_bytes()).await {
            warn!(
                path = %self.path.display(),
                error = %e,
                "writing attempt log failed; further output is not persisted"
            );
            self.file = None;
        }
    }

    /// Write the trailer and flush. `exit_code` is `None` when the process
    /// never started.
    pub async fn finish(&mut self, ended_at: DateTime<Local>, exit_code: Option<i32>) {
        self.write_line(&format!("END: {}", timestamp(ended_at))).await;
        match exit_code {
            Some(code) => self.write_line(&format!("EXIT: {code}")).await,
            None => self.write_line("EXIT: not started").await,
        }

        if let Some(mut file) = self.file.take() {
            if let Err(e) = file.flush().await {
                warn!(path = %self.path.display(), error = %e, "flushing attempt log failed");
            }
        }
    }
}

async fn open_append(logs_dir: &Path, path: &Path) -> std::io::Result<File> {
    fs::create_dir_all(logs_dir).await?;
    OpenOptions::new().create(true).append(true).open(path).await
}

/// `<YYYYmmdd_HHMMSS>_<name>.log`, with the name reduced to file-safe
/// characters.
pub fn log_file_name(display_name: &str, started_at: DateTime<Local>) -> String {
    format!(
        "{}_{}.log",
        started_at.format("%Y%m%d_%H%M%S"),
        sanitize_file_stem(display_name)
    )
}

fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        "job".to_string()
    } else {
        cleaned.to_string()
    }
}

fn timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}
