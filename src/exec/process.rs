// src/exec/process.rs

//! Lifecycle of one external process: spawn, merged output, exit, cancel.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The process could not be launched at all.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("command line is empty")]
    EmptyCommand,

    #[error("failed to set up the output pipe: {0}")]
    Pipe(#[source] io::Error),

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Exit code reported when the OS gives none (e.g. killed by a signal).
pub const NO_EXIT_CODE: i32 = -1;

/// Owns exactly one running (or exited) OS process.
///
/// The child is killed if the handle is dropped while still running.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    lines: Option<LineStream>,
    exit_code: Option<i32>,
}

impl ProcessHandle {
    /// Spawn `command[0]` with the remaining elements as arguments.
    ///
    /// stdout and stderr share one pipe, so the [`LineStream`] (available
    /// through [`ProcessHandle::take_lines`]) keeps the order in which the
    /// process wrote to either of them.
    pub fn start(command: &[String]) -> Result<Self, StartError> {
        let (program, args) = command.split_first().ok_or(StartError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(StartError::EmptyCommand);
        }

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let (tx, rx) = mpsc::unbounded_channel();
        let child = spawn_merged(cmd, program, tx)?;

        let pid = child.id();
        debug!(?pid, program = %program, "process spawned");

        Ok(Self {
            child,
            pid,
            lines: Some(LineStream { rx }),
            exit_code: None,
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Take the merged output stream. Returns `None` after the first call.
    pub fn take_lines(&mut self) -> Option<LineStream> {
        self.lines.take()
    }

    /// Wait for the process to exit and return its exit code.
    ///
    /// Cancel safe; calling it again after exit returns the cached code.
    pub async fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }
        let status = self.child.wait().await?;
        Ok(self.record_exit(status))
    }

    /// Exit code if the process has already exited, without blocking.
    pub fn try_exit_code(&mut self) -> io::Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => Ok(Some(self.record_exit(status))),
            None => Ok(None),
        }
    }

    /// Stop the process: terminate signal, up to `kill_timeout` of grace,
    /// then a forced kill. A zero timeout kills immediately.
    ///
    /// No-op returning the recorded code when the process already exited.
    pub async fn cancel(&mut self, kill_timeout: Duration) -> io::Result<i32> {
        if let Some(code) = self.try_exit_code()? {
            debug!(pid = ?self.pid, exit_code = code, "cancel on exited process; nothing to do");
            return Ok(code);
        }

        if kill_timeout.is_zero() {
            info!(pid = ?self.pid, "kill timeout is zero; force-killing process");
            return self.force_kill().await;
        }

        if let Err(e) = self.terminate() {
            warn!(
                pid = ?self.pid,
                error = %e,
                "terminate signal could not be delivered; force-killing process"
            );
            return self.force_kill().await;
        }

        match tokio::time::timeout(kill_timeout, self.wait()).await {
            Ok(res) => res,
            Err(_) => {
                warn!(
                    pid = ?self.pid,
                    timeout_s = kill_timeout.as_secs_f64(),
                    "process ignored terminate within kill timeout; force-killing"
                );
                self.force_kill().await
            }
        }
    }

    async fn force_kill(&mut self) -> io::Result<i32> {
        if let Err(e) = self.child.start_kill() {
            // Usually means the process exited between the check and the kill.
            debug!(pid = ?self.pid, error = %e, "force kill failed");
        }
        self.wait().await
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> io::Result<()> {
        let pid = self
            .pid
            .ok_or_else(|| io::Error::other("process id unavailable"))?;
        let pid = libc::pid_t::try_from(pid)
            .map_err(|_| io::Error::other("process id out of range"))?;

        // SAFETY: plain syscall on a pid we spawned and have not reaped yet
        // (checked by the caller through `try_exit_code`).
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc == 0 {
            debug!(pid, "sent SIGTERM");
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> io::Result<()> {
        // No cooperative signal to send; the forced kill is the terminate.
        self.child.start_kill()
    }

    fn record_exit(&mut self, status: ExitStatus) -> i32 {
        let code = status.code().unwrap_or(NO_EXIT_CODE);
        self.exit_code = Some(code);
        code
    }
}

/// Combined stdout + stderr of one process, line by line.
///
/// Finite: ends once every writer of the shared pipe (the process and any
/// children it left behind) has closed it. Lines come in the order the
/// process wrote them. Invalid UTF-8 is replaced rather than ending the
/// stream.
#[derive(Debug)]
pub struct LineStream {
    rx: mpsc::UnboundedReceiver<io::Result<String>>,
}

impl LineStream {
    /// Next line, an I/O error from one of the pipes, or `None` at the end.
    pub async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.rx.recv().await
    }
}

#[cfg(unix)]
fn spawn_merged(
    mut cmd: Command,
    program: &str,
    tx: mpsc::UnboundedSender<io::Result<String>>,
) -> Result<Child, StartError> {
    use std::os::fd::OwnedFd;
    use tokio::net::unix::pipe;

    let (reader, writer) = io::pipe().map_err(StartError::Pipe)?;
    let stderr_writer = writer.try_clone().map_err(StartError::Pipe)?;
    cmd.stdout(writer).stderr(stderr_writer);

    let child = cmd.spawn().map_err(|source| StartError::Spawn {
        program: program.to_string(),
        source,
    })?;
    // Our copies of the write end must close, or the stream never ends.
    drop(cmd);

    let reader = pipe::Receiver::from_owned_fd(OwnedFd::from(reader)).map_err(StartError::Pipe)?;
    spawn_line_reader(reader, tx);
    Ok(child)
}

#[cfg(not(unix))]
fn spawn_merged(
    mut cmd: Command,
    program: &str,
    tx: mpsc::UnboundedSender<io::Result<String>>,
) -> Result<Child, StartError> {
    // Two pipes: relative order between stdout and stderr is not kept here.
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|source| StartError::Spawn {
        program: program.to_string(),
        source,
    })?;
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, tx);
    }
    Ok(child)
}

fn spawn_line_reader<R>(pipe: R, tx: mpsc::UnboundedSender<io::Result<String>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
}
