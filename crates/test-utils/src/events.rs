//! Collecting engine events in tests.

use std::time::Duration;

use renderq::engine::{EngineEvent, EventStream, JobStatus, QueueEnd, StatusBoard};

/// Records everything that arrives on an [`EventStream`].
pub struct Recorder {
    stream: EventStream,
    pub events: Vec<EngineEvent>,
    pub board: StatusBoard,
}

impl Recorder {
    pub fn new(stream: EventStream) -> Self {
        Self {
            stream,
            events: Vec::new(),
            board: StatusBoard::new(),
        }
    }

    /// Receive events until `pred` matches one (returned) or the stream ends.
    pub async fn until<F>(&mut self, mut pred: F) -> Option<EngineEvent>
    where
        F: FnMut(&EngineEvent) -> bool,
    {
        while let Some(event) = self.stream.recv().await {
            self.board.apply(&event);
            self.events.push(event.clone());
            if pred(&event) {
                return Some(event);
            }
        }
        None
    }

    /// Wait for the next `QueueFinished`.
    pub async fn until_finished(&mut self) -> Option<QueueEnd> {
        match self
            .until(|e| matches!(e, EngineEvent::QueueFinished(_)))
            .await
        {
            Some(EngineEvent::QueueFinished(end)) => Some(end),
            _ => None,
        }
    }

    /// Wait until `job` reports a status matching `pred`.
    pub async fn until_status<F>(&mut self, job: &str, mut pred: F) -> Option<JobStatus>
    where
        F: FnMut(&JobStatus) -> bool,
    {
        match self
            .until(|e| matches!(e, EngineEvent::Status { job: id, state } if id.as_str() == job && pred(&state.status)))
            .await
        {
            Some(EngineEvent::Status { state, .. }) => Some(state.status),
            _ => None,
        }
    }

    /// Wait until a log line containing `needle` arrives.
    pub async fn until_log(&mut self, needle: &str) -> Option<String> {
        match self
            .until(|e| matches!(e, EngineEvent::Log(line) if line.contains(needle)))
            .await
        {
            Some(EngineEvent::Log(line)) => Some(line),
            _ => None,
        }
    }

    /// Wait until a log line exactly equal to `line` arrives (process output).
    pub async fn until_line(&mut self, line: &str) -> bool {
        self.until(|e| matches!(e, EngineEvent::Log(l) if l == line))
            .await
            .is_some()
    }

    /// Pick up anything that arrives within `quiet`.
    pub async fn settle(&mut self, quiet: Duration) {
        while let Ok(Some(event)) = tokio::time::timeout(quiet, self.stream.recv()).await {
            self.board.apply(&event);
            self.events.push(event);
        }
    }

    pub fn status_of(&self, job: &str) -> Option<&JobStatus> {
        self.board.status(job)
    }

    pub fn logs(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::Log(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of "Start (try ...)" lines logged for a job display name.
    pub fn attempts_started(&self, display_name: &str) -> usize {
        let marker = format!("] {display_name} Start (try ");
        self.logs()
            .iter()
            .filter(|line| line.contains(&marker))
            .count()
    }
}
