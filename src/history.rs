use std::{
    fmt,
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    host::Host,
    interpreter::{Interpreter, InterpreterConfig, StopHandle},
    output::OutputEvent,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success => f.write_str("success"),
            RunStatus::Error => f.write_str("error"),
        }
    }
}

/// Summary of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub file: String,
    /// Milliseconds since the Unix epoch at the start of the run.
    pub timestamp: u64,
    /// Wall-clock seconds.
    pub duration: f64,
    pub status: RunStatus,
    pub exit_code: i32,
    pub output_lines: Vec<String>,
}

impl RunRecord {
    pub fn new(
        file: impl Into<String>,
        timestamp: u64,
        duration: f64,
        exit_code: i32,
        events: &[OutputEvent],
    ) -> Self {
        let failed = exit_code != 0 || events.iter().any(OutputEvent::is_error);
        Self {
            file: file.into(),
            timestamp,
            duration,
            status: if failed {
                RunStatus::Error
            } else {
                RunStatus::Success
            },
            exit_code,
            output_lines: events.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Most recent runs first, capped at `limit`.
#[derive(Debug, Clone)]
pub struct RunHistory {
    records: Vec<RunRecord>,
    limit: usize,
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::with_limit(50)
    }
}

impl RunHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            records: Vec::new(),
            limit,
        }
    }

    pub fn push(&mut self, record: RunRecord) {
        self.records.insert(0, record);
        self.records.truncate(self.limit);
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&RunRecord> {
        self.records.first()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Runs `source`, forwarding each event to `sink` as it arrives, and
/// returns the record of the run.
///
/// Calling `stop` on a clone of `stop` from another task cancels the run.
pub async fn run_recorded<F>(
    file: &str,
    source: &str,
    host: Arc<dyn Host>,
    config: InterpreterConfig,
    stop: StopHandle,
    mut sink: F,
) -> RunRecord
where
    F: FnMut(&OutputEvent),
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut interpreter = Interpreter::new(host, tx)
        .with_config(config)
        .with_stop_handle(stop);
    let timestamp = now_millis();
    let started = Instant::now();

    let mut events = Vec::new();
    let exit_code = {
        let run = interpreter.execute(source);
        tokio::pin!(run);
        loop {
            tokio::select! {
                code = &mut run => break code,
                Some(event) = rx.recv() => {
                    sink(&event);
                    events.push(event);
                }
            }
        }
    };
    drop(interpreter);
    while let Some(event) = rx.recv().await {
        sink(&event);
        events.push(event);
    }

    let duration = started.elapsed().as_secs_f64();
    tracing::info!(file, exit_code, duration, "run recorded");
    RunRecord::new(file, timestamp, duration, exit_code, &events)
}
