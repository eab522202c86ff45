use std::{
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;

use super::{Authority, HostError, HostResult};
use crate::{
    checker::CheckResult,
    diagnostics::{Diagnostic, Severity},
};

/// Defers to a standalone Geneia compiler run in `--check` mode, which
/// prints a JSON `{"valid": .., "errors": [..]}` document on stdout.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    path: Option<PathBuf>,
    timeout: Duration,
}

impl ExternalCompiler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            timeout: Duration::from_secs(5),
        }
    }

    /// Uses the first candidate that exists on disk, or none at all.
    pub fn discover<I, P>(candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let path = candidates
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .find(|p| p.exists());
        Self {
            path,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl Authority for ExternalCompiler {
    #[tracing::instrument(level = "debug", skip(self, source), fields(source_len = source.len()))]
    async fn check(&self, source: &str, filename: Option<&str>) -> HostResult<CheckResult> {
        let compiler = match &self.path {
            Some(path) if path.exists() => path,
            _ => return Err(HostError::Unavailable),
        };

        let file = write_source(source.to_owned()).await?;

        let run = Command::new(compiler)
            .arg("--check")
            .arg(file.path())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| HostError::Timeout(self.timeout.as_millis() as u64))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        Ok(interpret_output(
            stdout.trim(),
            stderr.trim(),
            output.status.success(),
        ))
    }
}

/// Writes `source` to a temp file off the async runtime. The file is
/// removed when the returned handle drops.
async fn write_source(source: String) -> HostResult<NamedTempFile> {
    let written = tokio::task::spawn_blocking(move || -> std::io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("geneia_check_")
            .suffix(".gn")
            .tempfile()?;
        file.write_all(source.as_bytes())?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|err| HostError::Failed(err.to_string()))?;
    Ok(written?)
}

fn interpret_output(stdout: &str, stderr: &str, success: bool) -> CheckResult {
    if stdout.is_empty() && success && stderr.is_empty() {
        return CheckResult::default();
    }
    match serde_json::from_str::<CheckResult>(stdout) {
        Ok(result) => result,
        Err(_) if !success || !stderr.is_empty() => {
            let message = if stderr.is_empty() {
                "Unknown compiler error".to_string()
            } else {
                stderr.to_string()
            };
            CheckResult {
                valid: false,
                diagnostics: vec![Diagnostic {
                    line: 1,
                    column: 1,
                    message,
                    severity: Severity::Error,
                    code: "E000".to_string(),
                }],
            }
        }
        Err(_) => CheckResult::default(),
    }
}
