use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::process::Command;

use super::{Host, HostError, HostResult, PackageStep, ShellOutput};
use crate::package;

/// Host backed by the local machine: commands go through the platform
/// shell and package files are read from disk.
#[derive(Debug, Clone)]
pub struct LocalHost {
    command_timeout: Duration,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl LocalHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }

    async fn spawn(&self, command: &str) -> HostResult<ShellOutput> {
        let mut cmd = Self::shell_command(command);
        cmd.kill_on_drop(true);
        let output = tokio::time::timeout(self.command_timeout, cmd.output())
            .await
            .map_err(|_| HostError::Timeout(self.command_timeout.as_millis() as u64))??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::debug!(command, status = %output.status, "shell command finished");

        if output.status.success() {
            let text = if stdout.is_empty() { stderr } else { stdout };
            Ok(ShellOutput::ok(text))
        } else {
            let text = if stderr.is_empty() {
                format!("Command failed: {}", output.status)
            } else {
                stderr
            };
            Ok(ShellOutput::failed(text))
        }
    }
}

#[async_trait]
impl Host for LocalHost {
    #[tracing::instrument(level = "debug", skip(self))]
    async fn shell(&self, command: &str) -> HostResult<ShellOutput> {
        match self.spawn(command).await {
            Ok(output) => Ok(output),
            // A command that could not start or ran too long is still a
            // failed command from the script's point of view.
            Err(err) => Ok(ShellOutput::failed(err.to_string())),
        }
    }

    async fn load_config(&self, path: &str) -> HostResult<IndexMap<String, String>> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(package::parse_config(&content))
    }

    async fn pack(&self, config_path: &str, output_path: &str) -> HostResult<()> {
        if config_path == output_path {
            return Err(HostError::Failed(format!(
                "output would overwrite {config_path}"
            )));
        }
        let content = tokio::fs::read_to_string(config_path).await?;
        let commands = package::parse_config(&content);
        tokio::fs::write(output_path, package::encode_package(&commands)).await?;
        Ok(())
    }

    async fn run_package(&self, path: &str) -> HostResult<Vec<PackageStep>> {
        let content = tokio::fs::read_to_string(path).await?;
        let commands =
            package::decode_package(&content).map_err(|err| HostError::Failed(err.to_string()))?;

        let mut steps = Vec::with_capacity(commands.len());
        for (name, body) in commands {
            let output = match self.spawn(&body).await {
                Ok(result) => result.output,
                Err(err) => err.to_string(),
            };
            steps.push(PackageStep { name, output });
        }
        Ok(steps)
    }
}
