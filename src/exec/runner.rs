//! Process runner.
//!
//! All external interactions go through [`CommandRunner`], which provides
//! consistent timeout handling, error mapping to [`ExecError`] and a single
//! point where `tokio::process::Command` is constructed.

use super::{CommandOutput, CommandSpec, ExecError, StdioMode};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;

/// Default ceiling for captured commands. Package installs and cluster
/// starts override this per command.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion. A non-zero exit is *not* an error here;
    /// only failure to launch or a timeout is.
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError>;

    /// Run a command, returning output only if it exited 0.
    async fn run_success(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let output = self.run(cmd).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::from_output(cmd, &output))
        }
    }
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    default_timeout: Duration,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self {
            default_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
        tracing::debug!(command = %cmd, "running");

        let mut command = tokio::process::Command::new(&cmd.program);
        command.args(&cmd.args).envs(&cmd.env).kill_on_drop(true);
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }

        match cmd.stdio {
            StdioMode::Captured => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
                let timeout = cmd.timeout.unwrap_or(self.default_timeout);
                let result = tokio::time::timeout(timeout, command.output()).await;
                match result {
                    Ok(Ok(output)) => Ok(CommandOutput {
                        exit_code: output.status.code(),
                        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    }),
                    Ok(Err(e)) => Err(ExecError::from_spawn(cmd, e)),
                    Err(_) => Err(ExecError::timed_out(cmd, timeout)),
                }
            }
            StdioMode::Inherited => {
                // Interactive tools (cargo run, docker build) own the terminal
                // and run until they exit; no timeout is applied.
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
                let status = command
                    .status()
                    .await
                    .map_err(|e| ExecError::from_spawn(cmd, e))?;
                Ok(CommandOutput {
                    exit_code: status.code(),
                    ..CommandOutput::default()
                })
            }
        }
    }
}
