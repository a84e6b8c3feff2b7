use super::{ClusterState, RetryPolicy};
use crate::config::ClusterSettings;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::identity::{IdentityContext, Scope};
use std::time::Duration;

const STATUS_TIMEOUT: Duration = Duration::from_secs(30);
const START_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const STOP_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Start/stop/status against the local minikube cluster.
pub struct ClusterManager<'a> {
    runner: &'a dyn CommandRunner,
    identity: &'a IdentityContext,
    settings: &'a ClusterSettings,
    policy: RetryPolicy,
}

impl<'a> ClusterManager<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        identity: &'a IdentityContext,
        settings: &'a ClusterSettings,
    ) -> Self {
        Self {
            runner,
            identity,
            settings,
            policy: settings.retry_policy(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn minikube(&self, args: &[&str]) -> CommandSpec {
        let cmd = CommandSpec::new("minikube")
            .args(args.iter().copied())
            .args(["-p", self.settings.profile.as_str()]);
        self.identity.prepare(Scope::User, cmd)
    }

    /// Read-only query of the runtime.
    ///
    /// `minikube status` exits non-zero for stopped clusters while still
    /// printing the host state, so stdout is parsed regardless of exit code.
    /// When elevated the call runs behind `sudo ... env`, which reports a
    /// missing minikube as exit 127 rather than a spawn failure.
    pub async fn status(&self) -> ClusterState {
        let cmd = self
            .minikube(&["status", "--format", "{{.Host}}"])
            .timeout(STATUS_TIMEOUT);
        match self.runner.run(&cmd).await {
            Ok(out) if out.program_missing() => ClusterState::Absent,
            Ok(out) => {
                let state = out
                    .first_line()
                    .map(ClusterState::from_host_status)
                    .unwrap_or(ClusterState::Unknown);
                if state == ClusterState::Unknown
                    && out.combined().to_lowercase().contains("not found")
                {
                    // Profile never created: the runtime is there, the cluster is not running.
                    return ClusterState::Stopped;
                }
                state
            }
            Err(e) if e.is_not_found() => ClusterState::Absent,
            Err(e) => {
                tracing::warn!("Cluster status query failed: {}", e);
                ClusterState::Unknown
            }
        }
    }

    /// Bring the cluster to Running.
    ///
    /// A cluster that is already running is left alone. Otherwise start is
    /// attempted up to `max_attempts` times with a fixed `backoff` between
    /// attempts. A missing runtime is never retried.
    pub async fn start(&self) -> Result<ClusterState> {
        match self.status().await {
            ClusterState::Running => {
                tracing::info!("Cluster '{}' already running", self.settings.profile);
                return Ok(ClusterState::Running);
            }
            ClusterState::Absent => return Err(runtime_missing()),
            _ => {}
        }

        let driver = format!("--driver={}", self.settings.driver);
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            tracing::info!(
                "Starting cluster '{}' (attempt {}/{})",
                self.settings.profile,
                attempt,
                max_attempts
            );
            let cmd = self.minikube(&["start", &driver]).timeout(START_TIMEOUT);
            match self.runner.run(&cmd).await {
                Ok(out) if out.success() => {
                    if attempt > 1 {
                        tracing::info!("Cluster started after {} attempts", attempt);
                    }
                    self.after_start().await;
                    return Ok(ClusterState::Running);
                }
                Ok(out) if out.program_missing() => return Err(runtime_missing()),
                Ok(out) => last_error = out.combined(),
                Err(e) if e.is_not_found() => return Err(runtime_missing()),
                Err(e) => last_error = e.to_string(),
            }

            if attempt < max_attempts {
                tracing::warn!(
                    "Cluster start attempt {}/{} failed, retrying in {:?}",
                    attempt,
                    max_attempts,
                    self.policy.backoff
                );
                tokio::time::sleep(self.policy.backoff).await;
            }
        }

        Err(Error::ClusterStartFailed {
            attempts: max_attempts,
            last_error: last_line(&last_error),
        })
    }

    /// Single best-effort stop; failure is surfaced.
    pub async fn stop(&self) -> Result<()> {
        let cmd = self.minikube(&["stop"]).timeout(STOP_TIMEOUT);
        let out = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| Error::ClusterStopFailed(e.to_string()))?;
        if out.success() {
            tracing::info!("Cluster '{}' stopped", self.settings.profile);
            Ok(())
        } else {
            Err(Error::ClusterStopFailed(out.combined()))
        }
    }

    /// Addons and kubectl context. Failures here never fail the start.
    async fn after_start(&self) {
        for addon in &self.settings.addons {
            let cmd = self.minikube(&["addons", "enable", addon.as_str()]);
            match self.runner.run_success(&cmd).await {
                Ok(_) => tracing::info!("Enabled addon '{}'", addon),
                Err(e) => tracing::warn!("Failed to enable addon '{}': {}", addon, e),
            }
        }

        let cmd = self.identity.prepare(
            Scope::User,
            CommandSpec::new("kubectl").args([
                "config",
                "use-context",
                self.settings.profile.as_str(),
            ]),
        );
        if let Err(e) = self.runner.run_success(&cmd).await {
            tracing::warn!("Failed to switch kubectl context: {}", e);
        }
    }
}

fn runtime_missing() -> Error {
    Error::ClusterRuntimeMissing {
        program: "minikube".to_string(),
    }
}

fn last_line(output: &str) -> String {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
        .to_string()
}
