use super::compose::Compose;
use super::readiness::{wait_until_ready, ComposeExecProbe, PollPolicy, ReadinessProbe};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec, ExecError};
use crate::migrate::Migrator;
use std::time::Duration;

const UP_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const STOP_TIMEOUT: Duration = Duration::from_secs(60);
const VOLUME_TIMEOUT: Duration = Duration::from_secs(30);

/// A compose-managed backing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Compose service name.
    pub name: String,
    /// Named volume suffix; the full name is `<project>_<suffix>`.
    pub volume_suffix: String,
    /// Round-trip command run inside the container.
    pub ready_command: Vec<String>,
    /// Expected stdout of `ready_command`, when exit status alone is not enough.
    pub ready_output: Option<String>,
    /// Resetting this service wipes schema, so migrations must be re-applied.
    pub holds_schema: bool,
}

impl ServiceSpec {
    pub fn postgres() -> Self {
        Self {
            name: "postgres".to_string(),
            volume_suffix: "postgres_data".to_string(),
            ready_command: vec!["pg_isready".into(), "-U".into(), "postgres".into()],
            ready_output: None,
            holds_schema: true,
        }
    }

    pub fn redis() -> Self {
        Self {
            name: "redis".to_string(),
            volume_suffix: "redis_data".to_string(),
            ready_command: vec!["redis-cli".into(), "ping".into()],
            ready_output: Some("PONG".to_string()),
            holds_schema: false,
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![Self::postgres(), Self::redis()]
    }
}

/// Drives the service set through compose.
///
/// Every operation takes a list of service names; an empty list means the
/// whole set.
pub struct ServiceManager<'a> {
    runner: &'a dyn CommandRunner,
    compose: &'a Compose,
    services: Vec<ServiceSpec>,
    policy: PollPolicy,
    probe: Box<dyn ReadinessProbe + 'a>,
}

impl<'a> ServiceManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, compose: &'a Compose, policy: PollPolicy) -> Self {
        Self {
            runner,
            compose,
            services: ServiceSpec::defaults(),
            policy,
            probe: Box::new(ComposeExecProbe::new(runner, compose)),
        }
    }

    pub fn with_services(mut self, services: Vec<ServiceSpec>) -> Self {
        self.services = services;
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn ReadinessProbe + 'a>) -> Self {
        self.probe = probe;
        self
    }

    pub fn services(&self) -> &[ServiceSpec] {
        &self.services
    }

    fn select(&self, names: &[String]) -> Result<Vec<&ServiceSpec>> {
        if names.is_empty() {
            return Ok(self.services.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.services
                    .iter()
                    .find(|s| &s.name == name)
                    .ok_or_else(|| {
                        let known: Vec<&str> =
                            self.services.iter().map(|s| s.name.as_str()).collect();
                        Error::Config(format!(
                            "unknown service '{}' (known: {})",
                            name,
                            known.join(", ")
                        ))
                    })
            })
            .collect()
    }

    fn names(selected: &[&ServiceSpec]) -> Vec<String> {
        selected.iter().map(|s| s.name.clone()).collect()
    }

    /// `compose up -d`. Already-running services are left as they are.
    pub async fn up(&self, names: &[String]) -> Result<()> {
        let selected = Self::names(&self.select(names)?);
        tracing::info!("Starting services: {}", selected.join(", "));

        let cmd = self
            .compose
            .command(["up", "-d"])
            .args(selected.iter().map(String::as_str))
            .timeout(UP_TIMEOUT);
        let label = selected.join(", ");
        let out = self
            .runner
            .run(&cmd)
            .await
            .map_err(|e| Error::ServiceStartFailed(label.clone(), e.to_string()))?;
        if out.success() {
            Ok(())
        } else {
            Err(Error::ServiceStartFailed(label, out.combined()))
        }
    }

    /// `compose stop`. Stopping a stopped service is a no-op.
    pub async fn down(&self, names: &[String]) -> Result<()> {
        let selected = Self::names(&self.select(names)?);
        tracing::info!("Stopping services: {}", selected.join(", "));
        let cmd = self
            .compose
            .command(["stop"])
            .args(selected.iter().map(String::as_str))
            .timeout(STOP_TIMEOUT);
        self.runner.run_success(&cmd).await?;
        Ok(())
    }

    /// Settle, then poll each service. Timeouts come back as warnings.
    pub async fn wait_ready(&self, names: &[String]) -> Result<Vec<Error>> {
        let selected = self.select(names)?;
        if !self.policy.settle.is_zero() {
            tracing::debug!("Waiting {:?} for services to settle", self.policy.settle);
            tokio::time::sleep(self.policy.settle).await;
        }

        let mut warnings = Vec::new();
        for service in selected {
            if let Err(e) = wait_until_ready(self.probe.as_ref(), service, &self.policy).await {
                tracing::warn!("{}", e);
                warnings.push(e);
            }
        }
        Ok(warnings)
    }

    /// `up` followed by readiness polling.
    pub async fn up_and_wait(&self, names: &[String]) -> Result<Vec<Error>> {
        self.up(names).await?;
        self.wait_ready(names).await
    }

    /// Destroy and recreate services with empty volumes.
    ///
    /// Per service: stop, remove the container, then remove its volume. The
    /// volume is only touched after the container removal has returned
    /// successfully. Afterwards the set is started, polled, and migrated if
    /// a schema-holding service was among them.
    pub async fn reset(&self, names: &[String], migrator: &Migrator<'_>) -> Result<Vec<Error>> {
        let selected = self.select(names)?;

        for service in &selected {
            tracing::info!("Resetting '{}'", service.name);
            let name = service.name.as_str();

            let stop = self.compose.command(["stop", name]).timeout(STOP_TIMEOUT);
            self.runner.run_success(&stop).await?;

            let rm = self
                .compose
                .command(["rm", "-f", "-s", name])
                .timeout(STOP_TIMEOUT);
            self.runner.run_success(&rm).await?;

            self.remove_volume(&self.compose.volume_name(&service.volume_suffix))
                .await?;
        }

        let names = Self::names(&selected);
        let warnings = self.up_and_wait(&names).await?;

        if selected.iter().any(|s| s.holds_schema) {
            migrator.migrate().await?;
        }
        Ok(warnings)
    }

    /// Remove a named volume. Absence counts as success; any other failure
    /// (such as the volume still being in use) is an error.
    async fn remove_volume(&self, volume: &str) -> Result<()> {
        let cmd = CommandSpec::new("docker")
            .args(["volume", "rm", volume])
            .timeout(VOLUME_TIMEOUT);
        let out = self.runner.run(&cmd).await?;
        if out.success() {
            tracing::info!("Removed volume '{}'", volume);
            return Ok(());
        }
        let stderr = out.stderr.to_lowercase();
        if stderr.contains("no such volume") || stderr.contains("not found") {
            tracing::info!("Volume '{}' not found, nothing to remove", volume);
            return Ok(());
        }
        Err(ExecError::from_output(&cmd, &out).into())
    }

    /// Bring up the whole compose project, rebuilding images.
    pub async fn stack_up(&self) -> Result<()> {
        let cmd = self.compose.command(["up", "-d", "--build"]).inherit_stdio();
        let out = self.runner.run(&cmd).await?;
        if out.success() {
            Ok(())
        } else {
            Err(Error::ServiceStartFailed(
                self.compose.project().to_string(),
                format!("'{}' exited with {:?}", cmd.display(), out.exit_code),
            ))
        }
    }

    pub async fn stack_down(&self) -> Result<()> {
        let cmd = self.compose.command(["down"]).inherit_stdio();
        self.runner.run_success(&cmd).await?;
        Ok(())
    }
}
