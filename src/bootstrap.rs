//! Full environment bring-up.
//!
//! Composes the pieces in a fixed order: reconcile dependencies, start the
//! backing services, apply migrations, and optionally bring up the local
//! cluster. The flow halts at the first fatal error; warning-level problems
//! are collected into the [`SetupReport`].

use crate::cluster::{ClusterManager, ClusterState};
use crate::config::{ensure_env_file, EnvFileOutcome, Settings};
use crate::dependency::{ReconciliationReport, Registry, Remedy};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::identity::IdentityContext;
use crate::install::{Installer, RemediationOutcome};
use crate::migrate::Migrator;
use crate::os_profile::OsProfile;
use crate::services::{Compose, ServiceManager};

/// What a setup run did, beyond succeeding.
#[derive(Debug, Default)]
pub struct SetupReport {
    pub remediated: Vec<RemediationOutcome>,
    pub warnings: Vec<Error>,
    /// A group membership changed during this run; a new login session is
    /// needed before the container engine is usable without sudo.
    pub requires_relogin: bool,
    pub cluster: Option<ClusterState>,
}

impl SetupReport {
    fn absorb(&mut self, other: SetupReport) {
        self.requires_relogin |= other.requires_relogin;
        self.remediated.extend(other.remediated);
        self.warnings.extend(other.warnings);
        if other.cluster.is_some() {
            self.cluster = other.cluster;
        }
    }
}

/// Copy `.env.example` to `.env` when `.env` is missing.
pub fn materialize_env(settings: &Settings) -> Result<EnvFileOutcome> {
    ensure_env_file(&settings.env_example_path(), &settings.env_path())
}

pub struct Bootstrap<'a> {
    runner: &'a dyn CommandRunner,
    identity: &'a IdentityContext,
    settings: &'a Settings,
    profile: Option<OsProfile>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        identity: &'a IdentityContext,
        settings: &'a Settings,
    ) -> Self {
        Self {
            runner,
            identity,
            settings,
            profile: None,
        }
    }

    /// Use a known host profile instead of reading os-release.
    pub fn with_profile(mut self, profile: OsProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    fn os_profile(&self) -> Result<OsProfile> {
        match &self.profile {
            Some(profile) => Ok(profile.clone()),
            None => OsProfile::detect(),
        }
    }

    pub async fn check(&self, registry: &Registry) -> ReconciliationReport {
        registry.check(self.runner, self.identity).await
    }

    /// Check `registry` and remediate every required gap.
    ///
    /// The host profile is only resolved when something needs installing.
    /// Optional tools are attempted when `include_optional` is set; their
    /// failures become warnings.
    pub async fn reconcile(
        &self,
        registry: &Registry,
        include_optional: bool,
    ) -> Result<SetupReport> {
        let report = self.check(registry).await;
        let mut outcome = SetupReport::default();

        let remedies = report.required_remedies();
        let optional = if include_optional {
            report.missing_optional.clone()
        } else {
            Vec::new()
        };
        if remedies.is_empty() && optional.is_empty() {
            tracing::info!("All dependencies present");
            return Ok(outcome);
        }

        let profile = self.os_profile()?;
        tracing::info!(
            "Host: {} ({})",
            profile.description,
            profile.family
        );
        let installer = Installer::new(self.runner);

        for (dependency, remedy) in &remedies {
            let done = installer
                .remediate(dependency, *remedy, &profile, self.identity)
                .await?;
            outcome.requires_relogin |= done.requires_relogin;
            outcome.remediated.push(done);
        }

        let mut unavailable = Vec::new();
        for dependency in &optional {
            match installer
                .remediate(dependency, Remedy::Install, &profile, self.identity)
                .await
            {
                Ok(done) => outcome.remediated.push(done),
                Err(e) => {
                    tracing::warn!("Optional '{}' not installed: {}", dependency.name, e);
                    unavailable.push(dependency.name.clone());
                }
            }
        }
        if !unavailable.is_empty() {
            outcome
                .warnings
                .push(Error::MissingOptionalDependency(unavailable));
        }

        Ok(outcome)
    }

    /// Reconcile the base set, start services, and migrate.
    pub async fn setup(&self) -> Result<SetupReport> {
        let mut report = self.reconcile(&Registry::base(), true).await?;

        let compose = Compose::detect(
            self.runner,
            self.settings.compose_path(),
            self.settings.compose_project(),
            &self.settings.work_dir,
        )
        .await?;
        let services =
            ServiceManager::new(self.runner, &compose, self.settings.readiness.poll_policy());
        report.warnings.extend(services.up_and_wait(&[]).await?);

        Migrator::new(self.runner, self.identity, self.settings)
            .migrate()
            .await?;
        Ok(report)
    }

    /// [`setup`](Self::setup), then the cluster toolchain and a running
    /// cluster.
    pub async fn setup_with_cluster(&self) -> Result<SetupReport> {
        let mut report = self.setup().await?;
        report.absorb(self.reconcile(&Registry::cluster(), false).await?);

        if report.requires_relogin {
            tracing::warn!(
                "Group membership changed during this run; cluster start may fail until you log in again"
            );
        }
        let state = ClusterManager::new(self.runner, self.identity, &self.settings.cluster)
            .start()
            .await?;
        report.cluster = Some(state);
        Ok(report)
    }
}
