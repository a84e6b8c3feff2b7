//! Installer dispatcher.
//!
//! Given a dependency gap and the host's [`OsProfile`], looks up the
//! remediation sequence in the (kind × family) table and executes it step
//! by step. Sequences rely on the package manager being a no-op when the
//! target is already installed, so re-running one is always safe.

mod table;

pub use table::plan_for;

use crate::dependency::{Dependency, Remedy};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::identity::{IdentityContext, Scope};
use crate::os_profile::OsProfile;

/// One action in a remediation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationStep {
    pub description: String,
    pub scope: Scope,
    pub command: CommandSpec,
}

impl RemediationStep {
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.command = self.command.env(key, value);
        self
    }
}

/// Ordered steps selected for one dependency on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationPlan {
    pub dependency: String,
    pub remedy: Remedy,
    pub steps: Vec<RemediationStep>,
    /// True when a step changes the unprivileged user's group membership.
    pub changes_group: bool,
}

impl RemediationPlan {
    pub fn requires_elevation(&self) -> bool {
        self.steps.iter().any(|s| s.scope == Scope::System)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationOutcome {
    pub dependency: String,
    pub steps_run: usize,
    /// Group membership changed: the current login session does not see
    /// it yet, so dependent operations (cluster start) may fail until the
    /// user starts a new session.
    pub requires_relogin: bool,
}

pub struct Installer<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Installer<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Execute the remediation for `dependency`.
    ///
    /// Fails with `UnsupportedPlatform` on unknown hosts and with
    /// `PrivilegeRequired` when a system step is needed but the process is
    /// not elevated; in both cases nothing has been run.
    pub async fn remediate(
        &self,
        dependency: &Dependency,
        remedy: Remedy,
        profile: &OsProfile,
        identity: &IdentityContext,
    ) -> Result<RemediationOutcome> {
        let plan = plan_for(dependency, remedy, profile, identity)?;
        if plan.requires_elevation() {
            identity.require_elevated(format!("Installing {}", dependency.name))?;
        }

        tracing::info!(
            dependency = %dependency.name,
            family = %profile.family,
            steps = plan.steps.len(),
            "remediating"
        );

        for (index, step) in plan.steps.iter().enumerate() {
            tracing::info!(
                "[{}/{}] {}: {}",
                index + 1,
                plan.steps.len(),
                dependency.name,
                step.description
            );
            let cmd = identity.prepare(step.scope, step.command.clone());
            let output = self.runner.run(&cmd).await.map_err(|e| Error::RemediationFailed {
                dependency: dependency.name.clone(),
                step: step.description.clone(),
                command: cmd.display(),
                exit_code: None,
                detail: e.to_string(),
            })?;
            if !output.success() {
                return Err(Error::RemediationFailed {
                    dependency: dependency.name.clone(),
                    step: step.description.clone(),
                    command: cmd.display(),
                    exit_code: output.exit_code,
                    detail: output.combined(),
                });
            }
        }

        if plan.changes_group {
            tracing::warn!(
                "'{}' was added to a new group; start a new login session before using {}",
                identity.unprivileged_user(),
                dependency.name
            );
        }

        Ok(RemediationOutcome {
            dependency: plan.dependency,
            steps_run: plan.steps.len(),
            requires_relogin: plan.changes_group,
        })
    }
}
