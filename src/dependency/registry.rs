use super::report::{CheckedDependency, DependencyStatus, ReconciliationReport};
use super::Dependency;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::identity::IdentityContext;
use std::collections::HashSet;

/// Flat set of uniquely named dependencies.
#[derive(Debug, Clone)]
pub struct Registry {
    dependencies: Vec<Dependency>,
}

impl Registry {
    /// Fails if two dependencies share a name.
    pub fn new(dependencies: Vec<Dependency>) -> Result<Self> {
        let mut seen = HashSet::new();
        for dep in &dependencies {
            if !seen.insert(dep.name.as_str()) {
                return Err(Error::Config(format!(
                    "Dependency '{}' registered twice",
                    dep.name
                )));
            }
        }
        Ok(Self { dependencies })
    }

    /// Tools needed to build and run the application locally.
    pub fn base() -> Self {
        Self {
            dependencies: vec![
                Dependency::cargo(),
                Dependency::docker(),
                Dependency::compose(),
                Dependency::git(),
                Dependency::sqlx(),
                Dependency::cargo_watch(),
            ],
        }
    }

    /// Tools needed to run the local Kubernetes cluster.
    pub fn cluster() -> Self {
        Self {
            dependencies: vec![
                Dependency::docker(),
                Dependency::kubectl(),
                Dependency::minikube(),
            ],
        }
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Probe every dependency against the live host.
    ///
    /// Never short-circuits: a single run reports the complete gap list.
    pub async fn check(
        &self,
        runner: &dyn CommandRunner,
        identity: &IdentityContext,
    ) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();
        for dep in &self.dependencies {
            let status = probe(dep, runner, identity).await;
            match &status {
                DependencyStatus::Present { version } => tracing::debug!(
                    dependency = %dep.name,
                    version = version.as_deref().unwrap_or("-"),
                    "present"
                ),
                DependencyStatus::Unhealthy { reason } => {
                    tracing::warn!(dependency = %dep.name, "installed but unhealthy: {}", reason)
                }
                DependencyStatus::Missing => {
                    tracing::info!(dependency = %dep.name, required = dep.required, "missing")
                }
            }
            report.record(CheckedDependency {
                dependency: dep.clone(),
                status,
            });
        }
        report
    }
}

async fn probe(
    dep: &Dependency,
    runner: &dyn CommandRunner,
    identity: &IdentityContext,
) -> DependencyStatus {
    let mut version = None;
    let mut found = false;
    for cmd in &dep.probe.presence {
        let cmd = identity.prepare(dep.scope, cmd.clone());
        match runner.run(&cmd).await {
            Ok(out) if out.success() => {
                version = out.first_line().map(str::to_string);
                found = true;
                break;
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("probe '{}' failed: {}", cmd, e),
        }
    }
    if !found {
        return DependencyStatus::Missing;
    }

    if let Some(health) = &dep.probe.health {
        let cmd = identity.prepare(dep.scope, health.clone());
        let reason = match runner.run(&cmd).await {
            Ok(out) if out.success() => None,
            Ok(out) => Some(
                out.stderr
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .unwrap_or("health check failed")
                    .to_string(),
            ),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            return DependencyStatus::Unhealthy { reason };
        }
    }

    DependencyStatus::Present { version }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_rejected() {
        let err = Registry::new(vec![Dependency::git(), Dependency::git()]).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("git")));
    }

    #[test]
    fn builtin_registries_have_unique_names() {
        for registry in [Registry::base(), Registry::cluster()] {
            Registry::new(registry.dependencies().to_vec()).unwrap();
        }
    }

    #[test]
    fn only_one_optional_utility_in_base() {
        let optional: Vec<_> = Registry::base()
            .dependencies()
            .iter()
            .filter(|d| !d.required)
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(optional, vec!["cargo-watch".to_string()]);
    }
}
