//! Dependency registry and checker.
//!
//! A flat, named set of external tools. Each carries a presence probe and
//! an optional health probe; [`Registry::check`] evaluates all of them
//! against the live host and returns a [`ReconciliationReport`].

mod registry;
mod report;

pub use registry::Registry;
pub use report::{CheckedDependency, DependencyStatus, ReconciliationReport, Remedy};

use crate::exec::CommandSpec;
use crate::identity::Scope;
use std::fmt;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Toolchain,
    ContainerEngine,
    Compose,
    ClusterClient,
    ClusterRuntime,
    Vcs,
    MigrationTool,
    OptionalUtility,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Toolchain => "toolchain",
            DependencyKind::ContainerEngine => "container-engine",
            DependencyKind::Compose => "compose",
            DependencyKind::ClusterClient => "cluster-client",
            DependencyKind::ClusterRuntime => "cluster-runtime",
            DependencyKind::Vcs => "vcs",
            DependencyKind::MigrationTool => "migration-tool",
            DependencyKind::OptionalUtility => "optional-utility",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to decide whether a dependency is present and healthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Tried in order; the first that exits 0 proves presence.
    pub presence: Vec<CommandSpec>,
    /// Run after presence succeeds; failure downgrades to unhealthy.
    pub health: Option<CommandSpec>,
}

impl Probe {
    pub fn command<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            presence: vec![CommandSpec::new(program)
                .args(args)
                .timeout(PROBE_TIMEOUT)],
            health: None,
        }
    }

    /// Add a fallback presence command.
    pub fn or<I, S>(mut self, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presence.push(
            CommandSpec::new(program)
                .args(args)
                .timeout(PROBE_TIMEOUT),
        );
        self
    }

    pub fn with_health<I, S>(mut self, program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.health = Some(
            CommandSpec::new(program)
                .args(args)
                .timeout(PROBE_TIMEOUT),
        );
        self
    }
}

/// One registered dependency. Constructed once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub kind: DependencyKind,
    pub probe: Probe,
    pub required: bool,
    /// Identity the probe runs under.
    pub scope: Scope,
}

impl Dependency {
    pub fn new(name: impl Into<String>, kind: DependencyKind, probe: Probe) -> Self {
        Self {
            name: name.into(),
            kind,
            probe,
            required: kind != DependencyKind::OptionalUtility,
            scope: Scope::Current,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn user_scoped(mut self) -> Self {
        self.scope = Scope::User;
        self
    }

    pub fn cargo() -> Self {
        Self::new(
            "cargo",
            DependencyKind::Toolchain,
            Probe::command("cargo", ["--version"]),
        )
        .user_scoped()
    }

    pub fn docker() -> Self {
        Self::new(
            "docker",
            DependencyKind::ContainerEngine,
            Probe::command("docker", ["--version"])
                .with_health("docker", ["info", "--format", "{{.ServerVersion}}"]),
        )
    }

    pub fn compose() -> Self {
        Self::new(
            "docker-compose",
            DependencyKind::Compose,
            Probe::command("docker", ["compose", "version"]).or("docker-compose", ["--version"]),
        )
    }

    pub fn git() -> Self {
        Self::new(
            "git",
            DependencyKind::Vcs,
            Probe::command("git", ["--version"]),
        )
    }

    pub fn sqlx() -> Self {
        Self::new(
            "sqlx",
            DependencyKind::MigrationTool,
            Probe::command("sqlx", ["--version"]),
        )
        .user_scoped()
    }

    pub fn kubectl() -> Self {
        Self::new(
            "kubectl",
            DependencyKind::ClusterClient,
            Probe::command("kubectl", ["version", "--client"]),
        )
        .user_scoped()
    }

    pub fn minikube() -> Self {
        Self::new(
            "minikube",
            DependencyKind::ClusterRuntime,
            Probe::command("minikube", ["version", "--short"]),
        )
        .user_scoped()
    }

    pub fn cargo_watch() -> Self {
        Self::new(
            "cargo-watch",
            DependencyKind::OptionalUtility,
            Probe::command("cargo", ["watch", "--version"]),
        )
        .user_scoped()
    }
}
