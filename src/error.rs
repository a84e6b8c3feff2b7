// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use crate::exec::ExecError;
use miette::Diagnostic;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// How a reported problem affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Collected and printed; the run continues.
    Warning,
    /// Stops the run at this point.
    Fatal,
}

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Could not resolve the host operating system: {0}")]
    #[diagnostic(
        code(devstack::os::unresolved),
        help("Expected a readable /etc/os-release (or /usr/lib/os-release) with NAME or ID set")
    )]
    UnresolvedOs(String),

    #[error("Unsupported platform '{platform}': cannot install {dependency} automatically")]
    #[diagnostic(
        code(devstack::os::unsupported),
        help("Install {dependency} manually with your system package manager, then re-run `devstack check`")
    )]
    UnsupportedPlatform {
        platform: String,
        dependency: String,
    },

    #[error("Missing required dependencies: {}", .0.join(", "))]
    #[diagnostic(
        code(devstack::deps::missing_required),
        help("Run `devstack setup` to install them automatically")
    )]
    MissingRequiredDependency(Vec<String>),

    #[error("Optional dependencies not installed: {}", .0.join(", "))]
    #[diagnostic(code(devstack::deps::missing_optional))]
    MissingOptionalDependency(Vec<String>),

    #[error("Remediation of '{dependency}' failed at step '{step}': {detail}")]
    #[diagnostic(code(devstack::install::failed))]
    RemediationFailed {
        dependency: String,
        step: String,
        command: String,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("{reason} requires elevated privileges")]
    #[diagnostic(
        code(devstack::privilege::required),
        help("Re-run the command with sudo")
    )]
    PrivilegeRequired { reason: String },

    #[error("Cluster failed to start after {attempts} attempts: {last_error}")]
    #[diagnostic(
        code(devstack::cluster::start_failed),
        help("The most common cause is a pending 'docker' group membership. Log out and back in (or run `newgrp docker`), then retry `devstack start-cluster`")
    )]
    ClusterStartFailed { attempts: u32, last_error: String },

    #[error("Cluster runtime '{program}' is not installed")]
    #[diagnostic(
        code(devstack::cluster::runtime_missing),
        help("Run `sudo devstack install-cluster-runtime` to install minikube and kubectl")
    )]
    ClusterRuntimeMissing { program: String },

    #[error("Cluster failed to stop: {0}")]
    #[diagnostic(code(devstack::cluster::stop_failed))]
    ClusterStopFailed(String),

    #[error("Service '{0}' failed to start: {1}")]
    #[diagnostic(
        code(devstack::service::start_failed),
        help("Check the container logs with `docker compose logs {0}`")
    )]
    ServiceStartFailed(String, String),

    #[error("Service '{service}' not ready after {:.0?}", .waited)]
    #[diagnostic(code(devstack::service::readiness_timeout))]
    ServiceReadinessTimeout { service: String, waited: Duration },

    #[error("Migration failed (exit code {}):\n{output}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()))]
    #[diagnostic(code(devstack::migrate::failed))]
    MigrationFailed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Neither 'docker compose' (v2) nor 'docker-compose' (v1) is available")]
    #[diagnostic(
        code(devstack::compose::unavailable),
        help("Install the Docker Compose plugin, or run `devstack setup`")
    )]
    DockerComposeUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command error: {0}")]
    Exec(#[from] ExecError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Warning-level problems are reported but never stop a run.
    pub fn severity(&self) -> Severity {
        match self {
            Error::MissingOptionalDependency(_) | Error::ServiceReadinessTimeout { .. } => {
                Severity::Warning
            }
            _ => Severity::Fatal,
        }
    }

    /// Stable classification label printed in front of every reported problem.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnresolvedOs(_) => "UnresolvedOS",
            Error::UnsupportedPlatform { .. } => "UnsupportedPlatform",
            Error::MissingRequiredDependency(_) => "MissingRequiredDependency",
            Error::MissingOptionalDependency(_) => "MissingOptionalDependency",
            Error::RemediationFailed { .. } => "RemediationFailed",
            Error::PrivilegeRequired { .. } => "PrivilegeRequired",
            Error::ClusterStartFailed { .. } => "ClusterStartFailed",
            Error::ClusterRuntimeMissing { .. } => "ClusterRuntimeMissing",
            Error::ClusterStopFailed(_) => "ClusterStopFailed",
            Error::ServiceStartFailed(..) => "ServiceStartFailed",
            Error::ServiceReadinessTimeout { .. } => "ServiceReadinessTimeout",
            Error::MigrationFailed { .. } => "MigrationFailed",
            Error::DockerComposeUnavailable => "DockerComposeUnavailable",
            Error::Config(_) | Error::Yaml(_) => "Config",
            Error::Exec(_) => "CommandFailed",
            Error::Io(_) => "Io",
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::UnresolvedOs(_) => Some(
                "Make sure /etc/os-release exists and is readable. On unusual hosts install dependencies manually.".to_string(),
            ),
            Error::UnsupportedPlatform { dependency, .. } => Some(format!(
                "Automatic installation supports Debian/Ubuntu, CentOS/RHEL/Fedora and macOS. Install {} manually and re-run `devstack check`.",
                dependency
            )),
            Error::MissingRequiredDependency(_) => {
                Some("Run `devstack setup` to install missing dependencies.".to_string())
            }
            Error::MissingOptionalDependency(names) => Some(format!(
                "Optional tools improve the workflow but are not required: {}",
                names.join(", ")
            )),
            Error::RemediationFailed { command, .. } => Some(format!(
                "Re-run the failing step by hand to see the full output:\n  {}",
                command
            )),
            Error::PrivilegeRequired { .. } => {
                Some("Re-run with sudo, e.g. `sudo -E devstack setup`.".to_string())
            }
            Error::ClusterStartFailed { .. } => Some(
                "If docker was just installed, your user was added to the 'docker' group but this session does not see it yet.\nLog out and back in (or run `newgrp docker`), then run `devstack start-cluster` again.".to_string(),
            ),
            Error::ClusterRuntimeMissing { .. } => Some(
                "Install the cluster runtime with `sudo devstack install-cluster-runtime`, then run `devstack start-cluster`.".to_string(),
            ),
            Error::ServiceStartFailed(..) | Error::DockerComposeUnavailable => {
                Some("Check that Docker is running: docker info".to_string())
            }
            Error::ServiceReadinessTimeout { service, .. } => Some(format!(
                "'{}' may still be starting. Check `docker compose logs {}` if later steps fail.",
                service, service
            )),
            Error::MigrationFailed { .. } => Some(
                "Fix the migration or database state, then run `devstack migrate` again.".to_string(),
            ),
            Error::Config(_) | Error::Yaml(_) => {
                Some("Check devstack.yaml and your .env file.".to_string())
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
