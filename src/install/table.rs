//! Remediation table: (dependency kind, OS family) → ordered steps.

use super::{RemediationPlan, RemediationStep};
use crate::dependency::{Dependency, DependencyKind, Remedy};
use crate::error::{Error, Result};
use crate::exec::CommandSpec;
use crate::identity::{IdentityContext, Scope};
use crate::os_profile::{OsFamily, OsProfile, PackageManager};
use std::time::Duration;

const INSTALL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const DOCKER_KEYRING: &str = "/etc/apt/keyrings/docker.gpg";
const DOCKER_PACKAGES: &[&str] = &[
    "docker-ce",
    "docker-ce-cli",
    "containerd.io",
    "docker-buildx-plugin",
    "docker-compose-plugin",
];

/// Build the remediation plan for `dependency` on `profile`.
///
/// Plain package installs go through the profile's package manager; only
/// vendor recipes (docker's own repository, release downloads) are keyed on
/// the family. Unsupported hosts fail before any step is produced.
pub fn plan_for(
    dependency: &Dependency,
    remedy: Remedy,
    profile: &OsProfile,
    identity: &IdentityContext,
) -> Result<RemediationPlan> {
    let family = profile.family;
    if family == OsFamily::Unsupported {
        return Err(unsupported(dependency, profile));
    }

    let user = identity.unprivileged_user();
    let steps = match (remedy, dependency.kind, family) {
        (Remedy::StartService, DependencyKind::ContainerEngine, OsFamily::DarwinLike) => {
            vec![user_step("start Docker Desktop", "open", &["-a", "Docker"])]
        }
        (Remedy::StartService, DependencyKind::ContainerEngine, _) => vec![system_step(
            "start docker service",
            "systemctl",
            &["enable", "--now", "docker"],
        )],
        (Remedy::StartService, kind, _) => {
            return Err(Error::Config(format!(
                "No service to start for {} dependency '{}'",
                kind, dependency.name
            )))
        }

        (Remedy::Install, DependencyKind::Toolchain, _) => vec![user_step(
            "install rust toolchain via rustup",
            "sh",
            &[
                "-c",
                "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y",
            ],
        )],
        (Remedy::Install, DependencyKind::MigrationTool, _) => vec![user_step(
            "install sqlx-cli",
            "cargo",
            &[
                "install",
                "sqlx-cli",
                "--no-default-features",
                "--features",
                "rustls,postgres",
            ],
        )],
        (Remedy::Install, DependencyKind::OptionalUtility, _) => vec![user_step(
            format!("install {}", dependency.name).as_str(),
            "cargo",
            &["install", dependency.name.as_str()],
        )],

        (Remedy::Install, DependencyKind::ContainerEngine, OsFamily::DebianLike) => {
            debian_docker(profile, user)
        }
        (Remedy::Install, DependencyKind::ContainerEngine, OsFamily::RhelLike) => {
            rhel_docker(profile, user)
        }
        (Remedy::Install, DependencyKind::ContainerEngine, OsFamily::DarwinLike) => {
            vec![brew_step(&["install", "--cask", "docker"])]
        }

        (Remedy::Install, DependencyKind::Compose, _) => {
            let package = match profile.package_manager {
                PackageManager::Homebrew => "docker-compose",
                _ => "docker-compose-plugin",
            };
            install_packages(dependency, profile, &[package])?
        }
        (Remedy::Install, DependencyKind::Vcs, _) => {
            install_packages(dependency, profile, &["git"])?
        }

        (Remedy::Install, DependencyKind::ClusterClient, OsFamily::DarwinLike) => {
            install_packages(dependency, profile, &["kubectl"])?
        }
        (Remedy::Install, DependencyKind::ClusterClient, _) => {
            let download = format!(
                "curl -fsSLo /tmp/kubectl \"https://dl.k8s.io/release/$(curl -fsSL https://dl.k8s.io/release/stable.txt)/bin/linux/{}/kubectl\"",
                profile.arch
            );
            vec![
                system_step("download kubectl", "sh", &["-c", download.as_str()]),
                system_step(
                    "install kubectl",
                    "install",
                    &["-o", "root", "-g", "root", "-m", "0755", "/tmp/kubectl", "/usr/local/bin/kubectl"],
                ),
            ]
        }

        (Remedy::Install, DependencyKind::ClusterRuntime, OsFamily::DarwinLike) => {
            install_packages(dependency, profile, &["minikube"])?
        }
        (Remedy::Install, DependencyKind::ClusterRuntime, _) => {
            let url = format!(
                "https://storage.googleapis.com/minikube/releases/latest/minikube-linux-{}",
                profile.arch
            );
            vec![
                system_step(
                    "download minikube",
                    "curl",
                    &["-fsSLo", "/tmp/minikube", url.as_str()],
                ),
                system_step(
                    "install minikube",
                    "install",
                    &["-m", "0755", "/tmp/minikube", "/usr/local/bin/minikube"],
                ),
            ]
        }

        (Remedy::Install, _, OsFamily::Unsupported) => {
            return Err(unsupported(dependency, profile))
        }
    };

    let changes_group = steps.iter().any(|s| s.command.program == "usermod");
    Ok(RemediationPlan {
        dependency: dependency.name.clone(),
        remedy,
        steps,
        changes_group,
    })
}

fn unsupported(dependency: &Dependency, profile: &OsProfile) -> Error {
    Error::UnsupportedPlatform {
        platform: if profile.description.is_empty() {
            profile.family.to_string()
        } else {
            profile.description.clone()
        },
        dependency: dependency.name.clone(),
    }
}

/// Docker's apt repository is published per upstream distribution, so
/// derivatives use their base's id and codename.
fn debian_docker(profile: &OsProfile, user: &str) -> Vec<RemediationStep> {
    let repo = format!("https://download.docker.com/linux/{}", profile.distro_id);
    let codename = match &profile.codename {
        Some(codename) => codename.clone(),
        None => "$(. /etc/os-release && echo \"${UBUNTU_CODENAME:-${DEBIAN_CODENAME:-$VERSION_CODENAME}}\")"
            .to_string(),
    };
    let add_key = format!(
        "curl -fsSL \"{}/gpg\" | gpg --dearmor --yes -o {}",
        repo, DOCKER_KEYRING
    );
    let add_source = format!(
        "echo \"deb [arch={} signed-by={}] {} {} stable\" > /etc/apt/sources.list.d/docker.list",
        profile.arch, DOCKER_KEYRING, repo, codename
    );
    let mut steps = vec![
        apt_update(),
        apt_install(&["ca-certificates", "curl", "gnupg"]),
        system_step(
            "create apt keyring directory",
            "install",
            &["-m", "0755", "-d", "/etc/apt/keyrings"],
        ),
        system_step(
            "register docker repository key",
            "sh",
            &["-c", add_key.as_str()],
        ),
        system_step(
            "register docker package source",
            "sh",
            &["-c", add_source.as_str()],
        ),
        apt_update(),
        apt_install(DOCKER_PACKAGES),
    ];
    steps.extend(enable_docker(user));
    steps
}

fn rhel_docker(profile: &OsProfile, user: &str) -> Vec<RemediationStep> {
    let repo = format!(
        "https://download.docker.com/linux/{}/docker-ce.repo",
        profile.distro_id
    );
    let mut steps = vec![
        dnf_install(&["dnf-plugins-core"]),
        system_step(
            "register docker repository",
            "dnf",
            &["config-manager", "--add-repo", repo.as_str()],
        ),
        dnf_install(DOCKER_PACKAGES),
    ];
    steps.extend(enable_docker(user));
    steps
}

fn enable_docker(user: &str) -> Vec<RemediationStep> {
    vec![
        system_step(
            "enable and start docker service",
            "systemctl",
            &["enable", "--now", "docker"],
        ),
        system_step(
            &format!("add {} to the docker group", user),
            "usermod",
            &["-aG", "docker", user],
        ),
    ]
}

/// Install distribution packages with whatever manager the host uses.
fn install_packages(
    dependency: &Dependency,
    profile: &OsProfile,
    packages: &[&str],
) -> Result<Vec<RemediationStep>> {
    match profile.package_manager {
        PackageManager::Apt => Ok(vec![apt_update(), apt_install(packages)]),
        PackageManager::Dnf => Ok(vec![dnf_install(packages)]),
        PackageManager::Homebrew => {
            let mut args = vec!["install"];
            args.extend_from_slice(packages);
            Ok(vec![brew_step(&args)])
        }
        PackageManager::None => Err(unsupported(dependency, profile)),
    }
}

fn apt_update() -> RemediationStep {
    system_step("refresh package index", "apt-get", &["update"])
}

fn apt_install(packages: &[&str]) -> RemediationStep {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    system_step(&format!("install {}", packages.join(" ")), "apt-get", &args)
        .with_env("DEBIAN_FRONTEND", "noninteractive")
}

fn dnf_install(packages: &[&str]) -> RemediationStep {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    system_step(&format!("install {}", packages.join(" ")), "dnf", &args)
}

/// Homebrew refuses to run as root, so brew steps are user-scoped.
fn brew_step(args: &[&str]) -> RemediationStep {
    user_step(&format!("brew {}", args.join(" ")), "brew", args)
}

fn system_step(description: &str, program: &str, args: &[&str]) -> RemediationStep {
    step(Scope::System, description, program, args)
}

fn user_step(description: &str, program: &str, args: &[&str]) -> RemediationStep {
    step(Scope::User, description, program, args)
}

fn step(scope: Scope, description: &str, program: &str, args: &[&str]) -> RemediationStep {
    RemediationStep {
        description: description.to_string(),
        scope,
        command: CommandSpec::new(program)
            .args(args.iter().copied())
            .timeout(INSTALL_TIMEOUT),
    }
}
