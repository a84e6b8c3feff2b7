//! Registry checks against a scripted host.

mod common;

use common::{Response, ScriptedRunner};
use devstack::dependency::{DependencyStatus, Remedy};
use devstack::{Dependency, IdentityContext, Registry};
use proptest::prelude::*;

fn developer() -> IdentityContext {
    IdentityContext::from_parts("dev", None, false)
}

fn names(deps: &[Dependency]) -> Vec<&str> {
    deps.iter().map(|d| d.name.as_str()).collect()
}

#[tokio::test]
async fn all_present_lands_only_in_present_set() {
    let runner = ScriptedRunner::new();
    let registry = Registry::base();
    let report = registry.check(&runner, &developer()).await;

    assert_eq!(report.present.len(), registry.dependencies().len());
    assert!(report.missing_required.is_empty());
    assert!(report.missing_optional.is_empty());
    assert!(report.unhealthy.is_empty());
    assert!(report.ensure_required().is_ok());
}

#[tokio::test]
async fn fresh_host_reports_every_gap_in_one_pass() {
    let runner = ScriptedRunner::with_fallback(Response::NotFound);
    let report = Registry::base().check(&runner, &developer()).await;

    assert_eq!(
        names(&report.missing_required),
        vec!["cargo", "docker", "docker-compose", "git", "sqlx"]
    );
    assert_eq!(names(&report.missing_optional), vec!["cargo-watch"]);

    let err = report.ensure_required().unwrap_err();
    assert_eq!(err.kind(), "MissingRequiredDependency");
    assert!(err.to_string().contains("docker, docker-compose, git"));
    assert_eq!(
        report.optional_warning().map(|w| w.kind()),
        Some("MissingOptionalDependency")
    );
}

#[tokio::test]
async fn unreachable_daemon_is_unhealthy_and_calls_for_start() {
    let runner = ScriptedRunner::new()
        .on(&["docker", "--version"], vec![Response::stdout("Docker version 27.0.3\n")])
        .on(
            &["docker", "info"],
            vec![Response::fail("Cannot connect to the Docker daemon at unix:///var/run/docker.sock")],
        );
    let report = Registry::base().check(&runner, &developer()).await;

    assert_eq!(report.unhealthy.len(), 1);
    assert!(matches!(
        &report.unhealthy[0].status,
        DependencyStatus::Unhealthy { reason } if reason.contains("Cannot connect")
    ));
    assert!(!report.is_satisfied());

    let remedies = report.required_remedies();
    assert_eq!(remedies.len(), 1);
    assert_eq!(remedies[0].0.name, "docker");
    assert_eq!(remedies[0].1, Remedy::StartService);
}

#[tokio::test]
async fn compose_v1_fallback_counts_as_present() {
    let runner = ScriptedRunner::new()
        .on(&["docker", "compose", "version"], vec![Response::fail("unknown command")])
        .on(&["docker-compose", "--version"], vec![Response::stdout("docker-compose version 1.29.2\n")]);
    let report = Registry::base().check(&runner, &developer()).await;

    let compose = report
        .present
        .iter()
        .find(|c| c.name() == "docker-compose")
        .unwrap();
    assert_eq!(
        compose.status,
        DependencyStatus::Present {
            version: Some("docker-compose version 1.29.2".to_string())
        }
    );
}

#[tokio::test]
async fn user_scoped_probes_run_as_the_sudo_caller() {
    let runner = ScriptedRunner::new();
    let identity = IdentityContext::from_parts("root", Some("dev".into()), true);
    Registry::cluster().check(&runner, &identity).await;

    let raw = runner.raw_calls();
    let minikube = raw
        .iter()
        .find(|c| c.args.iter().any(|a| a == "minikube"))
        .unwrap();
    assert_eq!(minikube.program, "sudo");
    assert_eq!(&minikube.args[..2], &["-u".to_string(), "dev".to_string()]);

    let docker = raw.iter().find(|c| c.program == "docker").unwrap();
    assert_eq!(docker.args, vec!["--version"]);
}

#[test]
fn duplicate_names_are_rejected() {
    assert!(Registry::new(vec![Dependency::git(), Dependency::git()]).is_err());
}

proptest! {
    #[test]
    fn each_dependency_lands_in_exactly_one_bucket(present in proptest::collection::vec(any::<bool>(), 6)) {
        let registry = Registry::base();
        let mut runner = ScriptedRunner::new();
        for (dep, is_present) in registry.dependencies().iter().zip(&present) {
            if !*is_present {
                for probe in &dep.probe.presence {
                    let mut tokens = vec![probe.program.as_str()];
                    tokens.extend(probe.args.iter().map(String::as_str));
                    runner = runner.on(&tokens, vec![Response::NotFound]);
                }
            }
        }

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let report = rt.block_on(registry.check(&runner, &developer()));

        for (dep, is_present) in registry.dependencies().iter().zip(&present) {
            let in_present = report.is_present(&dep.name);
            let in_required = report.missing_required.iter().any(|d| d.name == dep.name);
            let in_optional = report.missing_optional.iter().any(|d| d.name == dep.name);
            prop_assert_eq!(in_present, *is_present);
            prop_assert_eq!(in_required, !*is_present && dep.required);
            prop_assert_eq!(in_optional, !*is_present && !dep.required);
        }
    }
}
