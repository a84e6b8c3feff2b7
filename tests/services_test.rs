//! Service lifecycle: readiness polling, reset ordering, volume tolerance.

mod common;

use common::{Response, ScriptedRunner};
use devstack::services::{ComposeBackend, ServiceManager};
use devstack::{Compose, Error, IdentityContext, Migrator, PollPolicy, Settings};
use std::path::PathBuf;

const POSTGRES_PROBE: &[&str] = &["exec", "-T", "postgres", "pg_isready"];
const REDIS_PROBE: &[&str] = &["exec", "-T", "redis", "redis-cli", "ping"];

fn settings() -> Settings {
    Settings {
        project_name: Some("engine".to_string()),
        work_dir: PathBuf::from("/srv/engine"),
        ..Settings::default()
    }
}

fn compose() -> Compose {
    Compose::new(ComposeBackend::V2, "docker-compose.yml", "engine", "/srv/engine")
}

fn developer() -> IdentityContext {
    IdentityContext::from_parts("dev", None, false)
}

fn healthy(runner: ScriptedRunner) -> ScriptedRunner {
    runner.on(REDIS_PROBE, vec![Response::stdout("PONG\n")])
}

#[tokio::test(start_paused = true)]
async fn database_ready_after_two_failed_probes() {
    let runner = healthy(ScriptedRunner::new()).on(
        POSTGRES_PROBE,
        vec![
            Response::Fail(2, "no response".into()),
            Response::Fail(2, "no response".into()),
            Response::stdout("/var/run/postgresql:5432 - accepting connections\n"),
        ],
    );
    let compose = compose();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());

    let warnings = manager.up_and_wait(&[]).await.unwrap();

    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    assert_eq!(runner.count(POSTGRES_PROBE), 3);
    assert_eq!(runner.count(REDIS_PROBE), 1);
    let up = runner.first_position(&["up", "-d", "postgres", "redis"]).unwrap();
    assert!(up < runner.first_position(POSTGRES_PROBE).unwrap());
}

#[tokio::test(start_paused = true)]
async fn readiness_timeout_is_a_warning() {
    let runner = healthy(ScriptedRunner::new()).on(
        POSTGRES_PROBE,
        vec![Response::Fail(2, "no response".into())],
    );
    let compose = compose();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());

    let warnings = manager.up_and_wait(&[]).await.unwrap();

    assert_eq!(warnings.len(), 1);
    assert!(matches!(
        &warnings[0],
        Error::ServiceReadinessTimeout { service, .. } if service == "postgres"
    ));
    assert_eq!(warnings[0].severity(), devstack::Severity::Warning);
}

#[tokio::test(start_paused = true)]
async fn redis_must_answer_pong() {
    let runner = ScriptedRunner::new().on(REDIS_PROBE, vec![Response::stdout("LOADING\n")]);
    let compose = compose();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());

    let warnings = manager.wait_ready(&["redis".to_string()]).await.unwrap();
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn failed_up_is_fatal() {
    let runner = ScriptedRunner::new().on(
        &["up", "-d"],
        vec![Response::fail("Bind for 0.0.0.0:5432 failed: port is already allocated")],
    );
    let compose = compose();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());

    let err = manager.up(&[]).await.unwrap_err();
    assert!(matches!(err, Error::ServiceStartFailed(_, ref detail) if detail.contains("already allocated")));
}

#[tokio::test]
async fn unknown_service_is_rejected_before_running_anything() {
    let runner = ScriptedRunner::new();
    let compose = compose();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());

    let err = manager.down(&["mysql".to_string()]).await.unwrap_err();
    assert!(matches!(err, Error::Config(ref msg) if msg.contains("mysql")));
    assert!(runner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reset_removes_containers_before_volumes_then_migrates() {
    let runner = healthy(ScriptedRunner::new());
    let compose = compose();
    let settings = settings();
    let identity = developer();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());
    let migrator = Migrator::new(&runner, &identity, &settings);

    let warnings = manager.reset(&[], &migrator).await.unwrap();
    assert!(warnings.is_empty());

    for (service, volume) in [
        ("postgres", "engine_postgres_data"),
        ("redis", "engine_redis_data"),
    ] {
        let stop = runner.first_position(&["stop", service]).unwrap();
        let rm = runner.first_position(&["rm", "-f", "-s", service]).unwrap();
        let vol = runner.first_position(&["volume", "rm", volume]).unwrap();
        assert!(stop < rm, "{service}: stop before rm");
        assert!(rm < vol, "{service}: container removed before volume");
    }

    let last_volume = runner.first_position(&["volume", "rm", "engine_redis_data"]).unwrap();
    let up = runner.first_position(&["up", "-d"]).unwrap();
    let migrate = runner.first_position(&["sqlx", "migrate", "run"]).unwrap();
    assert!(last_volume < up && up < migrate);
    assert_eq!(runner.count(&["sqlx", "database", "create"]), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_tolerates_already_removed_volume() {
    let runner = healthy(ScriptedRunner::new()).on(
        &["volume", "rm"],
        vec![Response::fail(
            "Error response from daemon: get engine_postgres_data: no such volume",
        )],
    );
    let compose = compose();
    let settings = settings();
    let identity = developer();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());
    let migrator = Migrator::new(&runner, &identity, &settings);

    manager
        .reset(&["postgres".to_string()], &migrator)
        .await
        .unwrap();
    assert_eq!(runner.count(&["up", "-d", "postgres"]), 1);
}

#[tokio::test]
async fn volume_in_use_fails_loudly() {
    let runner = ScriptedRunner::new().on(
        &["volume", "rm"],
        vec![Response::fail(
            "Error response from daemon: remove engine_redis_data: volume is in use - [3f2a]",
        )],
    );
    let compose = compose();
    let settings = settings();
    let identity = developer();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());
    let migrator = Migrator::new(&runner, &identity, &settings);

    let err = manager
        .reset(&["redis".to_string()], &migrator)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("volume is in use"));
    assert_eq!(runner.count(&["up", "-d"]), 0);
}

#[tokio::test(start_paused = true)]
async fn cache_only_reset_skips_migrations() {
    let runner = healthy(ScriptedRunner::new());
    let compose = compose();
    let settings = settings();
    let identity = developer();
    let manager = ServiceManager::new(&runner, &compose, PollPolicy::default());
    let migrator = Migrator::new(&runner, &identity, &settings);

    manager.reset(&["redis".to_string()], &migrator).await.unwrap();
    assert_eq!(runner.count(&["sqlx"]), 0);
}

#[tokio::test]
async fn migration_failure_carries_tool_output() {
    let runner = ScriptedRunner::new().on(
        &["sqlx", "migrate", "run"],
        vec![Response::Fail(
            1,
            "error: while executing migrations: relation \"users\" already exists".into(),
        )],
    );
    let settings = settings();
    let identity = developer();
    let err = Migrator::new(&runner, &identity, &settings)
        .migrate()
        .await
        .unwrap_err();

    match err {
        Error::MigrationFailed { exit_code, output } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(
                output,
                "error: while executing migrations: relation \"users\" already exists"
            );
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let migrate = runner
        .raw_calls()
        .into_iter()
        .find(|c| c.args.iter().any(|a| a == "migrate"))
        .unwrap();
    assert_eq!(
        migrate.env.get("DATABASE_URL").map(String::as_str),
        Some(settings.database_url.as_str())
    );
    assert_eq!(
        migrate.args,
        vec!["migrate", "run", "--source", "/srv/engine/migrations"]
    );
}

#[tokio::test]
async fn compose_backend_falls_back_to_v1_then_gives_up() {
    let v1 = ScriptedRunner::new().on(&["docker", "compose", "version"], vec![Response::fail("unknown")]);
    assert_eq!(
        ComposeBackend::detect(&v1).await.unwrap(),
        ComposeBackend::V1
    );

    let none = ScriptedRunner::new()
        .on(&["docker", "compose", "version"], vec![Response::fail("unknown")])
        .on(&["docker-compose", "--version"], vec![Response::NotFound]);
    assert!(matches!(
        ComposeBackend::detect(&none).await,
        Err(Error::DockerComposeUnavailable)
    ));
}
