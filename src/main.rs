mod cli;
mod commands;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use devstack::{Error as DevError, Task};
use output::{CliOutput, QuietOutput, UserOutput};

/// Set on the re-executed elevated child so it never re-executes again.
const ELEVATED_MARKER: &str = "DEVSTACK_ELEVATED";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let out: Box<dyn UserOutput> = if cli.quiet {
        Box::new(QuietOutput)
    } else {
        Box::new(CliOutput)
    };

    if let Err(e) = run(&cli, out.as_ref()).await {
        if let Some(dev_error) = e.downcast_ref::<DevError>() {
            if let DevError::PrivilegeRequired { reason } = dev_error {
                if cli.command.may_install() && std::env::var_os(ELEVATED_MARKER).is_none() {
                    out.status(&format!("{} requires root; re-running with sudo...", reason));
                    std::process::exit(reexec_elevated().await);
                }
            }
            CliOutput.error(&format!("error[{}]: {}", dev_error.kind(), dev_error));
            if let Some(suggestion) = dev_error.suggestion() {
                CliOutput.error(&format!("\nHint: {}", suggestion));
            }
        } else {
            CliOutput.error(&format!("error: {:#}", e));
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, out: &dyn UserOutput) -> anyhow::Result<()> {
    let mut ctx = Context::load(cli.workdir.clone(), cli.config.clone())?;
    tracing::debug!(
        work_dir = %ctx.settings.work_dir.display(),
        elevated = ctx.identity.is_elevated(),
        "loaded settings"
    );

    match &cli.command {
        Commands::Check => commands::run_check(&ctx, out).await,
        Commands::CheckClusterDeps => commands::run_check_cluster_deps(&ctx, out).await,
        Commands::InstallClusterRuntime => commands::run_install_cluster_runtime(&ctx, out).await,
        Commands::StartCluster => commands::run_start_cluster(&ctx, out).await,
        Commands::StopCluster => commands::run_stop_cluster(&ctx, out).await,
        Commands::ClusterStatus => commands::run_cluster_status(&ctx, out).await,
        Commands::DbUp { services } => commands::run_db_up(&ctx, services, out).await,
        Commands::DbDown { services } => commands::run_db_down(&ctx, services, out).await,
        Commands::DbReset { services } => commands::run_db_reset(&ctx, services, out).await,
        Commands::Migrate => commands::run_migrate(&ctx, out).await,
        Commands::PrepareOfflineQueries => commands::run_prepare_offline_queries(&ctx, out).await,
        Commands::Dev => commands::run_dev_task(&ctx, Task::Dev, out).await,
        Commands::Build => commands::run_dev_task(&ctx, Task::Build, out).await,
        Commands::Test => commands::run_dev_task(&ctx, Task::Test, out).await,
        Commands::Format => commands::run_dev_task(&ctx, Task::Format, out).await,
        Commands::Lint => commands::run_dev_task(&ctx, Task::Lint, out).await,
        Commands::Clean => commands::run_dev_task(&ctx, Task::Clean, out).await,
        Commands::ImageBuild => commands::run_dev_task(&ctx, Task::ImageBuild, out).await,
        Commands::StackUp => commands::run_stack_up(&ctx, out).await,
        Commands::StackDown => commands::run_stack_down(&ctx, out).await,
        Commands::Setup => commands::run_setup(&mut ctx, out).await,
        Commands::SetupWithCluster => commands::run_setup_with_cluster(&mut ctx, out).await,
    }
}

/// Run this same command line again under `sudo -E` and return its exit
/// code. `-E` keeps `DATABASE_URL` and friends; sudo sets `SUDO_USER`, which
/// the child uses to run user-scoped steps as the original account.
async fn reexec_elevated() -> i32 {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            CliOutput.error(&format!("error: cannot locate own executable: {}", e));
            return 1;
        }
    };
    let status = tokio::process::Command::new("sudo")
        .arg("-E")
        .arg(exe)
        .args(std::env::args_os().skip(1))
        .env(ELEVATED_MARKER, "1")
        .status()
        .await;
    match status {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            CliOutput.error(&format!("error: failed to run sudo: {}", e));
            1
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
