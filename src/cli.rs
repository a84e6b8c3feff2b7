use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devstack", version)]
#[command(about = "devstack - Bootstrap and drive the local development environment")]
pub struct Cli {
    /// Config file path (defaults to devstack.yaml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Working directory (project root)
    #[arg(short, long, global = true)]
    pub workdir: Option<PathBuf>,

    /// Suppress user-facing output (logs still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check base development dependencies
    Check,
    /// Check container engine and cluster tooling
    CheckClusterDeps,
    /// Install missing cluster tooling (kubectl, minikube)
    InstallClusterRuntime,
    /// Start the local cluster (retries on failure)
    StartCluster,
    /// Stop the local cluster
    StopCluster,
    /// Show local cluster state
    ClusterStatus,
    /// Start database and cache, then wait for readiness
    DbUp {
        /// Services to start (defaults to all)
        services: Vec<String>,
    },
    /// Stop database and cache
    DbDown {
        /// Services to stop (defaults to all)
        services: Vec<String>,
    },
    /// Destroy and recreate database and cache volumes, then migrate
    DbReset {
        /// Services to reset (defaults to all)
        services: Vec<String>,
    },
    /// Apply database migrations
    Migrate,
    /// Regenerate offline query metadata (cargo sqlx prepare)
    PrepareOfflineQueries,
    /// Run the application (auto-reload when cargo-watch is installed)
    Dev,
    /// cargo build
    Build,
    /// cargo test
    Test,
    /// cargo fmt --all
    Format,
    /// cargo clippy with warnings denied
    Lint,
    /// cargo clean
    Clean,
    /// Build the application container image
    ImageBuild,
    /// Bring up the whole compose stack
    StackUp,
    /// Tear down the whole compose stack
    StackDown,
    /// Install dependencies, start services, and migrate
    Setup,
    /// Setup plus cluster tooling and a running cluster
    SetupWithCluster,
}

impl Commands {
    /// Commands that may need to install system packages.
    pub fn may_install(&self) -> bool {
        matches!(
            self,
            Commands::InstallClusterRuntime | Commands::Setup | Commands::SetupWithCluster
        )
    }
}
