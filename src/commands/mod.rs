mod check;
mod cluster;
mod db;
mod install;
mod setup;
mod tasks;

pub use check::{run_check, run_check_cluster_deps};
pub use cluster::{run_cluster_status, run_start_cluster, run_stop_cluster};
pub use db::{
    run_db_down, run_db_reset, run_db_up, run_migrate, run_prepare_offline_queries,
    run_stack_down, run_stack_up,
};
pub use install::run_install_cluster_runtime;
pub use setup::{run_setup, run_setup_with_cluster};
pub use tasks::run_dev_task;

use crate::output::UserOutput;
use devstack::{
    Bootstrap, ClusterManager, Compose, Error, IdentityContext, Migrator, Parser, Settings,
    SystemRunner,
};
use std::path::{Path, PathBuf};

/// Everything a command needs, resolved once at startup.
pub struct Context {
    pub runner: SystemRunner,
    pub identity: IdentityContext,
    pub settings: Settings,
    config_path: Option<PathBuf>,
}

impl Context {
    pub fn load(workdir: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<Self> {
        let work_dir = match workdir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let settings = Parser::new().load(&work_dir, config.as_deref())?;
        Ok(Self {
            runner: SystemRunner::new(),
            identity: IdentityContext::detect(),
            settings,
            config_path: config,
        })
    }

    /// Re-read settings, e.g. after `.env` was created.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let work_dir = self.settings.work_dir.clone();
        self.settings = Parser::new().load(Path::new(&work_dir), self.config_path.as_deref())?;
        Ok(())
    }

    pub fn bootstrap(&self) -> Bootstrap<'_> {
        Bootstrap::new(&self.runner, &self.identity, &self.settings)
    }

    pub fn cluster(&self) -> ClusterManager<'_> {
        ClusterManager::new(&self.runner, &self.identity, &self.settings.cluster)
    }

    pub fn migrator(&self) -> Migrator<'_> {
        Migrator::new(&self.runner, &self.identity, &self.settings)
    }

    pub async fn compose(&self) -> devstack::Result<Compose> {
        Compose::detect(
            &self.runner,
            self.settings.compose_path(),
            self.settings.compose_project(),
            &self.settings.work_dir,
        )
        .await
    }
}

/// Print warning-level problems without stopping.
pub fn report_warnings(warnings: &[Error], out: &dyn UserOutput) {
    for warning in warnings {
        out.warning(&format!("warning[{}]: {}", warning.kind(), warning));
        if let Some(hint) = warning.suggestion() {
            out.warning(&format!("  Hint: {}", hint));
        }
    }
}
