//! Migration runner.
//!
//! Delegates to `sqlx-cli`. There is no retry: a failed migration is
//! reported with the tool's own output and re-run by hand once fixed.

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use crate::identity::{IdentityContext, Scope};
use std::path::PathBuf;
use std::time::Duration;

const MIGRATE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

pub struct Migrator<'a> {
    runner: &'a dyn CommandRunner,
    identity: &'a IdentityContext,
    database_url: String,
    migrations_dir: PathBuf,
    work_dir: PathBuf,
}

impl<'a> Migrator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        identity: &'a IdentityContext,
        settings: &Settings,
    ) -> Self {
        Self {
            runner,
            identity,
            database_url: settings.database_url.clone(),
            migrations_dir: settings.migrations_path(),
            work_dir: settings.work_dir.clone(),
        }
    }

    fn command<I, S>(&self, program: &str, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cmd = CommandSpec::new(program)
            .args(args)
            .env("DATABASE_URL", self.database_url.as_str())
            .current_dir(&self.work_dir)
            .timeout(MIGRATE_TIMEOUT);
        self.identity.prepare(Scope::User, cmd)
    }

    async fn run_tool(&self, cmd: CommandSpec) -> Result<()> {
        let out = self.runner.run(&cmd).await.map_err(|e| Error::MigrationFailed {
            exit_code: None,
            output: e.to_string(),
        })?;
        if out.success() {
            Ok(())
        } else {
            Err(Error::MigrationFailed {
                exit_code: out.exit_code,
                output: out.combined(),
            })
        }
    }

    /// Create the database if needed, then apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running migrations from {}", self.migrations_dir.display());
        self.run_tool(self.command("sqlx", ["database", "create"]))
            .await?;
        let source = self.migrations_dir.display().to_string();
        self.run_tool(self.command("sqlx", ["migrate", "run", "--source", source.as_str()]))
            .await?;
        tracing::info!("Migrations applied");
        Ok(())
    }

    /// Regenerate the offline query metadata used for builds without a
    /// live database.
    pub async fn prepare_offline_queries(&self) -> Result<()> {
        self.run_tool(self.command("cargo", ["sqlx", "prepare", "--workspace"]))
            .await
    }
}
