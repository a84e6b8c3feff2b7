//! Developer tasks: thin, linear wrappers over cargo and docker with the
//! terminal attached.

use crate::config::Settings;
use crate::error::Result;
use crate::exec::{CommandRunner, CommandSpec, ExecError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Dev,
    Build,
    Test,
    Format,
    Lint,
    Clean,
    ImageBuild,
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::Dev => "dev",
            Task::Build => "build",
            Task::Test => "test",
            Task::Format => "format",
            Task::Lint => "lint",
            Task::Clean => "clean",
            Task::ImageBuild => "image-build",
        }
    }

    /// `watch` selects the auto-reload variant of `dev`.
    pub fn command(&self, settings: &Settings, watch: bool) -> CommandSpec {
        let cmd = match self {
            Task::Dev if watch => CommandSpec::new("cargo").args(["watch", "-x", "run"]),
            Task::Dev => CommandSpec::new("cargo").arg("run"),
            Task::Build => CommandSpec::new("cargo").arg("build"),
            Task::Test => CommandSpec::new("cargo").arg("test"),
            Task::Format => CommandSpec::new("cargo").args(["fmt", "--all"]),
            Task::Lint => {
                CommandSpec::new("cargo").args(["clippy", "--all-targets", "--", "-D", "warnings"])
            }
            Task::Clean => CommandSpec::new("cargo").arg("clean"),
            Task::ImageBuild => {
                CommandSpec::new("docker").args(["build", "-t", settings.image_tag.as_str(), "."])
            }
        };
        cmd.env("DATABASE_URL", settings.database_url.as_str())
            .env("REDIS_URL", settings.redis_url.as_str())
            .current_dir(&settings.work_dir)
            .inherit_stdio()
    }
}

/// Run a task in the foreground.
pub async fn run_task(
    runner: &dyn CommandRunner,
    settings: &Settings,
    task: Task,
    watch_available: bool,
) -> Result<()> {
    if task == Task::Dev && !watch_available {
        tracing::info!("cargo-watch not installed, running without auto-reload");
    }
    let cmd = task.command(settings, watch_available);
    tracing::debug!(task = task.name(), command = %cmd, "running task");
    let out = runner.run(&cmd).await?;
    if out.success() {
        Ok(())
    } else {
        Err(ExecError::from_output(&cmd, &out).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::StdioMode;

    #[test]
    fn dev_prefers_watch() {
        let settings = Settings::default();
        assert!(Task::Dev
            .command(&settings, true)
            .starts_with(&["cargo", "watch", "-x", "run"]));
        assert!(Task::Dev.command(&settings, false).starts_with(&["cargo", "run"]));
    }

    #[test]
    fn tasks_inherit_terminal_and_carry_urls() {
        let settings = Settings::default();
        let cmd = Task::Lint.command(&settings, false);
        assert_eq!(cmd.stdio, StdioMode::Inherited);
        assert_eq!(cmd.env.get("REDIS_URL").map(String::as_str), Some("redis://localhost:6379"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("warnings"));
    }

    #[test]
    fn image_build_uses_configured_tag() {
        let settings = Settings {
            image_tag: "engine:dev".to_string(),
            ..Settings::default()
        };
        assert!(Task::ImageBuild
            .command(&settings, false)
            .starts_with(&["docker", "build", "-t", "engine:dev", "."]));
    }
}
