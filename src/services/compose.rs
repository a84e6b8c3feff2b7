use crate::error::{Error, Result};
use crate::exec::{CommandRunner, CommandSpec};
use std::path::PathBuf;
use std::time::Duration;

const DETECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Which compose implementation is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeBackend {
    /// `docker compose` plugin.
    V2,
    /// Standalone `docker-compose` binary.
    V1,
}

impl ComposeBackend {
    /// Prefer the v2 plugin and fall back to the v1 binary.
    pub async fn detect(runner: &dyn CommandRunner) -> Result<Self> {
        let v2 = CommandSpec::new("docker")
            .args(["compose", "version"])
            .timeout(DETECT_TIMEOUT);
        if matches!(runner.run(&v2).await, Ok(out) if out.success()) {
            return Ok(ComposeBackend::V2);
        }

        let v1 = CommandSpec::new("docker-compose")
            .arg("--version")
            .timeout(DETECT_TIMEOUT);
        if matches!(runner.run(&v1).await, Ok(out) if out.success()) {
            tracing::debug!("Using standalone docker-compose (v1)");
            return Ok(ComposeBackend::V1);
        }

        Err(Error::DockerComposeUnavailable)
    }

    fn base(&self) -> CommandSpec {
        match self {
            ComposeBackend::V2 => CommandSpec::new("docker").arg("compose"),
            ComposeBackend::V1 => CommandSpec::new("docker-compose"),
        }
    }
}

/// A compose project bound to one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compose {
    backend: ComposeBackend,
    file: PathBuf,
    project: String,
    work_dir: PathBuf,
}

impl Compose {
    pub fn new(
        backend: ComposeBackend,
        file: impl Into<PathBuf>,
        project: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            file: file.into(),
            project: project.into(),
            work_dir: work_dir.into(),
        }
    }

    pub async fn detect(
        runner: &dyn CommandRunner,
        file: impl Into<PathBuf>,
        project: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let backend = ComposeBackend::detect(runner).await?;
        Ok(Self::new(backend, file, project, work_dir))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Named volumes are prefixed with the project name.
    pub fn volume_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.project, suffix)
    }

    /// `<compose> -f <file> -p <project> <args...>`, run from the project
    /// directory so compose picks up its `.env`.
    pub fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backend
            .base()
            .arg("-f")
            .arg(self.file.display().to_string())
            .args(["-p", self.project.as_str()])
            .args(args)
            .current_dir(&self.work_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn v2_command_layout() {
        let compose = Compose::new(ComposeBackend::V2, "docker-compose.yml", "engine", "/srv");
        let cmd = compose.command(["up", "-d", "postgres"]);
        assert_eq!(cmd.program, "docker");
        assert_eq!(
            cmd.args,
            vec!["compose", "-f", "docker-compose.yml", "-p", "engine", "up", "-d", "postgres"]
        );
        assert_eq!(cmd.current_dir.as_deref(), Some(Path::new("/srv")));
    }

    #[test]
    fn v1_command_layout() {
        let compose = Compose::new(ComposeBackend::V1, "dc.yml", "engine", ".");
        let cmd = compose.command(["stop"]);
        assert_eq!(cmd.program, "docker-compose");
        assert_eq!(cmd.args, vec!["-f", "dc.yml", "-p", "engine", "stop"]);
    }

    #[test]
    fn volume_names_are_project_scoped() {
        let compose = Compose::new(ComposeBackend::V2, "dc.yml", "container-engine", ".");
        assert_eq!(
            compose.volume_name("postgres_data"),
            "container-engine_postgres_data"
        );
    }
}
