//! External command execution.
//!
//! Every process this crate launches is described by a [`CommandSpec`] and
//! handed to a [`CommandRunner`]. The production runner is [`SystemRunner`];
//! tests substitute a scripted runner that records calls in order.

pub mod error;
pub mod runner;

pub use error::ExecError;
pub use runner::{CommandRunner, SystemRunner};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Whether a command's stdio is captured or passed through to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioMode {
    #[default]
    Captured,
    Inherited,
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub current_dir: Option<PathBuf>,
    pub stdio: StdioMode,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            current_dir: None,
            stdio: StdioMode::Captured,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn inherit_stdio(mut self) -> Self {
        self.stdio = StdioMode::Inherited;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-like rendering used in logs and error messages. Environment
    /// values are omitted since they may carry credentials.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// The program an `env` wrapper (plain or behind `sudo`) launches.
    pub fn wrapped_program(&self) -> Option<&str> {
        let rest: &[String] = if self.program == "env" {
            &self.args
        } else if self.program == "sudo" {
            let at = self.args.iter().position(|a| a == "env")?;
            &self.args[at + 1..]
        } else {
            return None;
        };
        rest.iter()
            .map(String::as_str)
            .find(|a| !a.contains('=') && !a.starts_with('-'))
    }

    /// True if this command's program and leading arguments equal `prefix`.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        let Some((program, rest)) = prefix.split_first() else {
            return true;
        };
        self.program == *program
            && rest.len() <= self.args.len()
            && rest.iter().zip(&self.args).all(|(a, b)| a == b)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, trimmed. Used where a tool's output is
    /// reported verbatim.
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim_end();
        let stderr = self.stderr.trim_end();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }

    /// First non-empty line of stdout (typically a version banner).
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let cmd = CommandSpec::new("docker").args(["compose", "version"]);
        assert!(cmd.starts_with(&["docker"]));
        assert!(cmd.starts_with(&["docker", "compose"]));
        assert!(!cmd.starts_with(&["docker", "info"]));
        assert!(!cmd.starts_with(&["docker", "compose", "version", "--short"]));
        assert_eq!(cmd.display(), "docker compose version");
    }

    #[test]
    fn wrapped_program_skips_env_assignments() {
        let cmd = CommandSpec::new("sudo").args([
            "-u", "dev", "-H", "env", "PATH=/home/dev/.cargo/bin:/usr/bin", "sqlx", "migrate", "run",
        ]);
        assert_eq!(cmd.wrapped_program(), Some("sqlx"));
        assert_eq!(CommandSpec::new("env").args(["A=1", "cargo"]).wrapped_program(), Some("cargo"));
        assert_eq!(CommandSpec::new("cargo").arg("build").wrapped_program(), None);
    }

    #[test]
    fn combined_output_keeps_both_streams() {
        let out = CommandOutput {
            exit_code: Some(1),
            stdout: "Applied 1/migrate init\n".into(),
            stderr: "error: checksum mismatch\n".into(),
        };
        assert!(!out.success());
        assert_eq!(
            out.combined(),
            "Applied 1/migrate init\nerror: checksum mismatch"
        );
    }
}
