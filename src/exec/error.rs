use super::{CommandOutput, CommandSpec};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Exit status `env`, `sh` and `sudo ... env` use when the program they
/// were asked to run does not exist.
const EXIT_PROGRAM_MISSING: i32 = 127;

/// Why an external command did not produce a usable result.
///
/// A missing program is `NotFound` whether the spawn itself failed or a
/// wrapper (`sudo -u ... env`) reported it with exit 127.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("'{program}' is not installed or not on PATH")]
    NotFound { program: String },

    #[error("Could not launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' exited with {}: {stderr}", exit_label(.exit_code))]
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("'{command}' did not finish within {}s", .after.as_secs())]
    TimedOut { command: String, after: Duration },
}

impl ExecError {
    /// Classify a spawn failure.
    pub fn from_spawn(cmd: &CommandSpec, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ExecError::NotFound {
                program: cmd.program.clone(),
            }
        } else {
            ExecError::Launch {
                command: cmd.display(),
                source: err,
            }
        }
    }

    /// Classify a finished, unsuccessful command.
    pub fn from_output(cmd: &CommandSpec, output: &CommandOutput) -> Self {
        if output.program_missing() {
            if let Some(program) = cmd.wrapped_program() {
                return ExecError::NotFound {
                    program: program.to_string(),
                };
            }
        }
        ExecError::NonZeroExit {
            command: cmd.display(),
            exit_code: output.exit_code,
            stderr: output.stderr.trim().to_string(),
        }
    }

    pub fn timed_out(cmd: &CommandSpec, after: Duration) -> Self {
        ExecError::TimedOut {
            command: cmd.display(),
            after,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::NotFound { .. })
    }
}

impl CommandOutput {
    /// The program itself was missing, as reported by a wrapper.
    pub fn program_missing(&self) -> bool {
        self.exit_code == Some(EXIT_PROGRAM_MISSING)
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(exit_code: i32, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn spawn_not_found_names_the_program() {
        let cmd = CommandSpec::new("kubectl").args(["version", "--client"]);
        let err = ExecError::from_spawn(&cmd, io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "'kubectl' is not installed or not on PATH");

        let denied = ExecError::from_spawn(&cmd, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!denied.is_not_found());
    }

    #[test]
    fn wrapped_missing_program_is_not_found() {
        let cmd = CommandSpec::new("sudo").args(["-u", "dev", "-H", "env", "PATH=/bin", "minikube", "stop"]);
        let err = ExecError::from_output(
            &cmd,
            &output(127, "env: 'minikube': No such file or directory"),
        );
        assert!(matches!(err, ExecError::NotFound { ref program } if program == "minikube"));

        // A script exiting 127 names no program of its own.
        let script = CommandSpec::new("sh").args(["-c", "missing-tool --flag"]);
        let err = ExecError::from_output(&script, &output(127, "sh: missing-tool: not found"));
        assert!(matches!(err, ExecError::NonZeroExit { exit_code: Some(127), .. }));
    }

    #[test]
    fn ordinary_failure_keeps_exit_code_and_stderr() {
        let cmd = CommandSpec::new("minikube").arg("stop");
        let err = ExecError::from_output(&cmd, &output(85, "no cluster\n"));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "'minikube stop' exited with exit code 85: no cluster");
    }
}
