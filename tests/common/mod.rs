//! Scripted command runner for integration tests.
//!
//! Rules match a contiguous run of tokens anywhere in the command line
//! (program plus arguments, with any `sudo -u <user> -H env K=V` wrapper
//! stripped). The longest matching rule wins. Each rule answers from a
//! queue of responses, repeating the last one once the queue is drained.
//! Every call is recorded in order.

#![allow(dead_code)]

use async_trait::async_trait;
use devstack::exec::ExecError;
use devstack::{CommandOutput, CommandRunner, CommandSpec};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub enum Response {
    Ok(String),
    Fail(i32, String),
    NotFound,
}

impl Response {
    pub fn ok() -> Self {
        Response::Ok(String::new())
    }

    pub fn stdout(s: &str) -> Self {
        Response::Ok(s.to_string())
    }

    pub fn fail(stderr: &str) -> Self {
        Response::Fail(1, stderr.to_string())
    }

    fn answer(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
        match self {
            Response::Ok(stdout) => Ok(CommandOutput {
                exit_code: Some(0),
                stdout: stdout.clone(),
                stderr: String::new(),
            }),
            Response::Fail(code, stderr) => Ok(CommandOutput {
                exit_code: Some(*code),
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
            Response::NotFound => Err(ExecError::from_spawn(
                cmd,
                std::io::Error::from(std::io::ErrorKind::NotFound),
            )),
        }
    }
}

struct Rule {
    tokens: Vec<String>,
    responses: VecDeque<Response>,
}

pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    fallback: Response,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    /// Unmatched commands succeed with empty output.
    pub fn new() -> Self {
        Self::with_fallback(Response::ok())
    }

    pub fn with_fallback(fallback: Response) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer commands containing `tokens` with `responses` in order.
    pub fn on(self, tokens: &[&str], responses: Vec<Response>) -> Self {
        assert!(!responses.is_empty(), "a rule needs at least one response");
        self.rules.lock().unwrap().push(Rule {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            responses: responses.into(),
        });
        self
    }

    /// Every recorded call as its effective token list.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().iter().map(effective).collect()
    }

    /// The raw specs as handed to the runner (wrappers included).
    pub fn raw_calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, tokens: &[&str]) -> usize {
        self.calls().iter().filter(|c| contains(c, tokens)).count()
    }

    /// Indices of calls containing `tokens`.
    pub fn positions(&self, tokens: &[&str]) -> Vec<usize> {
        self.calls()
            .iter()
            .enumerate()
            .filter(|(_, c)| contains(c, tokens))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn first_position(&self, tokens: &[&str]) -> Option<usize> {
        self.positions(tokens).into_iter().next()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(cmd.clone());
        let line = effective(cmd);

        let mut rules = self.rules.lock().unwrap();
        let best = rules
            .iter_mut()
            .filter(|r| contains(&line, &r.tokens))
            .max_by_key(|r| r.tokens.len());
        let response = match best {
            Some(rule) if rule.responses.len() > 1 => rule.responses.pop_front().unwrap(),
            Some(rule) => rule.responses[0].clone(),
            None => self.fallback.clone(),
        };
        response.answer(cmd)
    }
}

/// Program plus args, with a `sudo -u <user> -H env [K=V ...]` prefix removed.
pub fn effective(cmd: &CommandSpec) -> Vec<String> {
    let mut line: Vec<String> = std::iter::once(cmd.program.clone())
        .chain(cmd.args.iter().cloned())
        .collect();
    if line.len() > 4 && line[0] == "sudo" && line[1] == "-u" && line[3] == "-H" && line[4] == "env"
    {
        line.drain(..5);
        while line.first().is_some_and(|t| t.contains('=') && !t.starts_with('-')) {
            line.remove(0);
        }
    }
    line
}

fn contains<S: AsRef<str>>(line: &[String], tokens: &[S]) -> bool {
    if tokens.is_empty() {
        return true;
    }
    line.windows(tokens.len())
        .any(|w| w.iter().zip(tokens).all(|(a, b)| a == b.as_ref()))
}
