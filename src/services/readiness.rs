//! Bounded readiness polling.
//!
//! A [`ReadinessProbe`] answers "does this service accept requests right
//! now"; [`wait_until_ready`] repeats it on a fixed interval until it
//! succeeds or the deadline passes. All waiting goes through `tokio::time`
//! so tests can run against paused time.

use super::compose::Compose;
use super::lifecycle::ServiceSpec;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed wait after `up` before the first probe.
    pub settle: Duration,
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(3),
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}

#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// One round trip. Errors count as "not ready".
    async fn probe(&self, service: &ServiceSpec) -> bool;
}

/// Runs the service's ping command inside its container.
pub struct ComposeExecProbe<'a> {
    runner: &'a dyn CommandRunner,
    compose: &'a Compose,
}

impl<'a> ComposeExecProbe<'a> {
    pub fn new(runner: &'a dyn CommandRunner, compose: &'a Compose) -> Self {
        Self { runner, compose }
    }
}

#[async_trait]
impl ReadinessProbe for ComposeExecProbe<'_> {
    async fn probe(&self, service: &ServiceSpec) -> bool {
        let cmd = self
            .compose
            .command(["exec", "-T", service.name.as_str()])
            .args(service.ready_command.iter().map(String::as_str))
            .timeout(PROBE_TIMEOUT);
        match self.runner.run(&cmd).await {
            Ok(out) if out.success() => match &service.ready_output {
                Some(expected) => out.stdout.trim() == expected,
                None => true,
            },
            Ok(_) => false,
            Err(e) => {
                tracing::debug!("Readiness probe for '{}' errored: {}", service.name, e);
                false
            }
        }
    }
}

/// Probe until ready. Returns the number of probes issued.
///
/// The probe is always attempted at least once, even with a zero budget.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    service: &ServiceSpec,
    policy: &PollPolicy,
) -> Result<u32> {
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if probe.probe(service).await {
            tracing::info!("Service '{}' ready after {} probe(s)", service.name, attempts);
            return Ok(attempts);
        }

        let waited = start.elapsed();
        if waited + policy.interval > policy.max_wait {
            return Err(Error::ServiceReadinessTimeout {
                service: service.name.clone(),
                waited,
            });
        }
        tracing::debug!("Service '{}' not ready yet, waiting...", service.name);
        tokio::time::sleep(policy.interval).await;
    }
}
