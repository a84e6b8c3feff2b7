//! Local Kubernetes cluster lifecycle.
//!
//! State is never held here: every query asks the cluster runtime. All
//! commands run as the unprivileged identity because the runtime keeps its
//! state and socket under that user's home directory.

mod manager;

pub use manager::ClusterManager;

use std::fmt;
use std::time::Duration;

/// Observed state of the local cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    /// The cluster runtime itself is not installed.
    Absent,
    Stopped,
    Starting,
    Running,
    Unknown,
}

impl ClusterState {
    /// Map the runtime's host-status word onto a state.
    pub fn from_host_status(status: &str) -> ClusterState {
        match status.trim() {
            "Running" => ClusterState::Running,
            "Stopped" | "Nonexistent" | "Paused" => ClusterState::Stopped,
            "Starting" => ClusterState::Starting,
            _ => ClusterState::Unknown,
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterState::Absent => "absent",
            ClusterState::Stopped => "stopped",
            ClusterState::Starting => "starting",
            ClusterState::Running => "running",
            ClusterState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Bounded, fixed-delay retry for cluster start.
///
/// Start failures are dominated by group-membership propagation races,
/// not load, so the delay does not grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(5),
        }
    }
}
