//! Backing-service lifecycle (database, cache) through the compose
//! orchestrator.

mod compose;
mod lifecycle;
mod readiness;

pub use compose::{Compose, ComposeBackend};
pub use lifecycle::{ServiceManager, ServiceSpec};
pub use readiness::{wait_until_ready, ComposeExecProbe, PollPolicy, ReadinessProbe};
