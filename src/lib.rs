#![allow(unused_assignments)]

//! # devstack
//!
//! Bootstrapper for a local development environment built around a
//! containerized application stack.
//!
//! ## Features
//!
//! - **Dependency reconciliation**: probe the toolchain, container engine,
//!   compose, cluster tools and migration CLI, reporting every gap in one pass
//! - **OS-conditional remediation**: one (dependency kind × OS family) table
//!   selects the install sequence for Debian-like, RHEL-like and macOS hosts
//! - **Cluster lifecycle**: idempotent start with bounded, fixed-delay retry
//! - **Service lifecycle**: compose-driven up/down/reset of the database and
//!   cache with bounded readiness polling
//! - **Migrations**: `sqlx-cli` driven, with verbatim failure output
//!
//! ## Quick Start
//!
//! ```no_run
//! use devstack::{Bootstrap, IdentityContext, Parser, SystemRunner};
//!
//! # async fn example() -> Result<(), devstack::Error> {
//! let settings = Parser::new().load(std::path::Path::new("."), None)?;
//! let runner = SystemRunner::new();
//! let identity = IdentityContext::detect();
//!
//! let report = Bootstrap::new(&runner, &identity, &settings).setup().await?;
//! for warning in &report.warnings {
//!     eprintln!("warning: {}", warning);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution model
//!
//! Strictly sequential: one external command is in flight at a time. Every
//! check is re-derived from the live host, so an interrupted run can simply
//! be repeated.

pub mod bootstrap;
pub mod cluster;
pub mod config;
pub mod dependency;
pub mod error;
pub mod exec;
pub mod identity;
pub mod install;
pub mod migrate;
pub mod os_profile;
pub mod services;
pub mod tasks;

pub use bootstrap::{materialize_env, Bootstrap, SetupReport};
pub use cluster::{ClusterManager, ClusterState, RetryPolicy};
pub use config::{Parser, Settings};
pub use dependency::{Dependency, DependencyKind, ReconciliationReport, Registry};
pub use error::{Error, Result, Severity};
pub use exec::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use identity::{IdentityContext, Scope};
pub use install::Installer;
pub use migrate::Migrator;
pub use os_profile::{OsFamily, OsProfile};
pub use services::{Compose, PollPolicy, ServiceManager, ServiceSpec};
pub use tasks::Task;
