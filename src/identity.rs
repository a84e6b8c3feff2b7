//! Invoking versus unprivileged identity.
//!
//! When `devstack` runs under sudo, system packages are installed as root
//! but cluster and toolchain commands must still run as the developer: the
//! cluster runtime keeps its state and socket under that user's home, and
//! rustup/cargo installs live in `~/.cargo`.

use crate::error::{Error, Result};
use crate::exec::CommandSpec;
use std::path::PathBuf;

/// Search path used when the caller's own PATH is unknown or reset by sudo.
const SYSTEM_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Which identity a command must run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Needs root (package managers, systemctl, usermod).
    System,
    /// Must run as the unprivileged developer account.
    User,
    /// Runs as whoever the process is.
    Current,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    invoking_user: String,
    unprivileged_user: String,
    unprivileged_home: Option<PathBuf>,
    inherited_path: Option<String>,
    elevated: bool,
}

impl IdentityContext {
    /// Resolve the identity from the effective uid and `SUDO_USER`.
    pub fn detect() -> Self {
        let euid = nix::unistd::geteuid();
        let invoking_user = nix::unistd::User::from_uid(euid)
            .ok()
            .flatten()
            .map(|u| u.name)
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| euid.to_string());
        let sudo_user = std::env::var("SUDO_USER").ok();
        let mut ctx = Self::from_parts(invoking_user, sudo_user, euid.is_root());
        ctx.unprivileged_home = nix::unistd::User::from_name(&ctx.unprivileged_user)
            .ok()
            .flatten()
            .map(|u| u.dir);
        ctx.inherited_path = std::env::var("PATH").ok().filter(|p| !p.is_empty());
        tracing::debug!(
            invoking = %ctx.invoking_user,
            unprivileged = %ctx.unprivileged_user,
            elevated = ctx.elevated,
            "resolved identity"
        );
        ctx
    }

    /// Build an identity from already-known facts.
    ///
    /// The unprivileged user is the sudo caller when elevated and the caller
    /// is not root itself; otherwise it is the invoking user.
    pub fn from_parts(
        invoking_user: impl Into<String>,
        sudo_user: Option<String>,
        elevated: bool,
    ) -> Self {
        let invoking_user = invoking_user.into();
        let unprivileged_user = match sudo_user {
            Some(user) if elevated && !user.is_empty() && user != "root" => user,
            _ => invoking_user.clone(),
        };
        Self {
            invoking_user,
            unprivileged_user,
            unprivileged_home: None,
            inherited_path: None,
            elevated,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.unprivileged_home = Some(home.into());
        self
    }

    pub fn invoking_user(&self) -> &str {
        &self.invoking_user
    }

    pub fn unprivileged_user(&self) -> &str {
        &self.unprivileged_user
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    /// Fails with [`Error::PrivilegeRequired`] unless the process is elevated.
    pub fn require_elevated(&self, reason: impl Into<String>) -> Result<()> {
        if self.elevated {
            Ok(())
        } else {
            Err(Error::PrivilegeRequired {
                reason: reason.into(),
            })
        }
    }

    /// Rewrite `cmd` so that it executes under the identity `scope` demands.
    ///
    /// User-scoped commands always search the developer's `~/.cargo/bin`
    /// first, so tools installed earlier in the same run (rustup, sqlx-cli)
    /// resolve without a new login shell. In an elevated process they also
    /// become `sudo -u <user> -H env ... <program>`; sudo resets the
    /// environment, so explicit variables are passed through `env`.
    pub fn prepare(&self, scope: Scope, mut cmd: CommandSpec) -> CommandSpec {
        if scope != Scope::User {
            return cmd;
        }
        let wrap = self.elevated && self.unprivileged_user != self.invoking_user;
        let search_path = self.user_search_path(wrap);

        if !wrap {
            if let Some(path) = search_path {
                cmd.env.insert("PATH".to_string(), path);
            }
            return cmd;
        }

        let mut wrapped = CommandSpec::new("sudo")
            .args(["-u", self.unprivileged_user.as_str(), "-H", "env"]);
        if let Some(path) = search_path {
            wrapped = wrapped.arg(format!("PATH={}", path));
        }
        for (key, value) in &cmd.env {
            wrapped = wrapped.arg(format!("{}={}", key, value));
        }
        wrapped = wrapped.arg(cmd.program).args(cmd.args);
        wrapped.current_dir = cmd.current_dir;
        wrapped.stdio = cmd.stdio;
        wrapped.timeout = cmd.timeout;
        wrapped
    }

    /// `<home>/.cargo/bin` ahead of the base search path. Under sudo the
    /// caller's PATH belongs to root, so the system default is used instead.
    fn user_search_path(&self, under_sudo: bool) -> Option<String> {
        let cargo_bin = self.unprivileged_home.as_ref()?.join(".cargo").join("bin");
        let cargo_bin = cargo_bin.display().to_string();
        let base = match &self.inherited_path {
            Some(path) if !under_sudo => path.as_str(),
            _ => SYSTEM_PATH,
        };
        if base.split(':').next() == Some(cargo_bin.as_str()) {
            return Some(base.to_string());
        }
        Some(format!("{}:{}", cargo_bin, base))
    }
}
