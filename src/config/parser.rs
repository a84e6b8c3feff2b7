use super::duration::parse_duration_string;
use super::env_file::load_env_file;
use super::Settings;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAMES: &[&str] = &["devstack.yaml", "devstack.yml"];

/// Environment variables that override configuration.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_REDIS_URL: &str = "REDIS_URL";
pub const ENV_CLUSTER_START_ATTEMPTS: &str = "DEVSTACK_CLUSTER_START_ATTEMPTS";
pub const ENV_CLUSTER_START_BACKOFF: &str = "DEVSTACK_CLUSTER_START_BACKOFF";
pub const ENV_COMPOSE_FILE: &str = "DEVSTACK_COMPOSE_FILE";

pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Locate `devstack.yaml` in `dir`. Absence is normal: defaults apply.
    pub fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
    }

    pub fn parse_settings(&self, content: &str) -> Result<Settings> {
        if content.trim().is_empty() {
            return Ok(Settings::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load settings for `work_dir` using every layer: defaults, config
    /// file, `.env`, then the process environment.
    pub fn load(&self, work_dir: &Path, config_path: Option<&Path>) -> Result<Settings> {
        let process_env: HashMap<String, String> = std::env::vars().collect();
        self.load_with_env(work_dir, config_path, &process_env)
    }

    /// Same as [`load`](Self::load) with an explicit environment map.
    pub fn load_with_env(
        &self,
        work_dir: &Path,
        config_path: Option<&Path>,
        process_env: &HashMap<String, String>,
    ) -> Result<Settings> {
        let config_path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_in_dir(work_dir),
        };

        let mut settings = match &config_path {
            Some(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!(
                        "Failed to read config file '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                tracing::debug!("Loaded settings from {}", path.display());
                self.parse_settings(&content)?
            }
            None => Settings::default(),
        };
        settings.work_dir = work_dir.to_path_buf();

        let env_path = settings.env_path();
        if env_path.exists() {
            let file_env = load_env_file(&env_path)?;
            apply_overrides(&mut settings, &file_env)?;
        }
        apply_overrides(&mut settings, process_env)?;

        Ok(settings)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply recognised variables from `vars` on top of `settings`.
pub fn apply_overrides(settings: &mut Settings, vars: &HashMap<String, String>) -> Result<()> {
    if let Some(url) = non_empty(vars, ENV_DATABASE_URL) {
        settings.database_url = url.to_string();
    }
    if let Some(url) = non_empty(vars, ENV_REDIS_URL) {
        settings.redis_url = url.to_string();
    }
    if let Some(file) = non_empty(vars, ENV_COMPOSE_FILE) {
        settings.compose_file = PathBuf::from(file);
    }
    if let Some(raw) = non_empty(vars, ENV_CLUSTER_START_ATTEMPTS) {
        let attempts = raw.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
            Error::Config(format!(
                "{} must be a positive integer, got '{}'",
                ENV_CLUSTER_START_ATTEMPTS, raw
            ))
        })?;
        settings.cluster.start_attempts = attempts;
    }
    if let Some(raw) = non_empty(vars, ENV_CLUSTER_START_BACKOFF) {
        settings.cluster.start_backoff = parse_duration_string(raw).ok_or_else(|| {
            Error::Config(format!(
                "{} must be a duration like \"5s\", got '{}'",
                ENV_CLUSTER_START_BACKOFF, raw
            ))
        })?;
    }
    Ok(())
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}
