//! `.env` handling.
//!
//! The working copy of `.env` is materialized from the checked-in example
//! template on first run and never overwritten afterwards. Its values feed
//! configuration without being exported into this process's environment.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::Path;

/// What [`ensure_env_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileOutcome {
    /// The template was copied into place.
    Created,
    /// A `.env` already existed and was left untouched.
    AlreadyPresent,
    /// Neither file exists; nothing to do.
    NoTemplate,
}

/// Copy `example` to `target` if `target` does not exist yet.
pub fn ensure_env_file(example: &Path, target: &Path) -> Result<EnvFileOutcome> {
    if target.exists() {
        tracing::debug!("{} already present", target.display());
        return Ok(EnvFileOutcome::AlreadyPresent);
    }
    if !example.exists() {
        tracing::info!(
            "No {} template found; skipping {} creation",
            example.display(),
            target.display()
        );
        return Ok(EnvFileOutcome::NoTemplate);
    }

    std::fs::copy(example, target).map_err(|e| {
        Error::Config(format!(
            "Failed to copy {} to {}: {}",
            example.display(),
            target.display(),
            e
        ))
    })?;
    tracing::info!("Created {} from {}", target.display(), example.display());
    Ok(EnvFileOutcome::Created)
}

/// Load variables from an env file.
///
/// Uses dotenvy for parsing which handles:
/// - KEY=VALUE format
/// - Comments starting with #
/// - Single and double quoted values
/// - Empty lines
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Environment file not found: {}",
            path.display()
        )));
    }

    let iter = dotenvy::from_path_iter(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read environment file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut env_vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            Error::Config(format!(
                "Failed to parse environment file {}: {}",
                path.display(),
                e
            ))
        })?;
        env_vars.insert(key, value);
    }

    Ok(env_vars)
}
