//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use fairtrack_core::config::{CliConfigOverrides, LayeredConfig};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when --config is not given
pub const DEFAULT_CONFIG_FILE: &str = "fairtrack.toml";

/// Load layered configuration with CLI overrides
pub fn load_config(path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = config_path(path) {
        tracing::debug!(path = %path.display(), "Loading configuration file");
        config = config
            .load_from_file(&path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();
    config.update_from_cli(overrides);
    Ok(config)
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    }
}
