// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Parse a TOML file into a [`RawConfigFile`]. Values are not checked.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let text = fs::read_to_string(path.as_ref())?;
    Ok(toml::from_str(&text)?)
}

/// Parse and check a config file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let cfg = ConfigFile::try_from(load_from_path(path)?)?;
    debug!(path = ?path, patterns = cfg.watch.patterns.len(), "config loaded");
    Ok(cfg)
}

/// Resolve the configuration to use.
///
/// - An explicitly given path must exist.
/// - Otherwise [`default_config_path`] is used if present, and built-in
///   defaults if not.
pub fn load_optional(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let default_path = default_config_path();
    if default_path.is_file() {
        load_and_validate(&default_path)
    } else {
        debug!("no config file; using defaults");
        Ok(ConfigFile::default())
    }
}

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "POLLWATCH_CONFIG";

/// `$POLLWATCH_CONFIG` if set, else `Pollwatch.toml` in the working
/// directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Pollwatch.toml"))
}
