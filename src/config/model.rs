// src/config/model.rs

use serde::Deserialize;

use crate::types::{ChangeStrategy, ReadErrorPolicy};
use crate::watch::DEFAULT_CONCURRENCY;

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [watch]
/// patterns = ["src/**/*.rs", "Cargo.toml"]
/// concurrency = 1
/// strategy = "poll"        # or "notify"
/// on_read_error = "fatal"  # or "skip"
///
/// [command]
/// run = ["cargo", "test"]
/// keep_going = false
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub command: CommandSection,
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Glob patterns to watch, in addition to any read from stdin.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Maximum number of file checks in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub strategy: ChangeStrategy,

    /// What to do when a watched file becomes unreadable.
    #[serde(default)]
    pub on_read_error: ReadErrorPolicy,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            concurrency: default_concurrency(),
            strategy: ChangeStrategy::default(),
            on_read_error: ReadErrorPolicy::default(),
        }
    }
}

/// `[command]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandSection {
    /// Program and arguments, e.g. `["make", "test"]`.
    #[serde(default)]
    pub run: Vec<String>,

    /// Keep watching after the command fails.
    #[serde(default)]
    pub keep_going: bool,
}

/// Validated configuration. Build it with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub watch: WatchSection,
    pub command: CommandSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(watch: WatchSection, command: CommandSection) -> Self {
        Self { watch, command }
    }
}
