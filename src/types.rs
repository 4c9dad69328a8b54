use std::fmt;

use clap::ValueEnum;
use serde::Deserialize;

/// What the poller does when a watched file cannot be read after it was
/// registered (deleted, permissions changed, ...).
///
/// - `Fatal`: stop the watcher with an error (default).
/// - `Skip`: log a warning and treat the file as unchanged for that turn.
///   The file stays in rotation and is picked up again once readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReadErrorPolicy {
    #[default]
    Fatal,
    Skip,
}

/// How changes are detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStrategy {
    /// Re-read and re-hash every file round-robin.
    #[default]
    Poll,
    /// Use OS file notifications (`notify`), confirmed by content hash.
    Notify,
}

impl fmt::Display for ChangeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStrategy::Poll => f.write_str("poll"),
            ChangeStrategy::Notify => f.write_str("notify"),
        }
    }
}
