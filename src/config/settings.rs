// src/config/settings.rs

//! Merge of command-line flags over the config file.

use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::errors::{PollwatchError, Result};
use crate::watch::WatchOptions;

/// Everything `run` needs, after CLI flags have been applied over the
/// config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub patterns: Vec<String>,
    pub command: Vec<String>,
    pub watch: WatchOptions,
    pub keep_going: bool,
}

impl Settings {
    /// CLI flags win over file values. A command given on the command line
    /// replaces `[command].run` entirely.
    pub fn resolve(args: &CliArgs, cfg: &ConfigFile) -> Result<Self> {
        let concurrency = args.concurrency.unwrap_or(cfg.watch.concurrency);
        if concurrency == 0 {
            return Err(PollwatchError::Config(
                "--concurrency must be >= 1 (got 0)".to_string(),
            ));
        }

        let command = if args.command.is_empty() {
            cfg.command.run.clone()
        } else {
            args.command.clone()
        };
        if command.is_empty() {
            return Err(PollwatchError::Config(
                "no command to run: pass one after `--` or set [command].run".to_string(),
            ));
        }

        Ok(Self {
            patterns: cfg.watch.patterns.clone(),
            command,
            watch: WatchOptions {
                concurrency,
                on_read_error: args.on_read_error.unwrap_or(cfg.watch.on_read_error),
                strategy: args.strategy.unwrap_or(cfg.watch.strategy),
            },
            keep_going: args.keep_going || cfg.command.keep_going,
        })
    }
}
