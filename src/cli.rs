// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::{ChangeStrategy, ReadErrorPolicy};

/// Command-line arguments for `pollwatch`.
///
/// Files to watch are glob patterns read from stdin, for example:
///
/// `ls src/*.rs | pollwatch -- cargo test`
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pollwatch",
    version,
    about = "Run a command whenever the content of watched files changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: the path in `$POLLWATCH_CONFIG` if set, else
    /// `Pollwatch.toml` in the current directory, if it exists.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Maximum number of file checks in flight at once.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// How changes are detected.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub strategy: Option<ChangeStrategy>,

    /// What to do when a watched file becomes unreadable.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_read_error: Option<ReadErrorPolicy>,

    /// Keep watching after the command fails.
    #[arg(long)]
    pub keep_going: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `POLLWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve files and command, print them, but don't watch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Command to run on change, with its arguments.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
