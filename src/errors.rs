// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PollwatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("no file matched the input patterns")]
    NoFilesMatched,

    #[error("cannot register {path:?}: {source:#}")]
    Registration {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("path is not registered: {0:?}")]
    UnknownPath(PathBuf),

    #[error("watcher started with no registered files")]
    NoFiles,

    #[error("failed to read watched file {path:?}: {source:#}")]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to start command `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` exited with {status}")]
    CommandFailed { command: String, status: ExitStatus },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PollwatchError>;
