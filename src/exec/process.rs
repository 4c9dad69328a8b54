// src/exec/process.rs

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{PollwatchError, Result};

use super::backend::CommandRunner;

/// Environment variable carrying the changed path into the command.
pub const CHANGED_PATH_ENV: &str = "POLLWATCH_CHANGED_PATH";

/// Runs `argv[0]` with `argv[1..]` directly (no shell), inheriting the
/// terminal's stdin, stdout and stderr.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    argv: Vec<String>,
}

impl ProcessRunner {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        match argv.first() {
            Some(program) if !program.trim().is_empty() => Ok(Self { argv }),
            _ => Err(PollwatchError::Config(
                "no command given to run on change".to_string(),
            )),
        }
    }

    fn display(&self) -> String {
        self.argv.join(" ")
    }
}

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a mut self,
        changed: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let command = self.display();
            info!(command = %command, changed = ?changed, "running command");

            let status = Command::new(&self.argv[0])
                .args(&self.argv[1..])
                .env(CHANGED_PATH_ENV, changed)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|source| PollwatchError::CommandSpawn {
                    command: command.clone(),
                    source,
                })?;

            debug!(command = %command, exit_code = ?status.code(), "command exited");

            if status.success() {
                Ok(())
            } else {
                Err(PollwatchError::CommandFailed { command, status })
            }
        })
    }
}
