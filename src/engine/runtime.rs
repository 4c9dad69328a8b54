// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::{PollwatchError, Result};
use crate::exec::CommandRunner;
use crate::watch::RunningWatcher;

use super::RuntimeOptions;

/// Consumes change events and runs the command for each of them.
///
/// Events are handled one at a time: while the command runs nothing is
/// received, so a busy command naturally holds the watcher back instead of
/// piling up events.
pub struct Runtime<R: CommandRunner> {
    watcher: RunningWatcher,
    runner: R,
    options: RuntimeOptions,
    shutdown: CancellationToken,
    dispatched: usize,
}

impl<R: CommandRunner> fmt::Debug for Runtime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> Runtime<R> {
    pub fn new(
        watcher: RunningWatcher,
        runner: R,
        options: RuntimeOptions,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            watcher,
            runner,
            options,
            shutdown,
            dispatched: 0,
        }
    }

    /// Main event loop.
    ///
    /// Returns `Ok(())` after a shutdown request, or the first fatal error
    /// from either the watcher or the command.
    pub async fn run(mut self) -> Result<()> {
        info!("pollwatch runtime started");

        loop {
            let changed = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                res = self.watcher.handle.wait() => {
                    res?;
                    info!("watcher finished; exiting");
                    break;
                }
                changed = self.watcher.events.recv() => match changed {
                    Some(path) => path,
                    None => {
                        info!("event channel closed; exiting");
                        break;
                    }
                },
            };

            self.dispatch(changed).await?;
        }

        let dispatched = self.dispatched;
        let RunningWatcher { handle, .. } = self.watcher;
        handle.shutdown().await?;
        info!(dispatched, "runtime exiting");
        Ok(())
    }

    async fn dispatch(&mut self, changed: PathBuf) -> Result<()> {
        info!(path = ?changed, "modified file");
        self.dispatched += 1;

        match self.runner.run(&changed).await {
            Ok(()) => {
                debug!(path = ?changed, "command finished");
                Ok(())
            }
            Err(err @ (PollwatchError::CommandFailed { .. } | PollwatchError::CommandSpawn { .. }))
                if self.options.keep_going =>
            {
                error!(path = ?changed, error = %err, "command failed; continuing");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
