// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::errors::{PollwatchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{ChangeStrategy, ReadErrorPolicy};
use crate::watch::check::CheckContext;
use crate::watch::file_set::FileSet;
use crate::watch::notify_source::NotifySource;
use crate::watch::poller::Poller;

/// Checks allowed in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Capacity of the change event channel.
///
/// Tokio has no zero-capacity channel; one slot is the closest thing to a
/// hand-off. The second pending change blocks its check until the consumer
/// catches up.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub concurrency: usize,
    pub on_read_error: ReadErrorPolicy,
    pub strategy: ChangeStrategy,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_read_error: ReadErrorPolicy::default(),
            strategy: ChangeStrategy::default(),
        }
    }
}

/// A watcher that has not been started yet.
///
/// ```no_run
/// # async fn demo() -> pollwatch::errors::Result<()> {
/// use pollwatch::watch::Watcher;
/// use tokio_util::sync::CancellationToken;
///
/// let mut watcher = Watcher::new();
/// watcher.add("src/main.rs")?;
///
/// let shutdown = CancellationToken::new();
/// let mut running = watcher.start(&shutdown)?;
/// while let Some(path) = running.events.recv().await {
///     println!("changed: {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Watcher {
    files: FileSet,
    options: WatchOptions,
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Watcher {
    pub fn new() -> Self {
        Self::with_options(WatchOptions::default())
    }

    pub fn with_options(options: WatchOptions) -> Self {
        Self::with_fs(Arc::new(RealFileSystem), options)
    }

    pub fn with_fs(fs: Arc<dyn FileSystem>, options: WatchOptions) -> Self {
        Self {
            files: FileSet::new(fs),
            options,
        }
    }

    /// Register a file. Fails if it cannot be read right now.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        self.files.add(path)
    }

    /// Start watching in the background.
    ///
    /// The watcher stops when `shutdown` is cancelled, when the returned
    /// handle is shut down or dropped, or when it hits a fatal error. Must be
    /// called from within a Tokio runtime.
    pub fn start(self, shutdown: &CancellationToken) -> Result<RunningWatcher> {
        if self.files.is_empty() {
            return Err(PollwatchError::NoFiles);
        }

        let files = Arc::new(self.files);
        let cancel = shutdown.child_token();
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let ctx = CheckContext {
            files: Arc::clone(&files),
            events: events_tx,
            on_read_error: self.options.on_read_error,
            cancel: cancel.clone(),
        };

        info!(
            files = files.len(),
            strategy = %self.options.strategy,
            concurrency = self.options.concurrency,
            on_read_error = ?self.options.on_read_error,
            "starting watcher"
        );

        let task = match self.options.strategy {
            ChangeStrategy::Poll => {
                let poller = Poller::new(ctx, self.options.concurrency);
                tokio::spawn(poller.run())
            }
            ChangeStrategy::Notify => {
                let source = NotifySource::new(ctx)?;
                tokio::spawn(source.run())
            }
        };

        Ok(RunningWatcher {
            events: events_rx,
            handle: WatchHandle {
                task: Some(task),
                cancel,
                files,
            },
        })
    }
}

/// A started watcher: the change stream plus control over the background
/// task.
#[derive(Debug)]
pub struct RunningWatcher {
    pub events: mpsc::Receiver<PathBuf>,
    pub handle: WatchHandle,
}

/// Handle to the background watch task. Dropping it stops watching.
#[derive(Debug)]
pub struct WatchHandle {
    task: Option<JoinHandle<Result<()>>>,
    cancel: CancellationToken,
    files: Arc<FileSet>,
}

impl WatchHandle {
    /// The shared file set, for inspecting stored fingerprints.
    pub fn files(&self) -> &Arc<FileSet> {
        &self.files
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Wait for the background task to end and return its result.
    ///
    /// Cancel-safe: dropping the future leaves the handle usable. Once the
    /// result has been taken, later calls return `Ok(())`.
    pub async fn wait(&mut self) -> Result<()> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let joined = task.await;
        self.task = None;
        joined.map_err(|e| anyhow!("watcher task failed: {e}"))?
    }

    /// Cancel the background task and wait for it to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel();
        self.wait().await
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
