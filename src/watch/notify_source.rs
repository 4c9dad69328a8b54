// src/watch/notify_source.rs

//! Push-based change source built on OS file notifications.
//!
//! Notifications only say "something happened near this path". Every
//! candidate is confirmed through the same fingerprint check the poller
//! uses, so touches and metadata-only changes produce no event and each
//! content change is still reported exactly once.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::watch::check::{CheckContext, CheckOutcome};

/// Raw notifications buffered between the OS watcher and the source.
///
/// Siblings of watched files share their directory watch, so a busy
/// directory can outpace a stalled consumer. Past this many pending
/// notifications new ones are dropped and the next turn re-checks every
/// file instead.
pub const RAW_EVENT_BUFFER: usize = 256;

/// Consumes raw notifications and turns confirmed content changes into
/// change events.
pub struct NotifySource {
    ctx: CheckContext,
    /// Canonical path as reported by the OS -> path as registered.
    lookup: HashMap<PathBuf, PathBuf>,
    raw_rx: mpsc::Receiver<notify::Result<Event>>,
    /// Set by the OS watcher when a notification had to be dropped.
    overflowed: Arc<AtomicBool>,
    // Dropping the OS watcher stops notifications, so it lives as long as
    // the source does.
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource")
            .field("files", &self.lookup.len())
            .finish_non_exhaustive()
    }
}

impl NotifySource {
    /// Register OS watches for every file in the set.
    ///
    /// Parent directories are watched (non-recursively) rather than the
    /// files themselves, so editors that save by writing a new file and
    /// renaming it over the old one keep being observed.
    pub fn new(ctx: CheckContext) -> Result<Self> {
        let fs = ctx.files.fs();

        let mut lookup = HashMap::new();
        let mut dirs = BTreeSet::new();
        for path in ctx.files.paths() {
            let canonical = fs
                .canonicalize(path)
                .with_context(|| format!("resolving watched file {:?}", path))?;
            if let Some(parent) = canonical.parent() {
                dirs.insert(parent.to_path_buf());
            }
            lookup.insert(canonical, path.clone());
        }

        let (raw_tx, raw_rx) = mpsc::channel(RAW_EVENT_BUFFER);
        let overflowed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&overflowed);
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| forward_raw(&raw_tx, &flag, res),
            Config::default(),
        )
        .context("creating file notification watcher")?;

        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("watching directory {:?}", dir))?;
        }

        info!(files = lookup.len(), dirs = dirs.len(), "notify watcher started");

        Ok(Self {
            ctx,
            lookup,
            raw_rx,
            overflowed,
            _watcher: watcher,
        })
    }

    /// Process notifications until cancelled or the consumer goes away.
    pub async fn run(mut self) -> Result<()> {
        loop {
            let res = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => break,
                _ = self.ctx.events.closed() => {
                    info!("event receiver closed; stopping notify watcher");
                    return Ok(());
                }
                res = self.raw_rx.recv() => match res {
                    Some(res) => res,
                    None => break,
                },
            };

            let candidates = if self.overflowed.swap(false, Ordering::AcqRel) {
                warn!("notification buffer overflowed; re-checking every file");
                self.ctx.files.paths().to_vec()
            } else {
                match res {
                    Ok(event) if matches!(event.kind, EventKind::Access(_)) => continue,
                    Ok(event) => {
                        debug!(?event, "received notify event");
                        self.registered_paths(&event.paths)
                    }
                    Err(err) => {
                        warn!(error = %err, "file watch error");
                        continue;
                    }
                }
            };

            for changed in candidates {
                match self.ctx.check_and_emit(changed).await? {
                    CheckOutcome::ConsumerGone => {
                        info!("event receiver closed; stopping notify watcher");
                        return Ok(());
                    }
                    CheckOutcome::Cancelled => return Ok(()),
                    _ => {}
                }
            }
        }

        info!("notify watcher stopped");
        Ok(())
    }

    /// Map OS-reported paths back to registered paths, dropping anything
    /// that is not watched (siblings in the same directory).
    fn registered_paths(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = Vec::new();
        for path in paths {
            if let Some(registered) = self.resolve(path) {
                if !out.contains(&registered) {
                    out.push(registered);
                }
            }
        }
        out
    }

    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        if let Some(registered) = self.lookup.get(path) {
            return Some(registered.clone());
        }
        // The OS may report a differently spelled prefix (symlinked temp
        // dirs on macOS); try the canonical form before giving up.
        let canonical = self.ctx.files.fs().canonicalize(path).ok()?;
        self.lookup.get(&canonical).cloned()
    }
}

/// Hand one OS notification to the source without ever blocking the
/// notifier thread.
fn forward_raw(
    tx: &mpsc::Sender<notify::Result<Event>>,
    overflowed: &AtomicBool,
    res: notify::Result<Event>,
) {
    match tx.try_send(res) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => overflowed.store(true, Ordering::Release),
        // Receiver gone means the source is shutting down.
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}
