// src/watch/check.rs

//! The per-file unit of work shared by every change source: re-hash one
//! path, store the new fingerprint if it moved, and hand the path to the
//! consumer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{PollwatchError, Result};
use crate::types::ReadErrorPolicy;
use crate::watch::file_set::FileSet;

/// What a single check ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Unchanged,
    /// Content changed and the path was delivered to the consumer.
    Changed,
    /// The file could not be read and the policy says to carry on.
    ReadSkipped,
    /// The event receiver is gone; nobody is listening anymore.
    ConsumerGone,
    /// Cancelled while waiting to deliver the event.
    Cancelled,
}

/// Everything a check needs, cheap to clone into a spawned task.
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub files: Arc<FileSet>,
    pub events: mpsc::Sender<PathBuf>,
    pub on_read_error: ReadErrorPolicy,
    pub cancel: CancellationToken,
}

impl CheckContext {
    /// Check `path` once and emit it if its content changed.
    ///
    /// Hashing runs on the blocking pool. The fingerprint is stored before
    /// the event is sent, so a change is reported at most once even if the
    /// consumer is slow and the file gets checked again meanwhile.
    pub async fn check_and_emit(&self, path: PathBuf) -> Result<CheckOutcome> {
        let fresh = {
            let files = Arc::clone(&self.files);
            let target = path.clone();
            tokio::task::spawn_blocking(move || files.check(&target))
                .await
                .map_err(|e| anyhow!("hashing task for {:?} failed: {e}", path))?
        };

        let fingerprint = match fresh {
            Ok(Some(fp)) => fp,
            Ok(None) => {
                debug!(path = ?path, "unchanged");
                return Ok(CheckOutcome::Unchanged);
            }
            Err(err @ PollwatchError::Read { .. }) => match self.on_read_error {
                ReadErrorPolicy::Fatal => return Err(err),
                ReadErrorPolicy::Skip => {
                    warn!(path = ?path, error = %err, "cannot read watched file; treating as unchanged");
                    return Ok(CheckOutcome::ReadSkipped);
                }
            },
            Err(err) => return Err(err),
        };

        if !self.files.replace_if_changed(&path, fingerprint)? {
            // Another check of the same content got there first.
            return Ok(CheckOutcome::Unchanged);
        }
        info!(path = ?path, %fingerprint, "content changed");

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!(path = ?path, "cancelled before change event was delivered");
                Ok(CheckOutcome::Cancelled)
            }
            sent = self.events.send(path.clone()) => match sent {
                Ok(()) => Ok(CheckOutcome::Changed),
                Err(_) => {
                    debug!(path = ?path, "event receiver dropped");
                    Ok(CheckOutcome::ConsumerGone)
                }
            },
        }
    }
}
