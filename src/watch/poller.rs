// src/watch/poller.rs

//! Round-robin polling with a bounded number of checks in flight.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::errors::{PollwatchError, Result};
use crate::watch::check::{CheckContext, CheckOutcome};

/// Drives repeated inspection of every file in the set.
///
/// Each turn takes a permit from the admission gate, dispatches one check
/// for the path under the cursor and advances the cursor right away. A check
/// owns its permit, so at most `concurrency` checks are ever in flight, and a
/// check blocked on a slow consumer keeps its permit until the event is
/// taken. That is the backpressure path: once every permit is parked on
/// emission the loop stops admitting work.
#[derive(Debug)]
pub struct Poller {
    ctx: CheckContext,
    concurrency: usize,
}

/// One entry of the round-robin schedule.
#[derive(Debug)]
struct Slot {
    path: PathBuf,
    busy: Arc<AtomicBool>,
}

/// Marks a slot as having a check in flight; cleared on drop.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Step {
    Continue,
    Stop,
}

impl Poller {
    pub fn new(ctx: CheckContext, concurrency: usize) -> Self {
        Self {
            ctx,
            concurrency: concurrency.max(1),
        }
    }

    /// Run until cancelled, until the consumer drops the receiver (noticed
    /// right away, not only on the next change), or until a check fails
    /// fatally.
    ///
    /// Whatever the reason, every check already admitted is awaited before
    /// this returns.
    pub async fn run(self) -> Result<()> {
        let files = Arc::clone(&self.ctx.files);
        if files.is_empty() {
            return Err(PollwatchError::NoFiles);
        }

        // More permits than files would only let a file race itself.
        let capacity = self.concurrency.min(files.len());
        let gate = Arc::new(Semaphore::new(capacity));
        let slots: Vec<Slot> = files
            .paths()
            .iter()
            .map(|path| Slot {
                path: path.clone(),
                busy: Arc::new(AtomicBool::new(false)),
            })
            .collect();

        info!(files = slots.len(), concurrency = capacity, "poller started");

        let mut in_flight = JoinSet::new();
        let result = self.drive(&gate, &slots, &mut in_flight).await;

        // Unblock checks parked on emission, then wait for all of them.
        self.ctx.cancel.cancel();
        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = flatten(joined) {
                debug!(error = %err, "check failed during shutdown");
            }
        }

        match &result {
            Ok(()) => info!("poller stopped"),
            Err(err) => warn!(error = %err, "poller stopped with error"),
        }
        result
    }

    async fn drive(
        &self,
        gate: &Arc<Semaphore>,
        slots: &[Slot],
        in_flight: &mut JoinSet<Result<CheckOutcome>>,
    ) -> Result<()> {
        let mut cursor = 0;

        loop {
            let permit = tokio::select! {
                biased;
                _ = self.ctx.cancel.cancelled() => {
                    debug!("poller cancelled");
                    return Ok(());
                }
                _ = self.ctx.events.closed() => {
                    info!("event receiver closed; stopping poller");
                    return Ok(());
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    match settle(joined)? {
                        Step::Continue => continue,
                        Step::Stop => return Ok(()),
                    }
                }
                permit = Arc::clone(gate).acquire_owned() => {
                    permit.map_err(|e| anyhow!("admission gate closed: {e}"))?
                }
            };

            let slot = &slots[cursor];
            cursor = (cursor + 1) % slots.len();

            let Some(busy) = BusyGuard::claim(&slot.busy) else {
                // Previous check of this file is still running; leave it be.
                drop(permit);
                continue;
            };

            let ctx = self.ctx.clone();
            let path = slot.path.clone();
            in_flight.spawn(async move {
                // Declared first, dropped last: the slot is free again before
                // its permit goes back to the gate.
                let _permit = permit;
                let _busy = busy;
                ctx.check_and_emit(path).await
            });

            tokio::task::yield_now().await;
        }
    }
}

fn flatten(joined: std::result::Result<Result<CheckOutcome>, JoinError>) -> Result<CheckOutcome> {
    joined.map_err(|e| anyhow!("check task failed: {e}"))?
}

fn settle(joined: std::result::Result<Result<CheckOutcome>, JoinError>) -> Result<Step> {
    match flatten(joined)? {
        CheckOutcome::ConsumerGone => {
            info!("event receiver closed; stopping poller");
            Ok(Step::Stop)
        }
        CheckOutcome::Cancelled => Ok(Step::Stop),
        CheckOutcome::Unchanged | CheckOutcome::Changed | CheckOutcome::ReadSkipped => {
            Ok(Step::Continue)
        }
    }
}
