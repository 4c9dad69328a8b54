//! Helpers for waiting on conditions that a background watcher makes true
//! eventually.

use std::path::PathBuf;
use std::time::Duration;

use pollwatch::fs::mock::MockFileSystem;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// Poll `cond` every few milliseconds until it holds.
///
/// Panics after [`crate::TEST_TIMEOUT`].
pub async fn eventually<F>(what: &str, mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + crate::TEST_TIMEOUT;
    while !cond() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Wait until every listed path has been read at least `reads` times.
pub async fn wait_for_reads(fs: &MockFileSystem, paths: &[&str], reads: usize) {
    eventually(&format!("{paths:?} read {reads} times"), || {
        paths.iter().all(|p| fs.read_count(p) >= reads)
    })
    .await;
}

/// Wait until each listed path has been read `cycles` more times than now.
///
/// One poll cycle reads every file once, so this waits out `cycles` full
/// round-robin passes.
pub async fn wait_for_cycles(fs: &MockFileSystem, paths: &[&str], cycles: usize) {
    let targets: Vec<(&str, usize)> = paths
        .iter()
        .map(|p| (*p, fs.read_count(p) + cycles))
        .collect();
    eventually(&format!("{cycles} more cycles over {paths:?}"), || {
        targets.iter().all(|(p, n)| fs.read_count(p) >= *n)
    })
    .await;
}

/// Drain every event currently queued without waiting.
pub fn drain_events(rx: &mut mpsc::Receiver<PathBuf>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(path) => out.push(path),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return out,
        }
    }
}
