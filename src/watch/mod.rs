// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Remembering a content fingerprint per watched file (`file_set`).
//! - Re-hashing files round-robin under a concurrency cap (`poller`), or
//!   reacting to OS notifications (`notify_source`).
//! - Turning confirmed content changes into path events on a channel.
//!
//! It does **not** know about commands; the consumer of the event channel
//! decides what a change means.

pub mod check;
pub mod file_set;
pub mod fingerprint;
pub mod notify_source;
pub mod poller;
pub mod watcher;

pub use check::{CheckContext, CheckOutcome};
pub use file_set::FileSet;
pub use fingerprint::{Fingerprint, compute_fingerprint};
pub use notify_source::NotifySource;
pub use poller::Poller;
pub use watcher::{
    DEFAULT_CONCURRENCY, EVENT_CHANNEL_CAPACITY, RunningWatcher, WatchHandle, WatchOptions,
    Watcher,
};
