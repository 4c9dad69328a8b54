// src/engine/mod.rs

//! Dispatch engine: connects a running watcher to a command runner.
//!
//! The runtime reacts to:
//! - change events from the watcher (run the command),
//! - the watcher task ending (propagate its error, if any),
//! - shutdown requests (e.g. Ctrl-C).

pub mod runtime;

pub use runtime::Runtime;

/// Runtime options.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, a failed command is logged and watching continues. If false
    /// (default), the first failed command stops the runtime with its error.
    pub keep_going: bool,
}
