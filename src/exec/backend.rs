// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The runtime talks to a `CommandRunner` instead of spawning processes
//! itself. This makes it easy to swap in a fake runner in tests while keeping
//! the production implementation in [`super::process`].

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::errors::Result;

/// Trait abstracting what happens when a watched file changes.
pub trait CommandRunner: Send {
    /// Run the command once for `changed`.
    ///
    /// Resolves when the command has finished. An `Err` means the command
    /// could not be started or did not succeed.
    fn run<'a>(
        &'a mut self,
        changed: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
