// src/exec/mod.rs

//! Command execution layer.
//!
//! The runtime hands each changed path to a [`CommandRunner`]. Production
//! uses [`ProcessRunner`], which spawns the configured command with the
//! terminal's stdout/stderr; tests substitute a fake that only records calls.

pub mod backend;
pub mod process;

pub use backend::CommandRunner;
pub use process::{CHANGED_PATH_ENV, ProcessRunner};
