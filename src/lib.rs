// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod input;
pub mod logging;
pub mod types;
pub mod watch;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{Settings, load_optional};
use crate::engine::{Runtime, RuntimeOptions};
use crate::errors::{PollwatchError, Result};
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::input::{expand_patterns, read_patterns};
use crate::watch::Watcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - pattern input and glob expansion
/// - the watcher
/// - the command runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_optional(args.config.as_deref().map(Path::new))?;
    let settings = Settings::resolve(&args, &cfg)?;

    let mut patterns = settings.patterns.clone();
    patterns.extend(read_stdin_patterns().await?);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let files = expand_patterns(fs.as_ref(), &patterns)?;
    if files.is_empty() {
        return Err(PollwatchError::NoFilesMatched);
    }
    info!(files = files.len(), "resolved files to watch");

    if args.dry_run {
        print_dry_run(&settings, &files);
        return Ok(());
    }

    let runner = ProcessRunner::new(settings.command.clone())?;

    let mut watcher = Watcher::with_fs(fs, settings.watch);
    for file in &files {
        watcher.add(file)?;
    }

    let shutdown = CancellationToken::new();

    // Ctrl-C → graceful shutdown.
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            shutdown.cancel();
        });
    }

    let running = watcher.start(&shutdown)?;
    let options = RuntimeOptions {
        keep_going: settings.keep_going,
    };

    Runtime::new(running, runner, options, shutdown).run().await
}

/// Patterns piped on stdin. An interactive terminal is not read, so
/// patterns can come from the config file alone.
async fn read_stdin_patterns() -> Result<Vec<String>> {
    if std::io::stdin().is_terminal() {
        debug!("stdin is a terminal; not reading patterns from it");
        return Ok(Vec::new());
    }

    tokio::task::spawn_blocking(|| read_patterns(std::io::stdin().lock()))
        .await
        .map_err(|e| anyhow!("reading stdin failed: {e}"))?
}

/// Simple dry-run output: print the command and the resolved files.
fn print_dry_run(settings: &Settings, files: &[PathBuf]) {
    println!("pollwatch dry-run");
    println!("  strategy = {}", settings.watch.strategy);
    println!("  concurrency = {}", settings.watch.concurrency);
    println!("  on_read_error = {:?}", settings.watch.on_read_error);
    println!("  keep_going = {}", settings.keep_going);
    println!("  command: {}", settings.command.join(" "));
    println!();

    println!("files ({}):", files.len());
    for file in files {
        println!("  - {}", file.display());
    }

    debug!("dry-run complete (nothing watched)");
}
