use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use pollwatch::errors::{PollwatchError, Result};
use pollwatch::exec::CommandRunner;

/// A fake command runner that:
/// - records every path it was run for
/// - fails the calls whose (1-based) number is listed in `fail_on`.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    calls: Arc<Mutex<Vec<PathBuf>>>,
    fail_on: Vec<usize>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th call (1-based) fail like a command exiting non-zero.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on.push(call);
        self
    }

    /// Shared view of the recorded calls; stays valid after the runner has
    /// been moved into a runtime.
    pub fn calls(&self) -> Arc<Mutex<Vec<PathBuf>>> {
        Arc::clone(&self.calls)
    }
}

fn failed_status() -> ExitStatus {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::from_raw(1 << 8)
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::ExitStatusExt;
        ExitStatus::from_raw(1)
    }
}

impl CommandRunner for FakeRunner {
    fn run<'a>(
        &'a mut self,
        changed: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let call = {
                let mut guard = self.calls.lock().unwrap();
                guard.push(changed.to_path_buf());
                guard.len()
            };

            if self.fail_on.contains(&call) {
                return Err(PollwatchError::CommandFailed {
                    command: "fake".to_string(),
                    status: failed_status(),
                });
            }
            Ok(())
        })
    }
}
