// src/fs/mock.rs

use super::FileSystem;
use anyhow::{Result, anyhow};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// In-memory filesystem for tests.
///
/// Besides storing file contents it keeps read statistics, which is how the
/// tests observe the poller: how often each path was read, and how many reads
/// were in flight at the same time (overall and per path). An optional read
/// delay keeps each read "in flight" long enough for overlaps to show up.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    files: HashMap<PathBuf, Vec<u8>>,
    symlinks: HashSet<PathBuf>,
    read_delay: Duration,
    reads: HashMap<PathBuf, usize>,
    in_flight: usize,
    peak_in_flight: usize,
    in_flight_per_path: HashMap<PathBuf, usize>,
    peak_in_flight_per_path: usize,
}

/// Drop `.` components so `./a.txt` and `a.txt` name the same entry.
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create or overwrite a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        self.state().files.insert(path, content.into());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state().files.remove(&path);
    }

    /// Flag `path` as a symbolic link. Whatever lives under it stays
    /// readable; only walkers that refuse to follow links see a difference.
    pub fn mark_symlink(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.state().symlinks.insert(path);
    }

    /// Every subsequent read sleeps for `delay` while counted as in flight.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state().read_delay = delay;
    }

    /// Number of times `path` has been opened for reading.
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        let path = normalize(path.as_ref());
        self.state().reads.get(&path).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.state().reads.values().sum()
    }

    pub fn in_flight_reads(&self) -> usize {
        self.state().in_flight
    }

    /// Highest number of reads ever in flight at once.
    pub fn peak_in_flight_reads(&self) -> usize {
        self.state().peak_in_flight
    }

    /// Highest number of concurrent reads ever seen for a single path.
    pub fn peak_in_flight_per_path(&self) -> usize {
        self.state().peak_in_flight_per_path
    }

    fn begin_read(&self, path: &Path) -> Duration {
        let mut state = self.state();
        *state.reads.entry(path.to_path_buf()).or_default() += 1;

        state.in_flight += 1;
        state.peak_in_flight = state.peak_in_flight.max(state.in_flight);

        let per_path = {
            let n = state.in_flight_per_path.entry(path.to_path_buf()).or_default();
            *n += 1;
            *n
        };
        state.peak_in_flight_per_path = state.peak_in_flight_per_path.max(per_path);

        state.read_delay
    }

    fn end_read(&self, path: &Path) -> Option<Vec<u8>> {
        let mut state = self.state();
        state.in_flight -= 1;
        if let Some(n) = state.in_flight_per_path.get_mut(path) {
            *n -= 1;
        }
        state.files.get(path).cloned()
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let path = normalize(path);
        let delay = self.begin_read(&path);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        match self.end_read(&path) {
            Some(content) => Ok(Box::new(Cursor::new(content))),
            None if self.is_dir(&path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_file(&self, path: &Path) -> bool {
        self.state().files.contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = normalize(path);
        if path == Path::new(".") {
            return true;
        }
        self.state()
            .files
            .keys()
            .any(|f| f != &path && f.starts_with(&path))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.state().symlinks.contains(&normalize(path))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        if !self.is_file(path) && !self.is_dir(path) {
            return Err(anyhow!("File not found: {:?}", path));
        }
        Ok(normalize(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let dir = normalize(path);
        if !self.is_dir(&dir) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        let state = self.state();
        let children: BTreeSet<PathBuf> = state
            .files
            .keys()
            .filter_map(|f| {
                let rest = if dir == Path::new(".") {
                    f.as_path()
                } else {
                    f.strip_prefix(&dir).ok()?
                };
                rest.components().next().map(|c| path.join(c.as_os_str()))
            })
            .collect();

        Ok(children.into_iter().collect())
    }
}
