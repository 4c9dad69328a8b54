// src/watch/file_set.rs

//! Authoritative record of watched paths and their last-seen fingerprints.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::errors::{PollwatchError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::fingerprint::{Fingerprint, compute_fingerprint};

/// Watched paths in registration order plus one fingerprint per path.
///
/// Registration needs `&mut self`, so it can only happen before the set is
/// shared with the poller. After that every access goes through one
/// `RwLock`: checks of different files read concurrently, updates exclude
/// everything else. The lock is never held while a file is being read.
#[derive(Debug)]
pub struct FileSet {
    fs: Arc<dyn FileSystem>,
    order: Vec<PathBuf>,
    entries: RwLock<HashMap<PathBuf, Fingerprint>>,
}

impl Default for FileSet {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl FileSet {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            order: Vec::new(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Register `path` and record its current fingerprint.
    ///
    /// Recording the fingerprint up front is what keeps the first poll cycle
    /// from reporting every file as changed. Adding a path twice refreshes
    /// its fingerprint but keeps a single entry.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let fingerprint = compute_fingerprint(self.fs.as_ref(), &path).map_err(|source| {
            PollwatchError::Registration {
                path: path.clone(),
                source,
            }
        })?;

        let entries = self
            .entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.insert(path.clone(), fingerprint).is_none() {
            debug!(path = ?path, %fingerprint, "registered file");
            self.order.push(path);
        } else {
            debug!(path = ?path, "file already registered; refreshed fingerprint");
        }
        Ok(())
    }

    /// Paths in registration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.read_entries().contains_key(path)
    }

    /// Last stored fingerprint for `path`.
    pub fn fingerprint(&self, path: &Path) -> Option<Fingerprint> {
        self.read_entries().get(path).copied()
    }

    /// Re-read `path` and report whether its content differs from the stored
    /// fingerprint. Does not modify the set.
    pub fn has_changed(&self, path: &Path) -> Result<bool> {
        Ok(self.check(path)?.is_some())
    }

    /// Re-read `path`; returns the fresh fingerprint if it differs from the
    /// stored one. Does not modify the set.
    pub fn check(&self, path: &Path) -> Result<Option<Fingerprint>> {
        if !self.contains(path) {
            return Err(PollwatchError::UnknownPath(path.to_path_buf()));
        }

        let current = compute_fingerprint(self.fs.as_ref(), path).map_err(|source| {
            PollwatchError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        match self.fingerprint(path) {
            Some(stored) if stored == current => Ok(None),
            _ => Ok(Some(current)),
        }
    }

    /// Overwrite the stored fingerprint of a registered path.
    pub fn update(&self, path: &Path, fingerprint: Fingerprint) -> Result<()> {
        let mut entries = self.write_entries();
        match entries.get_mut(path) {
            Some(stored) => {
                *stored = fingerprint;
                Ok(())
            }
            None => Err(PollwatchError::UnknownPath(path.to_path_buf())),
        }
    }

    /// Store `fingerprint` unless it is already the stored value.
    ///
    /// Returns true only for the caller that actually changed the entry, so
    /// when two checks of the same content race, exactly one of them wins and
    /// reports the change.
    pub fn replace_if_changed(&self, path: &Path, fingerprint: Fingerprint) -> Result<bool> {
        let mut entries = self.write_entries();
        match entries.get_mut(path) {
            Some(stored) if *stored == fingerprint => Ok(false),
            Some(stored) => {
                *stored = fingerprint;
                Ok(true)
            }
            None => Err(PollwatchError::UnknownPath(path.to_path_buf())),
        }
    }

    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<PathBuf, Fingerprint>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<PathBuf, Fingerprint>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn mock_set() -> (MockFileSystem, FileSet) {
        let fs = MockFileSystem::new();
        let set = FileSet::new(Arc::new(fs.clone()));
        (fs, set)
    }

    #[test]
    fn add_records_current_fingerprint() {
        let (fs, mut set) = mock_set();
        fs.add_file("a.txt", "hello");

        set.add("a.txt").unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(
            set.fingerprint(Path::new("a.txt")),
            Some(Fingerprint::of_bytes(b"hello"))
        );
        assert!(!set.has_changed(Path::new("a.txt")).unwrap());
    }

    #[test]
    fn add_of_missing_file_is_a_registration_error() {
        let (_fs, mut set) = mock_set();

        match set.add("missing.txt") {
            Err(PollwatchError::Registration { path, .. }) => {
                assert_eq!(path, PathBuf::from("missing.txt"));
            }
            other => panic!("expected registration error, got {other:?}"),
        }
        assert!(set.is_empty());
    }

    #[test]
    fn adding_twice_keeps_one_entry() {
        let (fs, mut set) = mock_set();
        fs.add_file("a.txt", "one");
        set.add("a.txt").unwrap();

        fs.add_file("a.txt", "two");
        set.add("a.txt").unwrap();

        assert_eq!(set.paths(), &[PathBuf::from("a.txt")]);
        assert_eq!(
            set.fingerprint(Path::new("a.txt")),
            Some(Fingerprint::of_bytes(b"two"))
        );
    }

    #[test]
    fn paths_keep_registration_order() {
        let (fs, mut set) = mock_set();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs.add_file(name, name);
            set.add(name).unwrap();
        }
        assert_eq!(
            set.paths(),
            &[
                PathBuf::from("c.txt"),
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt")
            ]
        );
    }

    #[test]
    fn check_does_not_mutate_until_update() {
        let (fs, mut set) = mock_set();
        fs.add_file("a.txt", "hello");
        set.add("a.txt").unwrap();

        fs.add_file("a.txt", "world");
        let fresh = set.check(Path::new("a.txt")).unwrap();
        assert_eq!(fresh, Some(Fingerprint::of_bytes(b"world")));
        // Still reported as changed: nothing was stored yet.
        assert!(set.has_changed(Path::new("a.txt")).unwrap());

        set.update(Path::new("a.txt"), Fingerprint::of_bytes(b"world"))
            .unwrap();
        assert!(!set.has_changed(Path::new("a.txt")).unwrap());
    }

    #[test]
    fn replace_if_changed_reports_each_transition_once() {
        let (fs, mut set) = mock_set();
        fs.add_file("a.txt", "hello");
        set.add("a.txt").unwrap();

        let world = Fingerprint::of_bytes(b"world");
        assert!(set.replace_if_changed(Path::new("a.txt"), world).unwrap());
        assert!(!set.replace_if_changed(Path::new("a.txt"), world).unwrap());
    }

    #[test]
    fn unknown_paths_are_rejected() {
        let (fs, set) = mock_set();
        fs.add_file("a.txt", "hello");

        assert!(matches!(
            set.check(Path::new("a.txt")),
            Err(PollwatchError::UnknownPath(_))
        ));
        assert!(matches!(
            set.update(Path::new("a.txt"), Fingerprint::of_bytes(b"x")),
            Err(PollwatchError::UnknownPath(_))
        ));
        assert_eq!(fs.read_count("a.txt"), 0);
    }

    #[test]
    fn read_failure_after_registration_is_a_read_error() {
        let (fs, mut set) = mock_set();
        fs.add_file("a.txt", "hello");
        set.add("a.txt").unwrap();

        fs.remove_file("a.txt");
        assert!(matches!(
            set.check(Path::new("a.txt")),
            Err(PollwatchError::Read { .. })
        ));
    }
}
