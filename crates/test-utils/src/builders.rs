use std::sync::Arc;

use pollwatch::config::{ConfigFile, RawConfigFile};
use pollwatch::fs::mock::MockFileSystem;
use pollwatch::types::{ChangeStrategy, ReadErrorPolicy};
use pollwatch::watch::{WatchOptions, Watcher};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.config.watch.patterns.push(pattern.to_string());
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.config.watch.concurrency = n;
        self
    }

    pub fn with_strategy(mut self, strategy: ChangeStrategy) -> Self {
        self.config.watch.strategy = strategy;
        self
    }

    pub fn with_read_error_policy(mut self, policy: ReadErrorPolicy) -> Self {
        self.config.watch.on_read_error = policy;
        self
    }

    pub fn with_command(mut self, argv: &[&str]) -> Self {
        self.config.command.run = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn keep_going(mut self, val: bool) -> Self {
        self.config.command.keep_going = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `Watcher` over a `MockFileSystem`.
///
/// Files are created in the mock and registered in the order given.
pub struct MockWatcherBuilder {
    fs: MockFileSystem,
    files: Vec<(String, Vec<u8>)>,
    options: WatchOptions,
}

impl MockWatcherBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            files: Vec::new(),
            options: WatchOptions::default(),
        }
    }

    pub fn file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.to_string(), content.into()));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.options.concurrency = n;
        self
    }

    pub fn on_read_error(mut self, policy: ReadErrorPolicy) -> Self {
        self.options.on_read_error = policy;
        self
    }

    /// Returns the mock (to mutate files and inspect reads) and the
    /// registered, not yet started watcher.
    pub fn build(self) -> (MockFileSystem, Watcher) {
        let mut watcher = Watcher::with_fs(Arc::new(self.fs.clone()), self.options);
        for (path, content) in self.files {
            self.fs.add_file(&path, content);
            watcher.add(path).expect("registering mock file");
        }
        (self.fs, watcher)
    }
}

impl Default for MockWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
