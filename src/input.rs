// src/input.rs

//! Turning user input into the list of files to watch.
//!
//! Patterns arrive as whitespace-separated words (usually piped on stdin)
//! and are expanded against the filesystem. Matching follows shell globbing:
//! `*` and `?` stay within one path component, `**` crosses directories.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use globset::{GlobBuilder, GlobMatcher};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

/// Read whitespace-delimited patterns until EOF.
pub fn read_patterns(reader: impl BufRead) -> Result<Vec<String>> {
    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line.context("reading patterns")?;
        patterns.extend(line.split_whitespace().map(str::to_string));
    }
    Ok(patterns)
}

/// Expand patterns into existing files, in pattern order, without
/// duplicates.
///
/// Invalid patterns are logged and skipped. Directories never count as
/// matches: only regular files can be fingerprinted.
pub fn expand_patterns(fs: &dyn FileSystem, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let matches = match expand_one(fs, pattern) {
            Ok(m) => m,
            Err(err) => {
                warn!(pattern = %pattern, error = %err, "skipping pattern");
                continue;
            }
        };
        if matches.is_empty() {
            debug!(pattern = %pattern, "pattern matched no files");
        }
        for path in matches {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

fn expand_one(fs: &dyn FileSystem, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !has_glob_meta(pattern) {
        let path = PathBuf::from(pattern);
        if fs.is_file(&path) {
            return Ok(vec![path]);
        }
        if fs.is_dir(&path) {
            warn!(pattern = %pattern, "directories cannot be watched; skipping");
        }
        return Ok(Vec::new());
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher();

    let (base, rest) = split_literal_base(Path::new(pattern));
    let max_depth = if pattern.contains("**") {
        None
    } else {
        Some(rest)
    };

    let walk_root = if base.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        base.clone()
    };
    if !fs.is_dir(&walk_root) {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    walk(fs, &walk_root, &base, &matcher, max_depth, &mut found)?;
    found.sort();
    Ok(found)
}

/// Split a pattern into its leading glob-free directory and the number of
/// components after it.
fn split_literal_base(pattern: &Path) -> (PathBuf, usize) {
    let components: Vec<Component<'_>> = pattern.components().collect();
    let first_glob = components
        .iter()
        .position(|c| has_glob_meta(&c.as_os_str().to_string_lossy()))
        .unwrap_or(components.len());

    let base: PathBuf = components[..first_glob].iter().collect();
    (base, components.len() - first_glob)
}

/// Depth-first walk below `root`, matching candidates spelled as
/// `base/<relative path>` so they line up with the pattern text.
///
/// Symlinked directories are not entered: a link back to an ancestor would
/// otherwise register one file under endlessly many spellings. Symlinked
/// files still match.
fn walk(
    fs: &dyn FileSystem,
    root: &Path,
    base: &Path,
    matcher: &GlobMatcher,
    max_depth: Option<usize>,
    found: &mut Vec<PathBuf>,
) -> anyhow::Result<()> {
    let mut stack = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        let depth = depth + 1;
        for path in fs.read_dir(&dir)? {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let candidate = base.join(rel);

            if fs.is_dir(&path) {
                if fs.is_symlink(&path) {
                    debug!(path = ?path, "not following symlinked directory");
                } else if max_depth.is_none_or(|max| depth < max) {
                    stack.push((path, depth));
                }
            } else if fs.is_file(&path) && max_depth.is_none_or(|max| depth <= max) {
                let spelled = candidate.to_string_lossy().replace('\\', "/");
                if matcher.is_match(&spelled) {
                    found.push(candidate);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("a.txt", "a");
        fs.add_file("b.txt", "b");
        fs.add_file("notes.md", "n");
        fs.add_file("src/main.rs", "main");
        fs.add_file("src/lib.rs", "lib");
        fs.add_file("src/watch/poller.rs", "poller");
        fs
    }

    fn expand(fs: &MockFileSystem, patterns: &[&str]) -> Vec<PathBuf> {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        expand_patterns(fs, &patterns).unwrap()
    }

    #[test]
    fn reads_words_across_lines() {
        let input = "a.txt  b.txt\n\n  src/*.rs\t*.md\n";
        let patterns = read_patterns(input.as_bytes()).unwrap();
        assert_eq!(patterns, vec!["a.txt", "b.txt", "src/*.rs", "*.md"]);
    }

    #[test]
    fn star_stays_within_one_directory() {
        let fs = project();
        assert_eq!(
            expand(&fs, &["*.txt"]),
            vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
        );
        assert_eq!(
            expand(&fs, &["src/*.rs"]),
            vec![PathBuf::from("src/lib.rs"), PathBuf::from("src/main.rs")]
        );
    }

    #[test]
    fn double_star_recurses() {
        let fs = project();
        assert_eq!(
            expand(&fs, &["src/**/*.rs"]),
            vec![
                PathBuf::from("src/lib.rs"),
                PathBuf::from("src/main.rs"),
                PathBuf::from("src/watch/poller.rs"),
            ]
        );
    }

    #[test]
    fn literal_paths_must_be_existing_files() {
        let fs = project();
        assert_eq!(expand(&fs, &["notes.md"]), vec![PathBuf::from("notes.md")]);
        assert!(expand(&fs, &["missing.md"]).is_empty());
        assert!(expand(&fs, &["src"]).is_empty());
    }

    #[test]
    fn duplicates_are_dropped_and_order_follows_patterns() {
        let fs = project();
        assert_eq!(
            expand(&fs, &["notes.md", "*.txt", "a.txt", "*.md"]),
            vec![
                PathBuf::from("notes.md"),
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
            ]
        );
    }

    #[test]
    fn invalid_and_unmatched_patterns_yield_nothing() {
        let fs = project();
        assert!(expand(&fs, &["[a-", "nothing/*.rs", "*.zig"]).is_empty());
    }

    #[test]
    fn symlinked_directories_are_not_entered() {
        let fs = MockFileSystem::new();
        fs.add_file("d/a.txt", "a");
        fs.add_file("d/loop/d/a.txt", "a");
        fs.mark_symlink("d/loop");

        assert_eq!(expand(&fs, &["d/**/*.txt"]), vec![PathBuf::from("d/a.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn real_symlink_loop_yields_each_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let d = dir.path().join("d");
        std::fs::create_dir(&d).unwrap();
        std::fs::write(d.join("a.txt"), "a").unwrap();
        std::os::unix::fs::symlink("..", d.join("loop")).unwrap();

        let pattern = format!("{}/**/*.txt", d.display());
        let files = expand_patterns(&crate::fs::RealFileSystem, &[pattern]).unwrap();

        assert_eq!(files, vec![d.join("a.txt")]);
    }

    #[test]
    fn real_directory_is_expanded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.log"), "1").unwrap();
        std::fs::write(dir.path().join("two.log"), "2").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/three.log"), "3").unwrap();

        let pattern = format!("{}/*.log", dir.path().display());
        let files = expand_patterns(&crate::fs::RealFileSystem, &[pattern]).unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("one.log"), dir.path().join("two.log")]
        );
    }
}
