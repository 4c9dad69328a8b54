use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use pollwatch::errors::PollwatchError;
use pollwatch::fs::mock::MockFileSystem;
use pollwatch::watch::{Fingerprint, WatchOptions, Watcher};
use pollwatch_test_utils::builders::MockWatcherBuilder;
use pollwatch_test_utils::waiting::{drain_events, wait_for_cycles, wait_for_reads};
use pollwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Replace a file without ever exposing a truncated intermediate state to
/// the poller.
fn write_atomically(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unchanged_file_produces_no_events() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "hello").build();
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    wait_for_cycles(&fs, &["a.txt"], 3).await;
    assert!(drain_events(&mut running.events).is_empty());

    running.handle.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rewrite_is_reported_once_and_fingerprint_is_stored() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "hello").build();
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    // Registration read + one full cycle.
    wait_for_reads(&fs, &["a.txt"], 2).await;
    fs.add_file("a.txt", "world");

    let changed = with_timeout(running.events.recv()).await;
    assert_eq!(changed, Some(PathBuf::from("a.txt")));
    assert_eq!(
        running.handle.files().fingerprint(Path::new("a.txt")),
        Some(Fingerprint::of_bytes(b"world"))
    );

    // No second report for the same change.
    wait_for_cycles(&fs, &["a.txt"], 3).await;
    assert!(drain_events(&mut running.events).is_empty());

    running.handle.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_the_modified_file_is_reported() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new()
        .file("a.txt", "alpha")
        .file("b.txt", "beta")
        .build();
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    wait_for_reads(&fs, &["a.txt", "b.txt"], 2).await;
    fs.add_file("b.txt", "BETA");

    let changed = with_timeout(running.events.recv()).await;
    assert_eq!(changed, Some(PathBuf::from("b.txt")));

    wait_for_cycles(&fs, &["a.txt", "b.txt"], 3).await;
    assert!(drain_events(&mut running.events).is_empty());

    running.handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn nonexistent_file_fails_registration_and_nothing_starts() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let mut watcher = Watcher::with_fs(std::sync::Arc::new(fs.clone()), WatchOptions::default());

    match watcher.add("missing.txt") {
        Err(PollwatchError::Registration { path, .. }) => {
            assert_eq!(path, PathBuf::from("missing.txt"));
        }
        other => panic!("expected registration error, got {other:?}"),
    }

    // Nothing registered, so no event channel can be produced.
    let shutdown = CancellationToken::new();
    assert!(matches!(
        watcher.start(&shutdown),
        Err(PollwatchError::NoFiles)
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rapid_toggling_is_noticed_at_least_once() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "X").build();
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    let toggler = {
        let fs = fs.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                fs.add_file("a.txt", if i % 2 == 0 { "Y" } else { "X" });
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    let first = with_timeout(running.events.recv()).await;
    assert_eq!(first, Some(PathBuf::from("a.txt")));

    // Keep the consumer alive until the toggling is over so the poller is
    // never stuck on a full channel.
    while !toggler.is_finished() {
        tokio::select! {
            _ = running.events.recv() => {}
            _ = tokio::time::sleep(Duration::from_millis(5)) => {}
        }
    }
    toggler.await?;

    running.handle.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn each_of_several_changes_is_reported_exactly_once() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new()
        .file("a.txt", "v0")
        .file("b.txt", "b")
        .concurrency(2)
        .build();
    fs.set_read_delay(Duration::from_millis(1));
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    for version in 1..=3 {
        fs.add_file("a.txt", format!("v{version}"));

        let changed = with_timeout(running.events.recv()).await;
        assert_eq!(changed, Some(PathBuf::from("a.txt")));

        wait_for_cycles(&fs, &["a.txt", "b.txt"], 2).await;
        assert!(
            drain_events(&mut running.events).is_empty(),
            "version {version} reported more than once"
        );
    }

    running.handle.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn real_files_are_watched_by_content() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("a.txt");
    std::fs::write(&path, "hello")?;

    let mut watcher = Watcher::new();
    watcher.add(&path)?;
    let shutdown = CancellationToken::new();
    let mut running = watcher.start(&shutdown)?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain_events(&mut running.events).is_empty());

    write_atomically(&path, "world")?;
    let changed = with_timeout(running.events.recv()).await;
    assert_eq!(changed, Some(path.clone()));
    assert_eq!(
        running.handle.files().fingerprint(&path),
        Some(Fingerprint::of_bytes(b"world"))
    );

    // Same bytes written again: nothing to report.
    write_atomically(&path, "world")?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(drain_events(&mut running.events).is_empty());

    shutdown.cancel();
    running.handle.wait().await?;
    Ok(())
}
