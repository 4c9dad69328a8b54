use std::error::Error;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use pollwatch::engine::{Runtime, RuntimeOptions};
use pollwatch::errors::PollwatchError;
use pollwatch_test_utils::builders::MockWatcherBuilder;
use pollwatch_test_utils::fake_runner::FakeRunner;
use pollwatch_test_utils::waiting::{eventually, wait_for_reads};
use pollwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runs_the_command_for_each_change_until_shutdown() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new()
        .file("a.txt", "a")
        .file("b.txt", "b")
        .build();
    let shutdown = CancellationToken::new();
    let running = watcher.start(&shutdown)?;

    let runner = FakeRunner::new();
    let calls = runner.calls();
    let runtime = Runtime::new(running, runner, RuntimeOptions::default(), shutdown.clone());
    let task = tokio::spawn(runtime.run());

    wait_for_reads(&fs, &["a.txt", "b.txt"], 2).await;
    fs.add_file("a.txt", "A");
    eventually("command run for a.txt", || calls.lock().unwrap().len() == 1).await;

    fs.add_file("b.txt", "B");
    eventually("command run for b.txt", || calls.lock().unwrap().len() == 2).await;

    shutdown.cancel();
    with_timeout(task).await??;

    assert_eq!(
        *calls.lock().unwrap(),
        vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_command_stops_the_runtime() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "a").build();
    let shutdown = CancellationToken::new();
    let running = watcher.start(&shutdown)?;

    let runner = FakeRunner::new().failing_on(1);
    let runtime = Runtime::new(running, runner, RuntimeOptions::default(), shutdown);
    let task = tokio::spawn(runtime.run());

    fs.add_file("a.txt", "A");
    let result = with_timeout(task).await?;
    assert!(
        matches!(result, Err(PollwatchError::CommandFailed { .. })),
        "expected command failure, got {result:?}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn keep_going_survives_a_failed_command() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "a").build();
    let shutdown = CancellationToken::new();
    let running = watcher.start(&shutdown)?;

    let runner = FakeRunner::new().failing_on(1);
    let calls = runner.calls();
    let options = RuntimeOptions { keep_going: true };
    let runtime = Runtime::new(running, runner, options, shutdown.clone());
    let task = tokio::spawn(runtime.run());

    fs.add_file("a.txt", "first");
    eventually("first (failing) run", || calls.lock().unwrap().len() == 1).await;
    assert!(!task.is_finished());

    fs.add_file("a.txt", "second");
    eventually("second run", || calls.lock().unwrap().len() == 2).await;

    shutdown.cancel();
    with_timeout(task).await??;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_read_error_ends_the_runtime() -> TestResult {
    init_tracing();

    let (fs, watcher) = MockWatcherBuilder::new().file("a.txt", "a").build();
    let shutdown = CancellationToken::new();
    let running = watcher.start(&shutdown)?;

    let runner = FakeRunner::new();
    let calls = runner.calls();
    let runtime = Runtime::new(running, runner, RuntimeOptions::default(), shutdown);
    let task = tokio::spawn(runtime.run());

    fs.remove_file("a.txt");
    let result = with_timeout(task).await?;
    assert!(
        matches!(result, Err(PollwatchError::Read { .. })),
        "expected read error, got {result:?}"
    );
    assert!(calls.lock().unwrap().is_empty());
    Ok(())
}
