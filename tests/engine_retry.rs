#![cfg(unix)]

use std::error::Error;

use renderq::engine::{Engine, JobStatus, QueueEnd};
use renderq::types::FailPolicy;
use renderq_test_utils::builders::DescriptorBuilder;
use renderq_test_utils::events::Recorder;
use renderq_test_utils::scripts::exit_sequence;
use renderq_test_utils::{fast_options, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn failed_attempts_are_retried_until_success() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let counter = dir.path().join("runs");

    let (engine, stream) = Engine::new(fast_options(&dir.path().join("logs")));
    let mut rec = Recorder::new(stream);

    engine.enqueue(
        DescriptorBuilder::sh("render", &exit_sequence(&counter, &[1, 1, 0]))
            .retries(2)
            .build(),
    );

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::Completed));
    assert!(matches!(rec.status_of("render"), Some(JobStatus::Done { .. })));
    assert_eq!(rec.attempts_started("render"), 3);
    assert_eq!(
        rec.logs().iter().filter(|l| l.contains("Will retry")).count(),
        2
    );
    assert_eq!(std::fs::read_to_string(&counter)?.trim(), "3");
    Ok(())
}

#[tokio::test]
async fn retries_run_out_then_queue_moves_on() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (engine, stream) = Engine::new(fast_options(dir.path()));
    let mut rec = Recorder::new(stream);

    engine.enqueue(DescriptorBuilder::sh("a", "exit 2").retries(1).build());
    engine.enqueue(DescriptorBuilder::sh("b", "exit 0").build());

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::Completed));
    assert_eq!(
        rec.status_of("a"),
        Some(&JobStatus::Failed { exit_code: Some(2) })
    );
    assert_eq!(rec.attempts_started("a"), 2);
    assert!(matches!(rec.status_of("b"), Some(JobStatus::Done { .. })));
    assert!(
        rec.logs()
            .iter()
            .any(|l| l.contains("a Failed after 2 attempt(s)"))
    );
    Ok(())
}

#[tokio::test]
async fn stop_queue_halts_on_first_failure() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("second-ran");

    let (engine, stream) = Engine::new(fast_options(&dir.path().join("logs")));
    let mut rec = Recorder::new(stream);

    engine.enqueue(
        DescriptorBuilder::sh("a", "exit 3")
            .retries(2)
            .fail_policy(FailPolicy::StopQueue)
            .build(),
    );
    engine.enqueue(DescriptorBuilder::sh("b", &format!("touch '{}'", marker.display())).build());

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::StoppedByPolicy));
    assert_eq!(
        rec.status_of("a"),
        Some(&JobStatus::Failed { exit_code: Some(3) })
    );
    assert_eq!(rec.attempts_started("a"), 1);
    assert_eq!(rec.status_of("b"), Some(&JobStatus::Queued));
    assert!(!marker.exists());
    assert!(
        rec.logs()
            .iter()
            .any(|l| *l == "== Queue stopped by policy ==")
    );
    Ok(())
}

#[tokio::test]
async fn skip_next_without_retries_moves_on() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (engine, stream) = Engine::new(fast_options(dir.path()));
    let mut rec = Recorder::new(stream);

    engine.enqueue(
        DescriptorBuilder::sh("a", "exit 4")
            .fail_policy(FailPolicy::SkipNext)
            .build(),
    );
    engine.enqueue(DescriptorBuilder::sh("b", "echo fine").build());

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::Completed));
    assert_eq!(
        rec.status_of("a"),
        Some(&JobStatus::Failed { exit_code: Some(4) })
    );
    assert_eq!(rec.attempts_started("a"), 1);
    assert!(matches!(rec.status_of("b"), Some(JobStatus::Done { .. })));
    assert!(rec.logs().contains(&"fine"));
    Ok(())
}

#[tokio::test]
async fn start_failure_is_not_retried() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (engine, stream) = Engine::new(fast_options(dir.path()));
    let mut rec = Recorder::new(stream);

    engine.enqueue(
        DescriptorBuilder::command(
            "missing",
            vec!["/definitely/not/a/renderq/tool".to_string()],
        )
        .retries(3)
        .build(),
    );
    engine.enqueue(DescriptorBuilder::sh("b", "exit 0").build());

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::Completed));
    assert_eq!(
        rec.status_of("missing"),
        Some(&JobStatus::Failed { exit_code: None })
    );
    assert_eq!(rec.attempts_started("missing"), 1);
    assert!(rec.logs().iter().any(|l| l.contains("Failed to start")));
    assert!(matches!(rec.status_of("b"), Some(JobStatus::Done { .. })));
    Ok(())
}

#[tokio::test]
async fn incomplete_job_is_skipped_without_running() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (engine, stream) = Engine::new(fast_options(dir.path()));
    let mut rec = Recorder::new(stream);

    engine.enqueue(
        DescriptorBuilder::command("broken", vec!["sh".to_string(), " ".to_string()])
            .retries(2)
            .build(),
    );
    engine.enqueue(DescriptorBuilder::sh("b", "exit 0").build());

    let end = with_timeout(rec.until_finished()).await;
    assert_eq!(end, Some(QueueEnd::Completed));
    assert_eq!(rec.status_of("broken"), Some(&JobStatus::Skipped));
    assert_eq!(rec.attempts_started("broken"), 0);
    assert!(
        rec.logs()
            .iter()
            .any(|l| l.contains("broken Skipped: argument #1 is empty"))
    );
    assert!(matches!(rec.status_of("b"), Some(JobStatus::Done { .. })));
    Ok(())
}

#[tokio::test]
async fn worker_stays_alive_across_submissions() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (engine, stream) = Engine::new(fast_options(dir.path()));
    let mut rec = Recorder::new(stream);

    engine.enqueue(DescriptorBuilder::sh("first", "exit 0").build());
    assert_eq!(
        with_timeout(rec.until_finished()).await,
        Some(QueueEnd::Completed)
    );
    assert!(engine.is_running());

    engine.enqueue(DescriptorBuilder::sh("second", "exit 0").build());
    assert_eq!(
        with_timeout(rec.until_finished()).await,
        Some(QueueEnd::Completed)
    );
    assert!(matches!(rec.status_of("second"), Some(JobStatus::Done { .. })));

    with_timeout(engine.shutdown()).await;
    assert!(!engine.is_running());
    Ok(())
}
