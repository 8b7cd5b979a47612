//! Process pool tests against the real worker binary.

use std::time::Duration;

use mathsim::algorithms::TaskKind;
use mathsim::execution::{
    parallel_factorization, FailureKind, Orchestrator, ProcessPool, TaskOutcome, TaskSpec,
    ThreadPool,
};
use mathsim::monitoring::ResourceLimits;

fn process_orchestrator(size: usize) -> Orchestrator {
    Orchestrator::new(ProcessPool::new(size).with_worker_binary(env!("CARGO_BIN_EXE_mathsim")))
}

fn factorize(n: i64) -> TaskSpec {
    TaskSpec::keyed_by_input(TaskKind::Factorize, n).with_limits(ResourceLimits::unlimited())
}

#[test]
fn test_process_results_match_threads() {
    let numbers = [84, 100, 123];
    let limits = ResourceLimits::unlimited();

    let by_process = parallel_factorization(&process_orchestrator(3), &numbers, limits).unwrap();
    let by_thread =
        parallel_factorization(&Orchestrator::new(ThreadPool::new(3)), &numbers, limits).unwrap();

    assert_eq!(by_process.len(), 3);
    assert_eq!(by_process.result("84"), Some(&[2u64, 2, 3, 7][..]));
    assert_eq!(by_process.result("100"), Some(&[2u64, 2, 5, 5][..]));
    assert_eq!(by_process.result("123"), Some(&[3u64, 41][..]));
    for id in ["84", "100", "123"] {
        assert_eq!(by_process.result(id), by_thread.result(id));
    }
}

#[test]
fn test_process_outcome_carries_log() {
    let task = TaskSpec::new("collatz", TaskKind::Collatz, 27).with_limits(ResourceLimits::unlimited());
    let outcomes = process_orchestrator(1).run_all(vec![task]).unwrap();

    match outcomes.get("collatz") {
        Some(TaskOutcome::Success { steps, log, result, .. }) => {
            assert_eq!(log.len(), *steps);
            assert_eq!(result.last(), Some(&1));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_process_invalid_input_isolated() {
    let outcomes = process_orchestrator(2)
        .run_all(vec![factorize(-5), factorize(17)])
        .unwrap();

    assert_eq!(
        outcomes.get("-5").and_then(TaskOutcome::failure_kind),
        Some(&FailureKind::InvalidInput)
    );
    assert_eq!(outcomes.result("17"), Some(&[17u64][..]));
}

#[test]
fn test_process_limit_failure() {
    let limits = ResourceLimits::new(0.0, 100.0).unwrap();
    let task = TaskSpec::keyed_by_input(TaskKind::Sieve, 100).with_limits(limits);
    let outcomes = process_orchestrator(1).run_all(vec![task]).unwrap();

    let outcome = outcomes.get("100").unwrap();
    assert!(matches!(
        outcome.failure_kind(),
        Some(FailureKind::ResourceLimitExceeded { .. })
    ));
    assert_eq!(outcome.log().len(), 1);
}

#[test]
fn test_missing_worker_binary() {
    let orchestrator =
        Orchestrator::new(ProcessPool::new(2).with_worker_binary("/nonexistent/mathsim"));
    let outcomes = orchestrator.run_all(vec![factorize(84), factorize(17)]).unwrap();

    assert_eq!(outcomes.len(), 2);
    for (_, outcome) in outcomes.iter() {
        assert_eq!(outcome.failure_kind(), Some(&FailureKind::WorkerPool));
    }
}

#[test]
fn test_process_timeout_kills_workers() {
    // One divisor sum of a prime this large takes far longer than the deadline
    let task = TaskSpec::new("slow", TaskKind::Aliquot, 9_223_372_036_854_775_783)
        .with_limits(ResourceLimits::unlimited());
    let orchestrator = process_orchestrator(1).with_timeout(Duration::from_secs(1));

    let outcomes = orchestrator.run_all(vec![task]).unwrap();

    assert_eq!(
        outcomes.get("slow").and_then(TaskOutcome::failure_kind),
        Some(&FailureKind::TimedOut)
    );
}

#[cfg(unix)]
#[test]
fn test_timeout_kills_worker_spawned_late() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::thread;

    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("finished");
    let script = dir.path().join("slow-worker.sh");
    fs::write(
        &script,
        format!("#!/bin/sh\nsleep 2\ntouch '{}'\n", marker.display()),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let orchestrator = Orchestrator::new(ProcessPool::new(1).with_worker_binary(&script))
        .with_timeout(Duration::ZERO);
    let outcomes = orchestrator.run_all(vec![factorize(84)]).unwrap();

    assert_eq!(
        outcomes.get("84").and_then(TaskOutcome::failure_kind),
        Some(&FailureKind::TimedOut)
    );

    thread::sleep(Duration::from_secs(3));
    assert!(!marker.exists(), "worker outlived the batch timeout");
}
