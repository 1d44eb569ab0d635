//! Unit tests for the attempt sequence

use super::*;
use crate::policy::Backoff;
use crate::QueueError;

use std::sync::atomic::AtomicU32;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
enum TestError {
    Op(String),
    Queue(QueueError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Op(message) => write!(f, "{}", message),
            TestError::Queue(error) => write!(f, "{}", error),
        }
    }
}

impl From<QueueError> for TestError {
    fn from(error: QueueError) -> Self {
        TestError::Queue(error)
    }
}

fn policy(max_attempts: u32, base_ms: u64, multiplier: f64) -> Arc<RetryPolicy> {
    Arc::new(RetryPolicy::new(
        max_attempts,
        Backoff::new(Duration::from_millis(base_ms), multiplier),
    ))
}

/// Gaps between consecutive recorded instants
fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

fn assert_close(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

#[test]
fn test_state_transitions() {
    use EnvelopeState::*;

    assert!(Pending.can_move_to(Executing));
    assert!(Executing.can_move_to(Waiting));
    assert!(Waiting.can_move_to(Executing));
    assert!(Executing.can_move_to(Succeeded));
    assert!(Executing.can_move_to(Failed));

    assert!(!Pending.can_move_to(Succeeded));
    assert!(!Waiting.can_move_to(Failed));
    assert!(!Succeeded.can_move_to(Executing));
    assert!(!Failed.can_move_to(Waiting));

    assert!(Succeeded.is_terminal());
    assert!(Failed.is_terminal());
    assert!(!Waiting.is_terminal());
}

#[test]
fn test_state_display() {
    assert_eq!(EnvelopeState::Waiting.to_string(), "waiting");
    assert_eq!(EnvelopeState::Succeeded.to_string(), "succeeded");
}

#[tokio::test(start_paused = true)]
async fn test_success_after_retries_observes_backoff() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let calls_clone = calls.clone();

    let operation = move |_: ()| {
        let calls = calls_clone.clone();
        async move {
            let mut calls = calls.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() < 3 {
                Err(TestError::Op("not yet".to_string()))
            } else {
                Ok("ok")
            }
        }
    };

    let stats = Arc::new(QueueStats::default());
    let (envelope, receiver) = Envelope::new(());
    run_envelope(
        Arc::from("test"),
        0,
        envelope,
        Arc::new(operation),
        policy(5, 1000, 4.0),
        stats.clone(),
    )
    .await;

    assert_eq!(receiver.await.unwrap(), Ok("ok"));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    let gaps = gaps(&calls);
    assert_close(gaps[0], Duration::from_millis(1000));
    assert_close(gaps[1], Duration::from_millis(4000));

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.succeeded, 1);
    assert_eq!(snapshot.failed, 0);
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_last_error() {
    let attempts = Arc::new(Mutex::new(0u32));
    let attempts_clone = attempts.clone();

    let operation = move |_: ()| {
        let attempts = attempts_clone.clone();
        async move {
            let mut attempts = attempts.lock().unwrap();
            *attempts += 1;
            Err::<(), _>(TestError::Op(format!("failure {}", *attempts)))
        }
    };

    let stats = Arc::new(QueueStats::default());
    let (envelope, receiver) = Envelope::new(());
    run_envelope(
        Arc::from("test"),
        0,
        envelope,
        Arc::new(operation),
        policy(3, 10, 2.0),
        stats.clone(),
    )
    .await;

    assert_eq!(
        receiver.await.unwrap(),
        Err(TestError::Op("failure 3".to_string()))
    );
    assert_eq!(*attempts.lock().unwrap(), 3);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.failed, 1);
    assert_eq!(snapshot.retries, 2);
    assert_eq!(snapshot.in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let start = Instant::now();
    let operation = |_: ()| async { Err::<(), _>(TestError::Op("boom".to_string())) };

    let (envelope, receiver) = Envelope::new(());
    run_envelope(
        Arc::from("test"),
        0,
        envelope,
        Arc::new(operation),
        policy(1, 60_000, 2.0),
        Arc::new(QueueStats::default()),
    )
    .await;

    assert!(receiver.await.unwrap().is_err());
    assert!(Instant::now() - start < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_unlimited_policy_keeps_retrying() {
    let attempts = Arc::new(Mutex::new(0u32));
    let attempts_clone = attempts.clone();

    let operation = move |_: ()| {
        let attempts = attempts_clone.clone();
        async move {
            let mut attempts = attempts.lock().unwrap();
            *attempts += 1;
            if *attempts < 20 {
                Err(TestError::Op("flaky".to_string()))
            } else {
                Ok(*attempts)
            }
        }
    };

    let unlimited = Arc::new(RetryPolicy::unlimited(Backoff::new(
        Duration::from_millis(1),
        1.0,
    )));
    let (envelope, receiver) = Envelope::new(());
    run_envelope(
        Arc::from("test"),
        0,
        envelope,
        Arc::new(operation),
        unlimited,
        Arc::new(QueueStats::default()),
    )
    .await;

    assert_eq!(receiver.await.unwrap(), Ok(20));
}

#[tokio::test(start_paused = true)]
async fn test_retries_continue_after_caller_stops_waiting() {
    let attempts = Arc::new(AtomicU32::new(0));
    let attempts_clone = attempts.clone();

    let operation = move |_: ()| {
        let attempts = attempts_clone.clone();
        async move {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError::Op("busy".to_string()))
            } else {
                Ok(())
            }
        }
    };

    let stats = Arc::new(QueueStats::default());
    let (envelope, receiver) = Envelope::new(());
    drop(receiver);
    run_envelope(
        Arc::from("test"),
        0,
        envelope,
        Arc::new(operation),
        policy(5, 100, 2.0),
        stats.clone(),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let snapshot = stats.snapshot();
    assert_eq!(snapshot.succeeded, 1);
    assert_eq!(snapshot.abandoned, 0);
    assert_eq!(snapshot.in_flight, 0);
}

#[tokio::test]
async fn test_dropped_sequence_counts_as_abandoned() {
    let stats = Arc::new(QueueStats::default());
    {
        let mut sequence = AttemptSequence::start(0, stats.clone());
        sequence.transition(EnvelopeState::Executing);
        assert_eq!(stats.snapshot().in_flight, 1);
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.in_flight, 0);
    assert_eq!(snapshot.abandoned, 1);
}

#[test]
fn test_snapshot_completed() {
    let snapshot = StatsSnapshot {
        submitted: 10,
        succeeded: 6,
        failed: 3,
        abandoned: 1,
        retries: 4,
        in_flight: 0,
    };
    assert_eq!(snapshot.completed(), 10);
}
