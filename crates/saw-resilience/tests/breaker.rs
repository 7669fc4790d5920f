use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;

use saw_resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState, CircuitState, Clock, ManualClock,
    RetryPolicy, retry,
};

fn breaker_with_clock() -> (CircuitBreaker, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let breaker = CircuitBreaker::with_clock(
        "analytics",
        CircuitBreakerConfig::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    (breaker, clock)
}

#[test]
fn five_failures_open_the_circuit() {
    let (breaker, _) = breaker_with_clock();
    for n in 1..=4 {
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed, "after {n} failures");
    }
    breaker.record_failure();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(!breaker.can_attempt());
}

#[test]
fn reset_timeout_allows_one_trial_request() {
    let (breaker, clock) = breaker_with_clock();
    for _ in 0..5 {
        breaker.record_failure();
    }

    clock.advance(Duration::from_secs(59));
    assert!(!breaker.can_attempt());
    assert_eq!(breaker.state(), CircuitState::Open);

    clock.advance(Duration::from_secs(1));
    assert!(breaker.can_attempt());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}

#[test]
fn two_successes_in_half_open_close_with_zeroed_counters() {
    let (breaker, clock) = breaker_with_clock();
    for _ in 0..5 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(60));
    assert!(breaker.can_attempt());

    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    breaker.record_success();
    assert_eq!(breaker.snapshot(), CircuitBreakerState::default());
}

#[test]
fn failure_in_half_open_reopens_immediately() {
    let (breaker, clock) = breaker_with_clock();
    for _ in 0..5 {
        breaker.record_failure();
    }
    clock.advance(Duration::from_secs(60));
    assert!(breaker.can_attempt());
    breaker.record_success();

    breaker.record_failure();
    let snapshot = breaker.snapshot();
    assert_eq!(snapshot.state, CircuitState::Open);
    assert_eq!(snapshot.success_count, 0);
    assert_eq!(
        snapshot.next_attempt_time,
        Some(clock.now() + Duration::from_secs(60))
    );
    assert!(!breaker.can_attempt());
}

#[tokio::test(start_paused = true)]
async fn tokio_clock_follows_paused_time() {
    let breaker = CircuitBreaker::new(
        "analytics",
        CircuitBreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            reset_timeout: Duration::from_secs(5),
        },
    );
    breaker.record_failure();
    assert!(!breaker.can_attempt());
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(breaker.can_attempt());
    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        backoff_multiplier: 2.0,
    }
}

#[tokio::test(start_paused = true)]
async fn retry_fails_twice_then_succeeds() {
    let attempts = Cell::new(0);
    let retries = Cell::new(Vec::new());
    let started = tokio::time::Instant::now();

    let result: Result<&str, String> = retry(
        || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            async move {
                if n < 3 {
                    Err(format!("timeout #{n}"))
                } else {
                    Ok("done")
                }
            }
        },
        &fast_policy(),
        |_, _| true,
        |err: &String, attempt| {
            let mut seen = retries.take();
            seen.push((err.clone(), attempt));
            retries.set(seen);
        },
    )
    .await;

    assert_eq!(result, Ok("done"));
    assert_eq!(attempts.get(), 3);
    assert_eq!(
        retries.take(),
        [("timeout #1".to_string(), 1), ("timeout #2".to_string(), 2)]
    );
    // 100ms + 200ms of backoff.
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_after_max_attempts() {
    let attempts = Cell::new(0);
    let retries = Cell::new(0);

    let result: Result<(), u32> = retry(
        || {
            attempts.set(attempts.get() + 1);
            let n = attempts.get();
            async move { Err(n) }
        },
        &fast_policy(),
        |_, _| true,
        |_, _| retries.set(retries.get() + 1),
    )
    .await;

    assert_eq!(result, Err(3));
    assert_eq!(attempts.get(), 3);
    assert_eq!(retries.get(), 2);
}
