//! Circuit breaker guarding calls to an unreliable service.
//!
//! One breaker instance is shared (via `Arc`) by every caller of the same
//! external service. All state lives behind the breaker's own mutex and is
//! only changed through its methods.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CircuitState {
    /// Normal operation - requests allowed
    Closed,
    /// Failing - requests blocked until the reset timeout elapses
    Open,
    /// Probing whether the service recovered
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "Half-Open"),
        }
    }
}

/// Thresholds for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive successes in `HalfOpen` that close it again.
    pub success_threshold: u32,
    /// How long the circuit stays open before a trial request is allowed.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Time source for the breaker.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio timer (honours paused test time).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time view of the breaker counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<Instant>,
    pub next_attempt_time: Option<Instant>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            next_attempt_time: None,
        }
    }
}

/// Closed / Open / Half-Open circuit breaker.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CircuitBreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(TokioClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(CircuitBreakerState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CircuitBreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn snapshot(&self) -> CircuitBreakerState {
        *self.lock()
    }

    /// When the next attempt is allowed while the circuit is open.
    pub fn retry_at(&self) -> Option<Instant> {
        let inner = self.lock();
        match inner.state {
            CircuitState::Open => inner.next_attempt_time,
            _ => None,
        }
    }

    /// Check whether a request may go out.
    ///
    /// An open circuit whose reset timeout has elapsed moves to `HalfOpen`
    /// and lets the request through.
    pub fn can_attempt(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let now = self.clock.now();
                if inner.next_attempt_time.is_some_and(|at| now >= at) {
                    info!(
                        breaker = %self.name,
                        "circuit breaker: Open -> Half-Open (testing recovery)"
                    );
                    inner.state = CircuitState::HalfOpen;
                    inner.success_count = 0;
                    true
                } else {
                    debug!(breaker = %self.name, "circuit open, blocking request");
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    info!(breaker = %self.name, "circuit breaker: Half-Open -> Closed (recovered)");
                    *inner = CircuitBreakerState::default();
                }
            }
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::Open => {
                // A call that started before the circuit opened.
                debug!(breaker = %self.name, "late success while open ignored");
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.last_failure_time = Some(now);

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    warn!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        "circuit breaker: Closed -> Open"
                    );
                    inner.state = CircuitState::Open;
                    inner.next_attempt_time = Some(now + self.config.reset_timeout);
                }
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "circuit breaker: Half-Open -> Open (trial request failed)");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                inner.next_attempt_time = Some(now + self.config.reset_timeout);
            }
            CircuitState::Open => {
                debug!(breaker = %self.name, "circuit already open, failure recorded");
            }
        }
    }

    /// Force the breaker back to `Closed` with zeroed counters.
    pub fn reset(&self) {
        *self.lock() = CircuitBreakerState::default();
        info!(breaker = %self.name, "circuit breaker reset");
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> (CircuitBreaker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let breaker = CircuitBreaker::with_clock(
            "analytics",
            CircuitBreakerConfig::default(),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (breaker, clock)
    }

    #[test]
    fn test_success_clears_failures_when_closed() {
        let (breaker, _) = breaker();
        for _ in 0..4 {
            breaker.record_failure();
        }
        breaker.record_success();
        assert_eq!(breaker.snapshot().failure_count, 0);
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_opens_after_threshold() {
        let (breaker, clock) = breaker();
        for _ in 0..5 {
            breaker.record_failure();
        }
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Open);
        assert_eq!(
            snapshot.next_attempt_time,
            Some(clock.now() + Duration::from_secs(60))
        );
        assert_eq!(breaker.retry_at(), snapshot.next_attempt_time);
        assert!(!breaker.can_attempt());
    }

    #[test]
    fn test_reset() {
        let (breaker, _) = breaker();
        for _ in 0..5 {
            breaker.record_failure();
        }
        breaker.reset();
        assert_eq!(breaker.snapshot(), CircuitBreakerState::default());
        assert!(breaker.can_attempt());
    }

    #[test]
    fn test_late_success_while_open() {
        let (breaker, _) = breaker();
        for _ in 0..5 {
            breaker.record_failure();
        }
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
