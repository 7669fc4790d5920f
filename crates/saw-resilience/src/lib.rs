//! Resilience primitives for calls to the remote analytics engine.
//!
//! - [`CircuitBreaker`] stops hammering a failing service
//! - [`retry`] re-runs transient failures with exponential backoff
//! - [`AnalyticsClient`] combines both around an [`AnalyticsEngine`]
//!
//! A request refused by an open circuit surfaces as
//! [`AnalyticsError::CircuitOpen`], never as a generic transient failure.

mod breaker;
mod client;
mod error;
mod retry;

pub use breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerState, CircuitState, Clock, ManualClock,
    TokioClock,
};
pub use client::{
    AnalyticsClient, AnalyticsClientConfig, AnalyticsEngine, DEFAULT_TIMEOUT, HttpAnalyticsEngine,
    OfflineEngine,
};
pub use error::{AnalyticsError, Result};
pub use retry::{RetryPolicy, Retryable, retry, retry_transient};
