//! Client for the remote statistical analysis engine.
//!
//! [`HttpAnalyticsEngine`] speaks plain JSON over HTTP. [`AnalyticsClient`]
//! wraps any [`AnalyticsEngine`] with the circuit breaker and retry policy;
//! the rest of the workflow only ever talks to the wrapper.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use saw_model::{AnalysisConfig, AnalysisResult};
use tracing::{debug, info, warn};

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::error::{AnalyticsError, Result};
use crate::retry::{RetryPolicy, Retryable, retry};

/// HTTP request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can run an analysis.
#[async_trait]
pub trait AnalyticsEngine: Send + Sync {
    async fn run_analysis(&self, config: &AnalysisConfig) -> Result<AnalysisResult>;
}

/// Engine that refuses every request without touching the network.
///
/// Stands in for the remote engine when only the local steps run.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEngine;

#[async_trait]
impl AnalyticsEngine for OfflineEngine {
    async fn run_analysis(&self, _config: &AnalysisConfig) -> Result<AnalysisResult> {
        Err(AnalyticsError::Config(
            "no analytics engine configured for this session".to_string(),
        ))
    }
}

/// Connection settings for the analytics engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
}

impl AnalyticsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// JSON-over-HTTP engine: `POST <base_url>/analyses`.
#[derive(Debug, Clone)]
pub struct HttpAnalyticsEngine {
    client: Client,
    endpoint: String,
}

impl HttpAnalyticsEngine {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(AnalyticsError::Config("base URL is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("saw/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalyticsError::Config(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{base_url}/analyses"),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalyticsEngine for HttpAnalyticsEngine {
    async fn run_analysis(&self, config: &AnalysisConfig) -> Result<AnalysisResult> {
        debug!(endpoint = %self.endpoint, kind = %config.kind, "submitting analysis");

        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .json(config)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let status = status.as_u16();
            return Err(if status >= 500 {
                AnalyticsError::Server { status, message }
            } else {
                AnalyticsError::Client { status, message }
            });
        }

        response
            .json::<AnalysisResult>()
            .await
            .map_err(|e| AnalyticsError::Decode(e.to_string()))
    }
}

/// Analytics engine guarded by a circuit breaker and retry policy.
pub struct AnalyticsClient<E = HttpAnalyticsEngine> {
    engine: E,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl AnalyticsClient<HttpAnalyticsEngine> {
    /// HTTP client with its own breaker named `analytics`.
    pub fn http(config: &AnalyticsClientConfig) -> Result<Self> {
        let engine = HttpAnalyticsEngine::new(&config.base_url, config.timeout)?;
        let breaker = Arc::new(CircuitBreaker::new("analytics", config.breaker));
        Ok(Self::new(engine, breaker, config.retry))
    }
}

impl<E: AnalyticsEngine> AnalyticsClient<E> {
    pub fn new(engine: E, breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Self {
        Self {
            engine,
            breaker,
            policy,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Submit an analysis.
    ///
    /// Fails fast with [`AnalyticsError::CircuitOpen`] while the breaker is
    /// open. Each attempt's outcome is recorded on the breaker; transient
    /// failures are retried per the policy.
    pub async fn submit(&self, config: &AnalysisConfig) -> Result<AnalysisResult> {
        let result = retry(
            || self.attempt(config),
            &self.policy,
            |err: &AnalyticsError, _| err.is_retryable(),
            |err: &AnalyticsError, attempt| {
                warn!(attempt, error = %err, "analysis attempt failed, retrying");
            },
        )
        .await;

        match &result {
            Ok(outcome) => info!(
                analysis = %outcome.analysis_id,
                kind = %outcome.kind,
                "analysis completed"
            ),
            Err(err) => warn!(error = %err, "analysis failed"),
        }
        result
    }

    async fn attempt(&self, config: &AnalysisConfig) -> Result<AnalysisResult> {
        if !self.breaker.can_attempt() {
            return Err(AnalyticsError::CircuitOpen {
                retry_at: self.breaker.retry_at(),
            });
        }
        let outcome = self.engine.run_analysis(config).await;
        match &outcome {
            Ok(_) => self.breaker.record_success(),
            Err(err) if err.is_service_failure() => self.breaker.record_failure(),
            Err(_) => {}
        }
        outcome
    }
}

#[async_trait]
impl<E: AnalyticsEngine> AnalyticsEngine for AnalyticsClient<E> {
    async fn run_analysis(&self, config: &AnalysisConfig) -> Result<AnalysisResult> {
        self.submit(config).await
    }
}

impl<E> std::fmt::Debug for AnalyticsClient<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsClient")
            .field("breaker", &self.breaker)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use saw_model::{AnalysisKind, ProjectId};

    use super::*;
    use crate::breaker::CircuitState;

    struct Scripted {
        outcomes: Mutex<VecDeque<Result<AnalysisResult>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<AnalysisResult>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl AnalyticsEngine for Scripted {
        async fn run_analysis(&self, _config: &AnalysisConfig) -> Result<AnalysisResult> {
            *self.calls.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AnalyticsError::Connection("script exhausted".into())))
        }
    }

    fn ok() -> Result<AnalysisResult> {
        Ok(AnalysisResult {
            analysis_id: "a1".to_string(),
            kind: AnalysisKind::Descriptive,
            summary: String::new(),
            statistics: Default::default(),
            warnings: Vec::new(),
        })
    }

    fn unavailable() -> Result<AnalysisResult> {
        Err(AnalyticsError::Server {
            status: 503,
            message: "busy".to_string(),
        })
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::new(ProjectId::new("p1").unwrap(), AnalysisKind::Descriptive)
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let breaker = Arc::new(CircuitBreaker::new("test", CircuitBreakerConfig::default()));
        let client = AnalyticsClient::new(
            Scripted::new(vec![unavailable(), unavailable(), ok()]),
            Arc::clone(&breaker),
            policy(),
        );
        let result = client.submit(&config()).await.unwrap();
        assert_eq!(result.analysis_id, "a1");
        assert_eq!(client.engine.calls(), 3);
        assert_eq!(breaker.snapshot().failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_not_retried_or_counted() {
        let breaker = Arc::new(CircuitBreaker::new("test", CircuitBreakerConfig::default()));
        let client = AnalyticsClient::new(
            Scripted::new(vec![Err(AnalyticsError::Client {
                status: 422,
                message: "no dependent variable".to_string(),
            })]),
            Arc::clone(&breaker),
            policy(),
        );
        let err = client.submit(&config()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Client { status: 422, .. }));
        assert_eq!(client.engine.calls(), 1);
        assert_eq!(breaker.snapshot().failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_fails_fast() {
        let breaker = Arc::new(CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 2,
                ..CircuitBreakerConfig::default()
            },
        ));
        let client = AnalyticsClient::new(
            Scripted::new(vec![unavailable(), unavailable(), ok()]),
            Arc::clone(&breaker),
            policy(),
        );

        // Second failure opens the circuit; the third attempt is refused.
        let err = client.submit(&config()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::CircuitOpen { retry_at: Some(_) }));
        assert_eq!(client.engine.calls(), 2);
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = client.submit(&config()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::CircuitOpen { .. }));
        assert_eq!(client.engine.calls(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(client.submit(&config()).await.is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_offline_engine_refuses() {
        let err = OfflineEngine.run_analysis(&config()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_endpoint() {
        let engine = HttpAnalyticsEngine::new("http://localhost:8080/api/", DEFAULT_TIMEOUT)
            .unwrap();
        assert_eq!(engine.endpoint(), "http://localhost:8080/api/analyses");
        assert!(matches!(
            HttpAnalyticsEngine::new("  ", DEFAULT_TIMEOUT),
            Err(AnalyticsError::Config(_))
        ));
    }
}
