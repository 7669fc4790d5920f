//! Error types for calls to the remote analytics engine.

use thiserror::Error;
use tokio::time::Instant;

use crate::retry::Retryable;

/// Errors from the analytics engine client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnalyticsError {
    /// The circuit breaker is open; no request was sent.
    #[error("analytics engine circuit is open")]
    CircuitOpen {
        /// When the breaker allows the next attempt.
        retry_at: Option<Instant>,
    },

    /// The request did not complete in time.
    #[error("analytics request timed out: {0}")]
    Timeout(String),

    /// The engine could not be reached.
    #[error("connection to analytics engine failed: {0}")]
    Connection(String),

    /// The engine answered with a 5xx status.
    #[error("analytics engine error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The engine rejected the request with a 4xx status.
    #[error("analytics request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// The response body was not a valid analysis result.
    #[error("invalid analytics response: {0}")]
    Decode(String),

    /// The client could not be constructed.
    #[error("invalid analytics client configuration: {0}")]
    Config(String),
}

impl AnalyticsError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::CircuitOpen { .. } => {
                "The analysis service is temporarily paused after repeated failures. \
                 Please wait a moment before trying again."
            }
            Self::Timeout(_) => "The analysis service took too long to respond.",
            Self::Connection(_) => {
                "Could not reach the analysis service. Please check your connection."
            }
            Self::Server { .. } => "The analysis service failed to run this analysis.",
            Self::Client { .. } => "The analysis service rejected this configuration.",
            Self::Decode(_) => "The analysis service returned an unexpected response.",
            Self::Config(_) => "The analysis service is not configured correctly.",
        }
    }

    /// Returns an actionable hint, when there is one.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::CircuitOpen { .. } => Some("Retry once the pause has elapsed."),
            Self::Timeout(_) | Self::Connection(_) | Self::Server { .. } => {
                Some("Retry the analysis; your configuration has been kept.")
            }
            Self::Client { .. } => Some("Review the selected analysis and assigned roles."),
            Self::Config(_) => Some("Check the [analytics] section of the settings file."),
            Self::Decode(_) => None,
        }
    }

    /// Whether the failure says something about the health of the service.
    ///
    /// Only these failures are recorded on the circuit breaker.
    pub fn is_service_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Connection(_) | Self::Server { .. }
        )
    }
}

impl Retryable for AnalyticsError {
    fn is_retryable(&self) -> bool {
        self.is_service_failure()
    }
}

impl From<reqwest::Error> for AnalyticsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else if let Some(status) = err.status() {
            let status = status.as_u16();
            if status >= 500 {
                Self::Server {
                    status,
                    message: err.to_string(),
                }
            } else {
                Self::Client {
                    status,
                    message: err.to_string(),
                }
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
