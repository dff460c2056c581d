//! Provider error types and failure classification
//!
//! Every upstream failure lands in one of these variants. The classification
//! methods drive the retry controller and the gateway's substitution logic:
//! transient errors are retried, terminal-for-model errors are eligible for
//! model substitution or format degradation, fatal errors stop everything.

use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur when interacting with LLM providers
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Rate limit exceeded (429)
    #[error("rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Server hint, surfaced for logging; the retry controller applies
        /// its own flat delay regardless
        retry_after: Option<Duration>,
    },

    /// Billing-window quota exhausted (402, or a quota marker in the body).
    /// Distinct from rate limiting: retrying inside the same billing window
    /// cannot succeed.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    /// Authentication failed (401)
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Access forbidden (403)
    #[error("access forbidden: {0}")]
    AccessForbidden(String),

    /// Invalid request (400)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found (404)
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Temporary server error (5xx)
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Network or connection error
    #[error("network error: {0}")]
    Network(String),

    /// Response could not be parsed
    #[error("failed to parse provider response: {0}")]
    Parse(String),
}

impl ProviderError {
    /// Transient failures worth another attempt against the same model
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::Server { .. } | Self::Timeout | Self::Network(_)
        )
    }

    /// Credential-class failures: no retry, no substitution
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthFailed(_) | Self::AccessForbidden(_))
    }

    /// Terminal for this model but eligible for substitution or degradation
    pub fn is_terminal_for_model(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::QuotaExhausted(_) | Self::ModelNotFound(_)
        )
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(err.to_string())
    }
}
