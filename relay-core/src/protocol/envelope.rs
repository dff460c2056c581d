//! Response envelope and canonical error taxonomy
//!
//! Heterogeneous provider failures are normalized into an [`ErrorRecord`]
//! carrying a canonical code and a user-safe message. The raw provider detail
//! is retained separately for logs and never leaks into `user_message`.

use crate::providers::error::ProviderError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical error codes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimit,
    AuthFailed,
    Quota,
    AccessForbidden,
    NotFound,
    Empty,
    Format,
    NoContent,
    MaxTokens,
    ChatError,
    CompletionError,
}

impl ErrorCode {
    /// Provider-agnostic message safe to display to end users
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::RateLimit => "The model is receiving too many requests. Try again shortly.",
            ErrorCode::AuthFailed => "The gateway could not authenticate with the provider.",
            ErrorCode::Quota => "The provider quota for this billing period is exhausted.",
            ErrorCode::AccessForbidden => "Access to this model is not permitted.",
            ErrorCode::NotFound => "The requested model is not available.",
            ErrorCode::Empty => "The model returned an empty response.",
            ErrorCode::Format => "The model response could not be parsed in the requested format.",
            ErrorCode::NoContent => "The model returned no content.",
            ErrorCode::MaxTokens => {
                "The response was cut off by the token limit before any content was produced."
            }
            ErrorCode::ChatError => "The chat request failed.",
            ErrorCode::CompletionError => "The completion request failed.",
        }
    }
}

/// Normalized record of an upstream failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Canonical error code
    pub code: ErrorCode,

    /// HTTP status, when the failure came from a status response
    pub status: Option<u16>,

    /// Raw provider detail, for logs only
    pub provider_message: String,

    /// Provider-agnostic message safe to display
    pub user_message: String,
}

impl ErrorRecord {
    /// Create a record for a code with provider detail
    pub fn new(code: ErrorCode, status: Option<u16>, provider_message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            provider_message: provider_message.into(),
            user_message: code.user_message().to_string(),
        }
    }

    /// Map an HTTP status to a canonical record.
    ///
    /// `fallback` supplies the code for statuses with no dedicated mapping
    /// (callers pass `ChatError` or `CompletionError` by call kind).
    pub fn from_status(status: u16, provider_message: impl Into<String>, fallback: ErrorCode) -> Self {
        let code = match status {
            429 => ErrorCode::RateLimit,
            401 => ErrorCode::AuthFailed,
            402 => ErrorCode::Quota,
            403 => ErrorCode::AccessForbidden,
            404 => ErrorCode::NotFound,
            400 => ErrorCode::Format,
            _ => fallback,
        };
        Self::new(code, Some(status), provider_message)
    }

    /// Normalize a provider error into a canonical record
    pub fn from_provider_error(error: &ProviderError, fallback: ErrorCode) -> Self {
        let (code, status) = match error {
            ProviderError::RateLimit { .. } => (ErrorCode::RateLimit, Some(429)),
            ProviderError::QuotaExhausted(_) => (ErrorCode::Quota, Some(402)),
            ProviderError::AuthFailed(_) => (ErrorCode::AuthFailed, Some(401)),
            ProviderError::AccessForbidden(_) => (ErrorCode::AccessForbidden, Some(403)),
            ProviderError::ModelNotFound(_) => (ErrorCode::NotFound, Some(404)),
            ProviderError::InvalidRequest(_) => (ErrorCode::Format, Some(400)),
            ProviderError::Server { status, .. } => (fallback, Some(*status)),
            ProviderError::Parse(_) => (ErrorCode::Format, None),
            _ => (fallback, None),
        };
        Self::new(code, status, error.to_string())
    }
}

/// Uniform response contract returned by the gateway
///
/// In a terminal envelope-mode response exactly one of `text` (non-empty) or
/// `error` holds. The documented exception is graceful vision degradation,
/// which may yield an empty `text` with no error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Extracted assistant text, if the call produced any
    pub text: Option<String>,

    /// Opaque provider payload, untouched
    pub raw: Value,

    /// Concrete model that served the request
    pub model: String,

    /// Adapter that served the request
    pub provider: String,

    /// Normalized failure, if the call did not produce usable text
    pub error: Option<ErrorRecord>,
}

impl ResponseEnvelope {
    /// Successful envelope carrying text
    pub fn ok(
        text: impl Into<String>,
        raw: Value,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            text: Some(text.into()),
            raw,
            model: model.into(),
            provider: provider.into(),
            error: None,
        }
    }

    /// Failed envelope carrying a normalized record
    pub fn failed(
        record: ErrorRecord,
        raw: Value,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            text: None,
            raw,
            model: model.into(),
            provider: provider.into(),
            error: Some(record),
        }
    }

    /// Graceful-empty envelope: no usable text, but not an error either
    pub fn empty(model: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: Some(String::new()),
            raw: Value::Null,
            model: model.into(),
            provider: provider.into(),
            error: None,
        }
    }

    /// Whether the envelope carries usable text
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.text.as_deref().is_some_and(|t| !t.is_empty())
    }
}
