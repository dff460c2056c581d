//! HTTP error mapping utilities

use crate::providers::error::ProviderError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Body markers that indicate billing-window exhaustion rather than rate
/// limiting. OpenAI-compatible providers signal this under a 429 as well as
/// a 402, and the two must not be conflated: quota errors are never retried.
const QUOTA_MARKERS: &[&str] = &["insufficient_quota", "insufficient credits", "quota_exceeded"];

/// Map HTTP status code and response body to a ProviderError
pub fn map_http_error(status: StatusCode, body: Option<String>, request_id: Uuid) -> ProviderError {
    let details = body
        .as_ref()
        .and_then(|b| serde_json::from_str::<Value>(b).ok())
        .and_then(|v| extract_error_details(&v));

    let message = details
        .as_ref()
        .map(|d| d.message.clone())
        .or_else(|| body.clone())
        .unwrap_or_else(|| format!("HTTP error {}", status.as_u16()));
    let message = format!("{message} [request_id: {request_id}]");

    if is_quota_exhaustion(status, body.as_deref()) {
        return ProviderError::QuotaExhausted(message);
    }

    match status {
        StatusCode::UNAUTHORIZED => ProviderError::AuthFailed(message),

        StatusCode::FORBIDDEN => ProviderError::AccessForbidden(message),

        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimit {
            message,
            retry_after: details.and_then(|d| d.retry_after_seconds).map(Duration::from_secs),
        },

        StatusCode::BAD_REQUEST => ProviderError::InvalidRequest(message),

        StatusCode::NOT_FOUND => ProviderError::ModelNotFound(
            extract_model_from_error(&message).unwrap_or(message),
        ),

        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ProviderError::Timeout,

        status if status.is_server_error() => ProviderError::Server {
            status: status.as_u16(),
            message,
        },

        _ => ProviderError::InvalidRequest(message),
    }
}

/// Quota exhaustion: a 402, or a quota marker in the body of any error status
fn is_quota_exhaustion(status: StatusCode, body: Option<&str>) -> bool {
    if status == StatusCode::PAYMENT_REQUIRED {
        return true;
    }
    body.is_some_and(|b| {
        let lower = b.to_lowercase();
        QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
    })
}

/// Error details extracted from response body
struct ErrorDetails {
    message: String,
    retry_after_seconds: Option<u64>,
}

/// Extract error details from JSON response
fn extract_error_details(json: &Value) -> Option<ErrorDetails> {
    // OpenAI format: { "error": { "message": "...", "type": "...", "code": "..." } }
    if let Some(error) = json.get("error") {
        if let Some(message) = error.get("message").and_then(|v| v.as_str()) {
            return Some(ErrorDetails {
                message: message.to_string(),
                retry_after_seconds: error.get("retry_after").and_then(|v| v.as_u64()),
            });
        }
    }

    // Generic format: { "message": "..." }
    if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: message.to_string(),
            retry_after_seconds: json.get("retry_after").and_then(|v| v.as_u64()),
        });
    }

    if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
        return Some(ErrorDetails {
            message: error.to_string(),
            retry_after_seconds: None,
        });
    }

    None
}

/// Try to extract a model name from an error message
fn extract_model_from_error(message: &str) -> Option<String> {
    for quote in ['\'', '"'] {
        if let Some(start) = message.find(&format!("model {quote}")) {
            let start = start + 7;
            if let Some(end) = message[start..].find(quote) {
                return Some(message[start..start + end].to_string());
            }
        }
    }
    None
}
