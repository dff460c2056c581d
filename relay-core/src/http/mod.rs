//! HTTP layer shared by all provider adapters
//!
//! Handles connection pooling, request-id correlation, response validation
//! and the mapping from HTTP failures into the provider error taxonomy.
//! Adapters own URL construction and headers; this layer owns transport.

pub mod client;
pub mod error;

use std::time::Duration;
use uuid::Uuid;

/// Type of API call being made, for logging and error normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Chat completion request
    Chat,
    /// Legacy text completion request
    Completion,
    /// Image generation request
    ImageGeneration,
    /// Model-metadata probe
    ModelMetadata,
}

impl CallKind {
    /// Short label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Chat => "chat",
            CallKind::Completion => "completion",
            CallKind::ImageGeneration => "image-generation",
            CallKind::ModelMetadata => "model-metadata",
        }
    }
}

/// Options for an HTTP request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Type of API call
    pub call_kind: CallKind,

    /// Unique request ID for correlation
    pub request_id: Uuid,

    /// Request timeout
    pub timeout: Duration,
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(call_kind: CallKind) -> Self {
        Self {
            call_kind,
            request_id: Uuid::new_v4(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_options_carry_fresh_ids() {
        let a = RequestOptions::new(CallKind::Chat);
        let b = RequestOptions::new(CallKind::Chat);
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.call_kind.as_str(), "chat");
    }
}
