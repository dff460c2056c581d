//! Provider adapter trait and shared response-shape handling

use crate::protocol::envelope::{ErrorCode, ErrorRecord, ResponseEnvelope};
use crate::protocol::types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse};
use crate::providers::error::ProviderResult;
use async_trait::async_trait;
use serde_json::Value;

/// Core adapter trait that every backend implements
///
/// Errors carry the transport/status failure taxonomy; data-shape problems
/// (a call that "succeeded" yet produced nothing usable) come back as an
/// envelope with the corresponding error record instead.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The adapter's name, matching the provider segment of catalog ids
    fn name(&self) -> &str;

    /// Chat completion
    async fn chat(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope>;

    /// Legacy text completion
    async fn generate_completion(
        &self,
        request: &CompletionRequest,
    ) -> ProviderResult<ResponseEnvelope>;

    /// Vision analysis. The request carries multimodal content parts; the
    /// default goes through the chat endpoint, which is where every backed
    /// provider serves vision.
    async fn analyze_image(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        self.chat(request).await
    }

    /// Image generation
    async fn generate_image(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope>;
}

/// Build an envelope from a chat response, detecting data-shape failures.
///
/// Truncation gets its own code: an empty response cut off by the token
/// limit is remediated differently (raise the budget) than a model that
/// answered with nothing (switch model).
pub(crate) fn envelope_from_chat(
    response: ChatResponse,
    raw: Value,
    fallback_model: &str,
    provider: &str,
) -> ResponseEnvelope {
    let model = if response.model.is_empty() {
        fallback_model.to_string()
    } else {
        response.model.clone()
    };

    let Some(choice) = response.choices.first() else {
        return ResponseEnvelope::failed(
            ErrorRecord::new(ErrorCode::NoContent, None, "response contained no choices"),
            raw,
            model,
            provider,
        );
    };

    let content = choice.message.content.clone().unwrap_or_default();
    if !content.is_empty() {
        return ResponseEnvelope::ok(content, raw, model, provider);
    }

    // image-output models answer with attachments instead of text
    if let Some(image) = choice
        .message
        .images
        .as_ref()
        .and_then(|images| images.first())
    {
        return ResponseEnvelope::ok(image.image_url.url.clone(), raw, model, provider);
    }

    if choice.finish_reason.as_deref() == Some("length") {
        return ResponseEnvelope::failed(
            ErrorRecord::new(
                ErrorCode::MaxTokens,
                None,
                "finish_reason=length with empty content",
            ),
            raw,
            model,
            provider,
        );
    }

    ResponseEnvelope::failed(
        ErrorRecord::new(ErrorCode::Empty, None, "choice carried empty content"),
        raw,
        model,
        provider,
    )
}

/// Build an envelope from a legacy completion response
pub(crate) fn envelope_from_completion(
    response: CompletionResponse,
    raw: Value,
    fallback_model: &str,
    provider: &str,
) -> ResponseEnvelope {
    let model = if response.model.is_empty() {
        fallback_model.to_string()
    } else {
        response.model.clone()
    };

    let Some(choice) = response.choices.first() else {
        return ResponseEnvelope::failed(
            ErrorRecord::new(ErrorCode::NoContent, None, "response contained no choices"),
            raw,
            model,
            provider,
        );
    };

    if !choice.text.is_empty() {
        return ResponseEnvelope::ok(choice.text.clone(), raw, model, provider);
    }

    if choice.finish_reason.as_deref() == Some("length") {
        return ResponseEnvelope::failed(
            ErrorRecord::new(
                ErrorCode::MaxTokens,
                None,
                "finish_reason=length with empty text",
            ),
            raw,
            model,
            provider,
        );
    }

    ResponseEnvelope::failed(
        ErrorRecord::new(ErrorCode::Empty, None, "choice carried empty text"),
        raw,
        model,
        provider,
    )
}
