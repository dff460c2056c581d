//! Gateway facade: the provider-agnostic completion surface
//!
//! A gateway composes a catalog, a resolver, a capability probe, a retry
//! controller and one adapter per backend, all injected at construction.
//! Every inbound operation is a [`RequestEnvelope`] dispatched through
//! [`Gateway::execute`]: resolve the requested model, drive the adapter
//! through the retry controller, substitute the default model when the
//! resolved one is terminally unavailable, and normalize whatever failure
//! remains into the response envelope.
//!
//! Each operation also comes in a plain idiom that returns `Result` (or
//! `Option` for vision) for callers who prefer propagation over envelope
//! inspection. Requests are independent async units; the gateway applies no
//! admission control, and the only shared mutable state is the probe cache.

pub mod builder;

pub use builder::GatewayBuilder;

use crate::catalog::{caps, ModelCatalog, ModelResolver};
use crate::capability::CapabilityProbe;
use crate::protocol::envelope::{ErrorCode, ErrorRecord, ResponseEnvelope};
use crate::protocol::types::{
    ChatRequest, CompletionRequest, ContentPart, GenerationOptions, ImageUrl, Message,
    RequestEnvelope, RequestKind, RequestPayload,
};
use crate::providers::adapter::ProviderAdapter;
use crate::providers::error::ProviderError;
use crate::retry::RetryController;
use crate::structured::{CoercionError, StructuredOutputCoercer};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the gateway's plain (non-envelope) methods
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The resolver produced nothing (empty catalog)
    #[error("no model could be resolved for '{0}'")]
    UnresolvedModel(String),

    /// Construction finished without any provider adapter
    #[error("gateway has no provider adapters")]
    NoAdapters,

    /// Construction finished without a model-metadata source for the probe
    #[error("gateway has no model-metadata source for capability probing")]
    MissingMetadataSource,

    /// The upstream call terminally failed; the record carries the detail
    #[error("{}", .record.user_message)]
    Upstream { record: ErrorRecord },

    /// Every structured-output strategy was exhausted
    #[error("structured output failed: {}", .record.user_message)]
    StructuredOutput { record: ErrorRecord },

    /// Transport or provider failure outside the envelope contract
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Multi-provider completion gateway
pub struct Gateway {
    catalog: Arc<ModelCatalog>,
    resolver: ModelResolver,
    probe: Arc<CapabilityProbe>,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    default_adapter: String,
    retry: RetryController,
    default_model: String,
    vision_model: String,
    image_model: String,
    disable_fallbacks: bool,
}

impl Gateway {
    /// Start building a gateway
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Build a gateway from a loaded configuration
    pub fn from_config(config: &crate::config::RelayConfig) -> GatewayResult<Self> {
        GatewayBuilder::from_config(config)?.build()
    }

    /// Dispatch a provider-agnostic request envelope.
    ///
    /// This is the uniform entry point behind every typed method. It never
    /// fails: terminal errors travel inside the returned envelope.
    pub async fn execute(&self, request: RequestEnvelope) -> ResponseEnvelope {
        let RequestEnvelope {
            kind,
            payload,
            schema,
            options,
        } = request;

        match payload {
            RequestPayload::Chat { messages } => self.run_chat_kind(messages, &options).await,
            RequestPayload::Completion { prompt } if kind == RequestKind::Structured => {
                self.run_structured_kind(&prompt, schema, &options).await
            }
            RequestPayload::Completion { prompt } => {
                self.run_completion_kind(&prompt, &options).await
            }
            RequestPayload::Vision {
                image,
                mime_type,
                prompt,
            } => self.run_vision_kind(&image, &mime_type, &prompt, &options).await,
        }
    }

    /// Chat, envelope mode: failures come back inside the envelope
    pub async fn chat_envelope(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> ResponseEnvelope {
        self.execute(RequestEnvelope::chat(messages, options)).await
    }

    /// Chat, plain mode: non-empty text or an error
    pub async fn chat(
        &self,
        messages: Vec<Message>,
        options: GenerationOptions,
    ) -> GatewayResult<String> {
        Self::text_from(self.chat_envelope(messages, options).await)
    }

    /// Text completion, envelope mode
    pub async fn generate_completion_envelope(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> ResponseEnvelope {
        self.execute(RequestEnvelope::completion(prompt, options))
            .await
    }

    /// Text completion, plain mode
    pub async fn generate_completion(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> GatewayResult<String> {
        Self::text_from(self.generate_completion_envelope(prompt, options).await)
    }

    /// Schema-constrained generation: a JSON value shaped by `schema`
    pub async fn generate_structured_output(
        &self,
        prompt: &str,
        schema: Value,
        options: GenerationOptions,
    ) -> GatewayResult<Value> {
        let (_, _, value) = self.coerce_structured(prompt, &schema, &options).await?;
        Ok(value)
    }

    /// Vision analysis. Returns `Ok(None)` on graceful failure; only fatal
    /// credential errors propagate as `Err`.
    pub async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
        options: GenerationOptions,
    ) -> GatewayResult<Option<String>> {
        let envelope = self
            .execute(RequestEnvelope::vision(
                image.to_vec(),
                mime_type,
                prompt,
                options,
            ))
            .await;

        if let Some(record) = envelope.error {
            if matches!(record.code, ErrorCode::AuthFailed | ErrorCode::AccessForbidden) {
                return Err(GatewayError::Upstream { record });
            }
            return Ok(None);
        }
        Ok(envelope.text.filter(|t| !t.is_empty()))
    }

    /// Image generation, envelope mode. The envelope's text carries the
    /// image reference (URL or base64 payload) and `raw` the full response.
    pub async fn generate_image(
        &self,
        prompt: &str,
        options: GenerationOptions,
    ) -> ResponseEnvelope {
        let requested = self.requested_model(&options, &self.image_model);
        let Some(model) = self.resolver.resolve(&requested, Some(caps::IMAGE_OUTPUT)) else {
            return self.unresolved_envelope(&requested);
        };

        let request = ChatRequest::new(&model, vec![Message::user(prompt)]).with_options(&options);
        let adapter = self.adapter_for(&model);
        let outcome = self.retry.execute(|| adapter.generate_image(&request)).await;

        match outcome.result {
            Ok(envelope) => envelope,
            Err(error) => {
                self.failure_envelope(&error, ErrorCode::ChatError, &model, adapter.name())
            }
        }
    }

    /// Capability probe shared by this gateway
    pub fn probe(&self) -> &Arc<CapabilityProbe> {
        &self.probe
    }

    // ------------------------------------------------------------------
    // kind runners
    // ------------------------------------------------------------------

    async fn run_chat_kind(
        &self,
        messages: Vec<Message>,
        options: &GenerationOptions,
    ) -> ResponseEnvelope {
        let requested = self.requested_model(options, &self.default_model);
        let Some(model) = self.resolver.resolve(&requested, Some(caps::CHAT)) else {
            return self.unresolved_envelope(&requested);
        };

        let request = ChatRequest::new(&model, messages).with_options(options);

        // a model advertising image output answers through the image
        // modality, not plain chat
        if self.is_image_model(&model) {
            let adapter = self.adapter_for(&model);
            let outcome = self.retry.execute(|| adapter.generate_image(&request)).await;
            return match outcome.result {
                Ok(envelope) => envelope,
                Err(error) => {
                    self.failure_envelope(&error, ErrorCode::ChatError, &model, adapter.name())
                }
            };
        }

        self.chat_with_substitution(request, ErrorCode::ChatError)
            .await
    }

    async fn run_completion_kind(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ResponseEnvelope {
        let requested = self.requested_model(options, &self.default_model);
        let Some(model) = self.resolver.resolve(&requested, Some(caps::COMPLETION)) else {
            return self.unresolved_envelope(&requested);
        };

        let request = CompletionRequest::new(&model, prompt).with_options(options);
        let adapter = self.adapter_for(&model);
        let outcome = self
            .retry
            .execute(|| adapter.generate_completion(&request))
            .await;

        match outcome.result {
            Ok(envelope) => envelope,
            Err(error) if self.substitutable(&error, &model) => {
                warn!(%model, "completion failed terminally, substituting default model: {error}");
                let substituted =
                    CompletionRequest::new(&self.default_model, prompt).with_options(options);
                let adapter = self.adapter_for(&self.default_model);
                let outcome = self
                    .retry
                    .execute(|| adapter.generate_completion(&substituted))
                    .await;
                match outcome.result {
                    Ok(envelope) => envelope,
                    Err(error) => self.failure_envelope(
                        &error,
                        ErrorCode::CompletionError,
                        &self.default_model,
                        adapter.name(),
                    ),
                }
            }
            Err(error) => {
                self.failure_envelope(&error, ErrorCode::CompletionError, &model, adapter.name())
            }
        }
    }

    async fn run_structured_kind(
        &self,
        prompt: &str,
        schema: Option<Value>,
        options: &GenerationOptions,
    ) -> ResponseEnvelope {
        let schema = schema
            .or_else(|| options.schema.clone())
            .unwrap_or_else(|| Value::Object(Default::default()));

        match self.coerce_structured(prompt, &schema, options).await {
            Ok((model, provider, value)) => {
                ResponseEnvelope::ok(value.to_string(), value, model, provider)
            }
            Err(GatewayError::StructuredOutput { record }) => {
                ResponseEnvelope::failed(record, Value::Null, "", "")
            }
            Err(GatewayError::UnresolvedModel(requested)) => self.unresolved_envelope(&requested),
            Err(GatewayError::Provider(error)) => {
                self.failure_envelope(&error, ErrorCode::ChatError, "", "")
            }
            Err(other) => ResponseEnvelope::failed(
                ErrorRecord::new(ErrorCode::ChatError, None, other.to_string()),
                Value::Null,
                "",
                "",
            ),
        }
    }

    async fn run_vision_kind(
        &self,
        image: &[u8],
        mime_type: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> ResponseEnvelope {
        let requested = self.requested_model(options, &self.vision_model);
        let Some(model) = self.resolver.resolve(&requested, Some(caps::VISION)) else {
            return self.unresolved_envelope(&requested);
        };

        let data_url = format!("data:{mime_type};base64,{}", BASE64.encode(image));
        let message = Message::user_parts(vec![
            ContentPart::Text {
                text: prompt.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        ]);
        let request = ChatRequest::new(&model, vec![message]).with_options(options);

        let adapter = self.adapter_for(&model);
        let outcome = self.retry.execute(|| adapter.analyze_image(&request)).await;

        match outcome.result {
            Ok(envelope) => envelope,
            Err(error) if error.is_fatal() => {
                self.failure_envelope(&error, ErrorCode::ChatError, &model, adapter.name())
            }
            Err(error) if self.substitutable(&error, &model) => {
                // degrade: drop multimodal content and retry on the default
                // text model rather than failing the request outright
                warn!(%model, "vision model unavailable, degrading to text: {error}");
                let degraded: Vec<Message> = request
                    .messages
                    .into_iter()
                    .map(|m| Message {
                        role: m.role,
                        content: m.content.into_text_only(),
                    })
                    .collect();
                let request =
                    ChatRequest::new(&self.default_model, degraded).with_options(options);
                let adapter = self.adapter_for(&self.default_model);
                let outcome = self.retry.execute(|| adapter.chat(&request)).await;
                match outcome.result {
                    Ok(envelope) => envelope,
                    // the documented graceful-empty case: degradation dropped
                    // every usable part and the substitute had nothing to say
                    Err(error) => {
                        debug!("degraded vision request failed: {error}");
                        ResponseEnvelope::empty(&self.default_model, adapter.name())
                    }
                }
            }
            Err(error) => {
                debug!("vision request failed without fallback: {error}");
                self.failure_envelope(&error, ErrorCode::ChatError, &model, adapter.name())
            }
        }
    }

    /// Resolve and run the structured-output coercion ladder.
    /// Returns `(model, provider, value)` on success.
    async fn coerce_structured(
        &self,
        prompt: &str,
        schema: &Value,
        options: &GenerationOptions,
    ) -> GatewayResult<(String, String, Value)> {
        let requested = self.requested_model(options, &self.default_model);
        let model = self
            .resolver
            .resolve(&requested, Some(caps::STRUCTURED_OUTPUT))
            .ok_or_else(|| GatewayError::UnresolvedModel(requested.clone()))?;

        let adapter = Arc::clone(self.adapter_for(&model));
        let provider = adapter.name().to_string();
        let coercer = StructuredOutputCoercer::new(adapter, Arc::clone(&self.probe));
        let value = coercer
            .coerce(&model, prompt, schema, options)
            .await
            .map_err(|error| match error {
                CoercionError::Exhausted { record } => GatewayError::StructuredOutput { record },
                CoercionError::Provider(provider) => GatewayError::Provider(provider),
            })?;
        Ok((model, provider, value))
    }

    // ------------------------------------------------------------------
    // shared plumbing
    // ------------------------------------------------------------------

    fn is_image_model(&self, model: &str) -> bool {
        self.catalog
            .get(model)
            .is_some_and(|entry| entry.has_capability(caps::IMAGE_OUTPUT))
    }

    fn requested_model(&self, options: &GenerationOptions, fallback: &str) -> String {
        options
            .model
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Adapter by the model's provider prefix, falling back to the default
    /// adapter for prefixes no adapter claims (catalog ids are qualified by
    /// upstream author, which the default aggregator fronts)
    fn adapter_for(&self, model: &str) -> &Arc<dyn ProviderAdapter> {
        let prefix = model.split_once('/').map(|(provider, _)| provider);
        prefix
            .and_then(|p| self.adapters.get(p))
            .unwrap_or_else(|| {
                self.adapters
                    .get(&self.default_adapter)
                    .expect("default adapter always registered")
            })
    }

    fn substitutable(&self, error: &ProviderError, model: &str) -> bool {
        error.is_terminal_for_model() && !self.disable_fallbacks && model != self.default_model
    }

    async fn chat_with_substitution(
        &self,
        request: ChatRequest,
        fallback_code: ErrorCode,
    ) -> ResponseEnvelope {
        let model = request.model.clone();
        let adapter = self.adapter_for(&model);
        let outcome = self.retry.execute(|| adapter.chat(&request)).await;

        match outcome.result {
            Ok(envelope) => envelope,
            Err(error) if self.substitutable(&error, &model) => {
                warn!(%model, "chat failed terminally, substituting default model: {error}");
                let mut substituted = request.clone();
                substituted.model = self.default_model.clone();
                let adapter = self.adapter_for(&self.default_model);
                let outcome = self.retry.execute(|| adapter.chat(&substituted)).await;
                match outcome.result {
                    Ok(envelope) => envelope,
                    Err(error) => self.failure_envelope(
                        &error,
                        fallback_code,
                        &self.default_model,
                        adapter.name(),
                    ),
                }
            }
            Err(error) => self.failure_envelope(&error, fallback_code, &model, adapter.name()),
        }
    }

    fn unresolved_envelope(&self, requested: &str) -> ResponseEnvelope {
        ResponseEnvelope::failed(
            ErrorRecord::new(
                ErrorCode::NotFound,
                None,
                format!("no model could be resolved for '{requested}'"),
            ),
            Value::Null,
            requested,
            "",
        )
    }

    fn failure_envelope(
        &self,
        error: &ProviderError,
        fallback_code: ErrorCode,
        model: &str,
        provider: &str,
    ) -> ResponseEnvelope {
        ResponseEnvelope::failed(
            ErrorRecord::from_provider_error(error, fallback_code),
            Value::Null,
            model,
            provider,
        )
    }

    /// Collapse an envelope into the plain-mode contract
    fn text_from(envelope: ResponseEnvelope) -> GatewayResult<String> {
        if let Some(record) = envelope.error {
            return Err(GatewayError::Upstream { record });
        }
        Ok(envelope.text.unwrap_or_default())
    }
}
