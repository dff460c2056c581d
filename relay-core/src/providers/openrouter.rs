//! OpenRouter adapter
//!
//! OpenRouter speaks the OpenAI wire family and fronts many upstream models
//! behind `author/slug` ids. Besides the completion endpoints it exposes a
//! per-model endpoints listing, which backs the capability probe.

use crate::capability::ModelMetadataSource;
use crate::config::secrets::SecretString;
use crate::http::client::HttpClient;
use crate::http::{CallKind, RequestOptions};
use crate::protocol::envelope::ResponseEnvelope;
use crate::protocol::types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse};
use crate::providers::adapter::{envelope_from_chat, envelope_from_completion, ProviderAdapter};
use crate::providers::error::{ProviderError, ProviderResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Fixed identifying headers OpenRouter uses for app attribution
const REFERER_HEADER: &str = "HTTP-Referer";
const TITLE_HEADER: &str = "X-Title";

/// Adapter for the OpenRouter API
pub struct OpenRouterAdapter {
    http: HttpClient,
    base_url: String,
    api_key: SecretString,
    app_referer: String,
    app_title: String,
}

impl OpenRouterAdapter {
    /// Create an adapter against the public OpenRouter endpoint
    pub fn new(http: HttpClient, api_key: SecretString) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL)
    }

    /// Create an adapter against a custom base URL (tests, proxies)
    pub fn with_base_url(
        http: HttpClient,
        api_key: SecretString,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            app_referer: "https://github.com/relay-gateway/relay-rust".to_string(),
            app_title: "relay".to_string(),
        }
    }

    /// Override the attribution headers
    pub fn with_attribution(
        mut self,
        referer: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        self.app_referer = referer.into();
        self.app_title = title.into();
        self
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(REFERER_HEADER.to_string(), self.app_referer.clone());
        headers.insert(TITLE_HEADER.to_string(), self.app_title.clone());
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        let body = serde_json::to_value(request)?;
        let raw = self
            .http
            .post_json(
                &self.url("/chat/completions"),
                &self.headers(),
                &body,
                &RequestOptions::new(CallKind::Chat),
            )
            .await?;
        let parsed: ChatResponse = serde_json::from_value(raw.clone())?;
        Ok(envelope_from_chat(parsed, raw, &request.model, self.name()))
    }

    async fn generate_completion(
        &self,
        request: &CompletionRequest,
    ) -> ProviderResult<ResponseEnvelope> {
        let body = serde_json::to_value(request)?;
        let raw = self
            .http
            .post_json(
                &self.url("/completions"),
                &self.headers(),
                &body,
                &RequestOptions::new(CallKind::Completion),
            )
            .await?;
        let parsed: CompletionResponse = serde_json::from_value(raw.clone())?;
        Ok(envelope_from_completion(
            parsed,
            raw,
            &request.model,
            self.name(),
        ))
    }

    async fn generate_image(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        // image output rides the chat endpoint with an explicit modality list
        let mut request = request.clone();
        request.modalities = Some(vec!["image".to_string(), "text".to_string()]);
        let body = serde_json::to_value(&request)?;
        let raw = self
            .http
            .post_json(
                &self.url("/chat/completions"),
                &self.headers(),
                &body,
                &RequestOptions::new(CallKind::ImageGeneration),
            )
            .await?;
        let parsed: ChatResponse = serde_json::from_value(raw.clone())?;
        Ok(envelope_from_chat(parsed, raw, &request.model, self.name()))
    }
}

#[async_trait]
impl ModelMetadataSource for OpenRouterAdapter {
    async fn supported_parameters(&self, model_id: &str) -> ProviderResult<Vec<String>> {
        let (author, slug) = model_id.split_once('/').ok_or_else(|| {
            ProviderError::InvalidRequest(format!(
                "model id '{model_id}' is not provider-qualified"
            ))
        })?;

        let raw = self
            .http
            .get_json(
                &self.url(&format!("/models/{author}/{slug}/endpoints")),
                &self.headers(),
                &RequestOptions::new(CallKind::ModelMetadata),
            )
            .await?;

        // union of supported_parameters across the model's endpoints
        let endpoints = raw
            .pointer("/data/endpoints")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProviderError::Parse("endpoints listing missing data.endpoints".to_string())
            })?;

        let mut parameters: Vec<String> = Vec::new();
        for endpoint in endpoints {
            if let Some(supported) = endpoint
                .get("supported_parameters")
                .and_then(Value::as_array)
            {
                for parameter in supported.iter().filter_map(Value::as_str) {
                    if !parameters.iter().any(|p| p == parameter) {
                        parameters.push(parameter.to_string());
                    }
                }
            }
        }
        Ok(parameters)
    }
}
