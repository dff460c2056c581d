//! OpenAI-compatible adapter
//!
//! Serves any backend speaking the plain OpenAI wire format (api.openai.com
//! or a compatible deployment behind a custom base URL). Catalog ids are
//! provider-qualified; the qualifier is stripped before hitting the wire
//! since OpenAI expects bare model names.

use crate::config::secrets::SecretString;
use crate::http::client::HttpClient;
use crate::http::{CallKind, RequestOptions};
use crate::protocol::envelope::{ErrorCode, ErrorRecord, ResponseEnvelope};
use crate::protocol::types::{ChatRequest, ChatResponse, CompletionRequest, CompletionResponse};
use crate::providers::adapter::{envelope_from_chat, envelope_from_completion, ProviderAdapter};
use crate::providers::error::ProviderResult;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Adapter for OpenAI-compatible backends
pub struct OpenAiAdapter {
    http: HttpClient,
    base_url: String,
    api_key: SecretString,
    organization: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(http: HttpClient, api_key: SecretString) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        http: HttpClient,
        api_key: SecretString,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key.expose_secret()),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        if let Some(organization) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), organization.clone());
        }
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Strip the catalog's provider qualifier for the wire
    fn wire_model(model: &str) -> &str {
        model.split_once('/').map_or(model, |(_, slug)| slug)
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        let mut wire = request.clone();
        wire.model = Self::wire_model(&request.model).to_string();
        let body = serde_json::to_value(&wire)?;
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
        let mut wire = request.clone();
        wire.model = Self::wire_model(&request.model).to_string();
        let body = serde_json::to_value(&wire)?;
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
        // OpenAI serves image output from a dedicated endpoint
        let prompt = request
            .messages
            .iter()
            .filter_map(|m| m.content.as_text())
            .collect::<Vec<_>>()
            .join("\n");
        let body = json!({
            "model": Self::wire_model(&request.model),
            "prompt": prompt,
            "n": 1,
            "response_format": "b64_json",
        });
        let raw = self
            .http
            .post_json(
                &self.url("/images/generations"),
                &self.headers(),
                &body,
                &RequestOptions::new(CallKind::ImageGeneration),
            )
            .await?;

        let image = raw.pointer("/data/0").cloned().unwrap_or(Value::Null);
        let reference = image
            .get("url")
            .or_else(|| image.get("b64_json"))
            .and_then(Value::as_str);
        Ok(match reference {
            Some(reference) => {
                ResponseEnvelope::ok(reference, raw, request.model.clone(), self.name())
            }
            None => ResponseEnvelope::failed(
                ErrorRecord::new(ErrorCode::NoContent, None, "image response carried no data"),
                raw,
                request.model.clone(),
                self.name(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_model_strips_qualifier() {
        assert_eq!(OpenAiAdapter::wire_model("openai/gpt-4o-mini"), "gpt-4o-mini");
        assert_eq!(OpenAiAdapter::wire_model("gpt-4o-mini"), "gpt-4o-mini");
    }
}
