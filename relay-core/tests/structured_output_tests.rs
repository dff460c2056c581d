//! Structured-output coercion through the public gateway surface

use async_trait::async_trait;
use relay_core::capability::ModelMetadataSource;
use relay_core::protocol::types::{
    ChatRequest, CompletionRequest, GenerationOptions, ResponseFormat,
};
use relay_core::protocol::{ErrorCode, ResponseEnvelope};
use relay_core::providers::{ProviderAdapter, ProviderError, ProviderResult};
use relay_core::{Gateway, GatewayBuilder, GatewayError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Adapter that replies from a fixed script and records every request
struct ScriptedAdapter {
    requests: Mutex<Vec<ChatRequest>>,
    replies: Mutex<Vec<ProviderResult<ResponseEnvelope>>>,
}

impl ScriptedAdapter {
    fn new(replies: Vec<ProviderResult<ResponseEnvelope>>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(replies),
        })
    }

    fn ok(text: &str) -> ProviderResult<ResponseEnvelope> {
        Ok(ResponseEnvelope::ok(text, Value::Null, "scripted-model", "scripted"))
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn schema_constrained_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| matches!(r.response_format, Some(ResponseFormat::JsonSchema { .. })))
            .count()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Self::ok("{}")
        } else {
            replies.remove(0)
        }
    }

    async fn generate_completion(
        &self,
        _request: &CompletionRequest,
    ) -> ProviderResult<ResponseEnvelope> {
        panic!("structured output must not hit the completion endpoint")
    }

    async fn generate_image(&self, _request: &ChatRequest) -> ProviderResult<ResponseEnvelope> {
        panic!("structured output must not hit the image endpoint")
    }
}

/// Metadata source advertising a fixed parameter list
struct StaticMetadata {
    parameters: Vec<String>,
}

#[async_trait]
impl ModelMetadataSource for StaticMetadata {
    async fn supported_parameters(&self, _model_id: &str) -> ProviderResult<Vec<String>> {
        Ok(self.parameters.clone())
    }
}

fn gateway(adapter: Arc<ScriptedAdapter>, parameters: &[&str]) -> Gateway {
    GatewayBuilder::new()
        .adapter(adapter)
        .metadata_source(Arc::new(StaticMetadata {
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }))
        .seed(11)
        .build()
        .unwrap()
}

fn schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "score": {"type": "number"},
        },
    })
}

#[tokio::test]
async fn unsupported_model_skips_the_schema_constrained_path() {
    let adapter = ScriptedAdapter::new(vec![ScriptedAdapter::ok(r#"{"title":"t","score":1}"#)]);
    let gateway = gateway(adapter.clone(), &["temperature", "top_p"]);

    let value = gateway
        .generate_structured_output(
            "summarize",
            schema(),
            GenerationOptions::for_model("meta-llama/llama-3.1-70b-instruct"),
        )
        .await
        .unwrap();

    assert_eq!(value["title"], "t");
    assert_eq!(adapter.schema_constrained_calls(), 0);
    assert!(matches!(
        adapter.requests()[0].response_format,
        Some(ResponseFormat::JsonObject)
    ));
}

#[tokio::test]
async fn supported_model_uses_the_schema_constrained_path_first() {
    let adapter = ScriptedAdapter::new(vec![ScriptedAdapter::ok(r#"{"title":"x","score":2}"#)]);
    let gateway = gateway(adapter.clone(), &["response_format", "structured_outputs"]);

    let value = gateway
        .generate_structured_output(
            "summarize",
            schema(),
            GenerationOptions::for_model("openai/gpt-4o"),
        )
        .await
        .unwrap();

    assert_eq!(value["score"], 2);
    assert_eq!(adapter.schema_constrained_calls(), 1);
}

#[tokio::test]
async fn prose_wrapped_json_still_parses() {
    let adapter = ScriptedAdapter::new(vec![ScriptedAdapter::ok(
        r#"Here you go: {"title":"wrapped","score":3} hope that helps!"#,
    )]);
    let gateway = gateway(adapter.clone(), &["response_format"]);

    let value = gateway
        .generate_structured_output("go", schema(), GenerationOptions::for_model("openai/gpt-4o"))
        .await
        .unwrap();
    assert_eq!(value["title"], "wrapped");
}

#[tokio::test(start_paused = true)]
async fn schema_rejection_degrades_through_the_ladder() {
    let adapter = ScriptedAdapter::new(vec![
        // schema-constrained rejected outright
        Err(ProviderError::InvalidRequest("response_format not supported".into())),
        // JSON mode returns garbage twice
        ScriptedAdapter::ok("not json"),
        ScriptedAdapter::ok("still not json"),
        // scaffold prompt finally lands
        ScriptedAdapter::ok(r#"{"title":"rescued","score":9}"#),
    ]);
    let gateway = gateway(adapter.clone(), &["response_format"]);

    let value = gateway
        .generate_structured_output("go", schema(), GenerationOptions::for_model("openai/gpt-4o"))
        .await
        .unwrap();

    assert_eq!(value["title"], "rescued");
    let requests = adapter.requests();
    assert_eq!(requests.len(), 4);
    // last request is the plain-text scaffold
    assert!(requests[3].response_format.is_none());
}

#[tokio::test(start_paused = true)]
async fn exhaustion_surfaces_the_last_normalized_record() {
    let replies = (0..6).map(|_| ScriptedAdapter::ok("nope")).collect();
    let adapter = ScriptedAdapter::new(replies);
    let gateway = gateway(adapter.clone(), &["response_format"]);

    let error = gateway
        .generate_structured_output("go", schema(), GenerationOptions::for_model("openai/gpt-4o"))
        .await
        .unwrap_err();

    match error {
        GatewayError::StructuredOutput { record } => {
            assert_eq!(record.code, ErrorCode::Format);
            assert!(!record.user_message.contains("nope"));
        }
        other => panic!("expected StructuredOutput, got {other:?}"),
    }
    assert_eq!(adapter.requests().len(), 6);
}
