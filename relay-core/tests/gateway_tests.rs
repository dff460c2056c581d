//! Gateway integration tests against a mock HTTP upstream

use relay_core::capability::ModelMetadataSource;
use relay_core::config::SecretString;
use relay_core::http::client::HttpClient;
use relay_core::protocol::types::{GenerationOptions, Message};
use relay_core::protocol::ErrorCode;
use relay_core::providers::OpenRouterAdapter;
use relay_core::{Gateway, GatewayBuilder, GatewayError};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn gateway_against(server: &MockServer) -> Gateway {
    let adapter = Arc::new(OpenRouterAdapter::with_base_url(
        HttpClient::new().unwrap(),
        SecretString::new("sk-or-test"),
        server.uri(),
    ));
    GatewayBuilder::new()
        .metadata_source(adapter.clone() as Arc<dyn ModelMetadataSource>)
        .adapter(adapter)
        .seed(7)
        .build()
        .unwrap()
}

fn chat_body(model: &str, content: &str) -> serde_json::Value {
    json!({
        "id": "gen-123",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12},
    })
}

#[tokio::test]
async fn chat_roundtrip_returns_text_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("openai/gpt-4o-mini", "hello!")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .chat_envelope(vec![Message::user("hi")], GenerationOptions::default())
        .await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.text.as_deref(), Some("hello!"));
    assert_eq!(envelope.model, "openai/gpt-4o-mini");
    assert_eq!(envelope.provider, "openrouter");
    assert_eq!(envelope.raw["usage"]["total_tokens"], 12);
}

#[tokio::test]
async fn plain_mode_propagates_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("openai/gpt-4o-mini", "plain")),
        )
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let text = gateway
        .chat(vec![Message::user("hi")], GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(text, "plain");
}

#[tokio::test]
async fn terminal_model_failure_substitutes_the_default_model() {
    let server = MockServer::start().await;

    // the requested model 404s; the default model answers
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "anthropic/claude-3.5-sonnet"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "model 'anthropic/claude-3.5-sonnet' not found"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("openai/gpt-4o-mini", "substituted")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .chat_envelope(
            vec![Message::user("hi")],
            GenerationOptions::for_model("anthropic/claude-3.5-sonnet"),
        )
        .await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.text.as_deref(), Some("substituted"));
    assert_eq!(envelope.model, "openai/gpt-4o-mini");
}

#[tokio::test]
async fn fatal_auth_failure_never_substitutes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "invalid api key"}
        })))
        .expect(1) // exactly one call: no retry, no substitution
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .chat_envelope(
            vec![Message::user("hi")],
            GenerationOptions::for_model("anthropic/claude-3.5-sonnet"),
        )
        .await;

    let record = envelope.error.expect("envelope must carry the failure");
    assert_eq!(record.code, ErrorCode::AuthFailed);
    assert!(envelope.text.is_none());
}

#[tokio::test]
async fn quota_exhaustion_substitutes_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o"})))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {"message": "insufficient credits"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    // substitution target answers
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("openai/gpt-4o-mini", "cheaper")),
        )
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    // quota is terminal for the model: eligible for substitution, not retry
    let envelope = gateway
        .chat_envelope(
            vec![Message::user("hi")],
            GenerationOptions::for_model("openai/gpt-4o"),
        )
        .await;
    assert_eq!(envelope.text.as_deref(), Some("cheaper"));
}

#[tokio::test]
async fn truncated_empty_response_surfaces_max_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-1",
            "model": "openai/gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": ""},
                "finish_reason": "length",
            }],
        })))
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .chat_envelope(vec![Message::user("hi")], GenerationOptions::default())
        .await;

    assert_eq!(envelope.error.unwrap().code, ErrorCode::MaxTokens);
}

#[tokio::test]
async fn plain_mode_surfaces_upstream_error_with_safe_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"message": "org blocked by policy xyz-internal"}
        })))
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let error = gateway
        .chat(vec![Message::user("hi")], GenerationOptions::default())
        .await
        .unwrap_err();

    match error {
        GatewayError::Upstream { record } => {
            assert_eq!(record.code, ErrorCode::AccessForbidden);
            assert!(!record.user_message.contains("xyz-internal"));
        }
        other => panic!("expected Upstream, got {other:?}"),
    }
}

#[tokio::test]
async fn completion_roundtrip_uses_the_completions_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cmpl-1",
            "model": "mistralai/mistral-7b-instruct",
            "choices": [{"index": 0, "text": "completed text", "finish_reason": "stop"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let text = gateway
        .generate_completion(
            "Once upon a time",
            GenerationOptions::for_model("mistralai/mistral-7b-instruct"),
        )
        .await
        .unwrap();
    assert_eq!(text, "completed text");
}

#[tokio::test]
async fn capability_probe_reads_the_endpoints_listing_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/openai/gpt-4o/endpoints"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "openai/gpt-4o",
                "endpoints": [
                    {"supported_parameters": ["temperature", "response_format"]},
                    {"supported_parameters": ["temperature"]},
                ],
            }
        })))
        .expect(1) // second check must come from the cache
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    assert!(gateway
        .probe()
        .supports_structured_output("openai/gpt-4o")
        .await
        .unwrap());
    assert!(gateway
        .probe()
        .supports_structured_output("OPENAI/GPT-4O")
        .await
        .unwrap());
}

#[tokio::test]
async fn probe_failure_is_a_hard_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models/openai/gpt-4o/endpoints"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    assert!(gateway
        .probe()
        .supports_structured_output("openai/gpt-4o")
        .await
        .is_err());
}

fn image_body(model: &str, url: &str) -> serde_json::Value {
    json!({
        "id": "gen-img",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "",
                "images": [{"type": "image_url", "image_url": {"url": url}}],
            },
            "finish_reason": "stop",
        }],
    })
}

#[tokio::test]
async fn chat_against_an_image_model_dispatches_to_image_generation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"modalities": ["image", "text"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body(
            "google/gemini-2.5-flash-image",
            "data:image/png;base64,QUJD",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .chat_envelope(
            vec![Message::user("draw a cat")],
            GenerationOptions::for_model("google/gemini-2.5-flash-image"),
        )
        .await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.text.as_deref(), Some("data:image/png;base64,QUJD"));
}

#[tokio::test]
async fn generate_image_returns_the_image_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_body(
            "google/gemini-2.5-flash-image",
            "https://img.example/cat.png",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let envelope = gateway
        .generate_image("a cat in a hat", GenerationOptions::default())
        .await;

    assert_eq!(envelope.text.as_deref(), Some("https://img.example/cat.png"));
    assert_eq!(envelope.model, "google/gemini-2.5-flash-image");
}

#[tokio::test]
async fn vision_degrades_to_text_when_the_vision_model_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "google/gemini-2.5-flash"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"message": "model 'google/gemini-2.5-flash' not found"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "openai/gpt-4o-mini"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("openai/gpt-4o-mini", "described without the image")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = gateway_against(&server).await;
    let text = gateway
        .analyze_image(
            &[0x89, 0x50, 0x4e, 0x47],
            "image/png",
            "what is in this picture?",
            GenerationOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(text.as_deref(), Some("described without the image"));
}
