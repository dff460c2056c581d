//! Core protocol types for LLM interactions
//!
//! The wire family here follows the OpenAI chat-completions shape, which both
//! backed providers speak natively. Optional fields are skipped during
//! serialization so requests stay minimal and responses from looser upstreams
//! still deserialize.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

/// Content of a message - plain text or multimodal parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Structured content parts (for vision requests)
    Parts(Vec<ContentPart>),
}

/// Individual content part for multimodal messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text content part
    Text { text: String },
    /// Image content referenced by URL (data URLs included)
    ImageUrl { image_url: ImageUrl },
}

/// Image reference inside a multimodal part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: MessageContent,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message from multimodal parts
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Parts(parts),
        }
    }
}

impl MessageContent {
    /// Check if content is empty
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(s) => s.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }

    /// Get text representation, if the content is plain text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s.as_str()),
            MessageContent::Parts(_) => None,
        }
    }

    /// Drop non-text parts, flattening what remains into plain text.
    ///
    /// Used by the vision degradation path when a multimodal request is
    /// re-sent to a text-only model.
    pub fn into_text_only(self) -> MessageContent {
        match self {
            MessageContent::Text(s) => MessageContent::Text(s),
            MessageContent::Parts(parts) => {
                let text: Vec<String> = parts
                    .into_iter()
                    .filter_map(|p| match p {
                        ContentPart::Text { text } => Some(text),
                        ContentPart::ImageUrl { .. } => None,
                    })
                    .collect();
                MessageContent::Text(text.join("\n"))
            }
        }
    }
}

/// Response format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Plain text response
    Text,
    /// JSON mode, no schema validation
    JsonObject,
    /// JSON constrained by a caller-supplied schema
    JsonSchema { json_schema: Value },
}

/// Chat completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    /// Model identifier to use
    #[serde(default)]
    pub model: String,

    /// Messages in the conversation
    #[serde(default)]
    pub messages: Vec<Message>,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Frequency penalty (-2.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    /// Presence penalty (-2.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Response format hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,

    /// Output modalities (image generation requests set `["image", "text"]`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<String>>,
}

impl ChatRequest {
    /// Create a new chat request with model and messages
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    /// Apply caller-supplied generation options to this request
    pub fn with_options(mut self, options: &GenerationOptions) -> Self {
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self.top_p = options.top_p;
        self.frequency_penalty = options.frequency_penalty;
        self.presence_penalty = options.presence_penalty;
        self
    }

    /// Set the response format
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// Legacy text completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CompletionRequest {
    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub prompt: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: &GenerationOptions) -> Self {
        self.temperature = options.temperature;
        self.max_tokens = options.max_tokens;
        self.top_p = options.top_p;
        self.frequency_penalty = options.frequency_penalty;
        self.presence_penalty = options.presence_penalty;
        self
    }
}

/// Message returned inside a response choice.
///
/// Distinct from [`Message`]: upstreams routinely omit content or return
/// extra fields, so everything here is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResponseMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Generated images (image-output models)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<GeneratedImage>>,
}

/// A generated image attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,

    pub image_url: ImageUrl,
}

/// Response choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseChoice {
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub message: ResponseMessage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Complete chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<ResponseChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

/// Legacy completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: usize,

    #[serde(default)]
    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Legacy completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub model: String,

    #[serde(default)]
    pub choices: Vec<CompletionChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<CompletionUsage>,
}

/// Token usage information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

/// Caller-supplied generation options, provider-agnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerationOptions {
    /// Requested model id; resolved against the catalog before use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,

    /// Schema for structured generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// Envelope mode: failures come back inside the response envelope
    /// instead of as errors
    #[serde(default)]
    pub return_envelope: bool,
}

impl GenerationOptions {
    /// Options targeting a specific model
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Default::default()
        }
    }
}

/// Kind of gateway request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Chat,
    Completion,
    Vision,
    Structured,
}

/// Payload variants for a gateway request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPayload {
    Chat { messages: Vec<Message> },
    Completion { prompt: String },
    Vision {
        image: Vec<u8>,
        mime_type: String,
        prompt: String,
    },
}

/// Provider-agnostic request accepted at the gateway boundary
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub kind: RequestKind,
    pub payload: RequestPayload,
    pub schema: Option<Value>,
    pub options: GenerationOptions,
}

impl RequestEnvelope {
    pub fn chat(messages: Vec<Message>, options: GenerationOptions) -> Self {
        Self {
            kind: RequestKind::Chat,
            payload: RequestPayload::Chat { messages },
            schema: None,
            options,
        }
    }

    pub fn completion(prompt: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            kind: RequestKind::Completion,
            payload: RequestPayload::Completion {
                prompt: prompt.into(),
            },
            schema: None,
            options,
        }
    }

    pub fn vision(
        image: Vec<u8>,
        mime_type: impl Into<String>,
        prompt: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            kind: RequestKind::Vision,
            payload: RequestPayload::Vision {
                image,
                mime_type: mime_type.into(),
                prompt: prompt.into(),
            },
            schema: None,
            options,
        }
    }

    pub fn structured(
        prompt: impl Into<String>,
        schema: Value,
        options: GenerationOptions,
    ) -> Self {
        Self {
            kind: RequestKind::Structured,
            payload: RequestPayload::Completion {
                prompt: prompt.into(),
            },
            schema: Some(schema),
            options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serializes_minimal() {
        let request = ChatRequest::new("openai/gpt-4o-mini", vec![Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "openai/gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn response_format_wire_shape() {
        let format = ResponseFormat::JsonSchema {
            json_schema: serde_json::json!({"name": "reply"}),
        };
        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["type"], "json_schema");
        assert_eq!(json["json_schema"]["name"], "reply");

        let json = serde_json::to_value(ResponseFormat::JsonObject).unwrap();
        assert_eq!(json["type"], "json_object");
    }

    #[test]
    fn multimodal_content_flattens_to_text() {
        let content = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "what is this?".into(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AAAA".into(),
                },
            },
        ]);
        assert_eq!(
            content.into_text_only(),
            MessageContent::Text("what is this?".into())
        );
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"ok"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("ok")
        );
        assert!(response.usage.is_none());
    }
}
