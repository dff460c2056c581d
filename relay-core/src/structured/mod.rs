//! Layered structured-output coercion
//!
//! Provider support for schema-constrained decoding is inconsistent enough
//! that one request shape cannot be trusted. The coercer walks an ordered
//! ladder - schema-constrained, JSON mode, key-scaffold prompt - attempting
//! each step twice with a fixed pause, short-circuiting on the first reply
//! that yields a parseable JSON value. The capability probe gates the
//! schema-constrained step so known-unsupported models never see it.

pub mod extract;

use crate::capability::CapabilityProbe;
use crate::protocol::envelope::{ErrorCode, ErrorRecord};
use crate::protocol::types::{ChatRequest, GenerationOptions, Message, ResponseFormat};
use crate::providers::adapter::ProviderAdapter;
use crate::providers::error::ProviderError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Attempts per strategy step
pub const STEP_ATTEMPTS: u32 = 2;

/// Fixed pause between attempts within a step
pub const STEP_BACKOFF: Duration = Duration::from_millis(500);

/// Failure of the whole coercion ladder
#[derive(Debug, Error)]
pub enum CoercionError {
    /// Every strategy exhausted its attempts; carries the last normalized
    /// failure
    #[error("structured output failed: {}", .record.user_message)]
    Exhausted { record: ErrorRecord },

    /// Fatal upstream failure (or probe hard error) that aborted the ladder
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Strategy ladder rungs, in attempt order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    SchemaConstrained,
    JsonMode,
    PromptScaffold,
}

/// Drives provider attempts until one yields schema-shaped JSON
pub struct StructuredOutputCoercer {
    adapter: Arc<dyn ProviderAdapter>,
    probe: Arc<CapabilityProbe>,
}

impl StructuredOutputCoercer {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, probe: Arc<CapabilityProbe>) -> Self {
        Self { adapter, probe }
    }

    /// Coerce a JSON value out of the model
    pub async fn coerce(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
        options: &GenerationOptions,
    ) -> Result<Value, CoercionError> {
        // probe failure is a hard error, not a silent "unsupported"
        let schema_supported = self.probe.supports_structured_output(model).await?;
        let strategies: &[Strategy] = if schema_supported {
            &[
                Strategy::SchemaConstrained,
                Strategy::JsonMode,
                Strategy::PromptScaffold,
            ]
        } else {
            &[Strategy::JsonMode, Strategy::PromptScaffold]
        };

        let mut last_record: Option<ErrorRecord> = None;

        for strategy in strategies {
            'step: for attempt in 1..=STEP_ATTEMPTS {
                let request = self.request_for(*strategy, model, prompt, schema, options);
                debug!(?strategy, attempt, %model, "structured output attempt");

                match self.adapter.chat(&request).await {
                    Ok(envelope) => {
                        if let Some(record) = envelope.error {
                            last_record = Some(record);
                        } else if let Some(text) = envelope.text.as_deref() {
                            match extract::parse_first_json(text) {
                                Some(value) => return Ok(value),
                                None => {
                                    last_record = Some(ErrorRecord::new(
                                        ErrorCode::Format,
                                        None,
                                        "response contained no parseable JSON value",
                                    ));
                                }
                            }
                        }
                    }
                    Err(error) if error.is_fatal() => return Err(error.into()),
                    Err(error) if error.is_terminal_for_model() => {
                        // 400-class: the provider rejected this request shape,
                        // retrying it unchanged cannot help
                        last_record =
                            Some(ErrorRecord::from_provider_error(&error, ErrorCode::ChatError));
                        break 'step;
                    }
                    Err(error) => {
                        last_record =
                            Some(ErrorRecord::from_provider_error(&error, ErrorCode::ChatError));
                    }
                }

                if attempt < STEP_ATTEMPTS {
                    tokio::time::sleep(STEP_BACKOFF).await;
                }
            }
        }

        Err(CoercionError::Exhausted {
            record: last_record.unwrap_or_else(|| {
                ErrorRecord::new(
                    ErrorCode::Format,
                    None,
                    "all structured output strategies exhausted",
                )
            }),
        })
    }

    fn request_for(
        &self,
        strategy: Strategy,
        model: &str,
        prompt: &str,
        schema: &Value,
        options: &GenerationOptions,
    ) -> ChatRequest {
        match strategy {
            Strategy::SchemaConstrained => {
                ChatRequest::new(model, vec![Message::user(prompt)])
                    .with_options(options)
                    .with_response_format(ResponseFormat::JsonSchema {
                        json_schema: json!({
                            "name": "structured_output",
                            "strict": true,
                            "schema": schema,
                        }),
                    })
            }
            Strategy::JsonMode => ChatRequest::new(
                model,
                vec![
                    Message::system("Respond with a single valid JSON value and nothing else."),
                    Message::user(prompt),
                ],
            )
            .with_options(options)
            .with_response_format(ResponseFormat::JsonObject),
            Strategy::PromptScaffold => ChatRequest::new(
                model,
                vec![Message::user(scaffold_prompt(prompt, schema))],
            )
            .with_options(options),
        }
    }
}

/// Build a plain-text instruction block enumerating the schema's top-level
/// keys with placeholder values
fn scaffold_prompt(prompt: &str, schema: &Value) -> String {
    let mut lines = Vec::new();
    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, property) in properties {
            let placeholder = match property.get("type").and_then(Value::as_str) {
                Some("string") => "\"...\"",
                Some("number") | Some("integer") => "0",
                Some("boolean") => "false",
                Some("array") => "[]",
                Some("object") => "{}",
                _ => "null",
            };
            lines.push(format!("  \"{key}\": {placeholder}"));
        }
    }
    format!(
        "{prompt}\n\nReply with exactly one JSON object shaped like this, \
         with real values substituted and no other text:\n{{\n{}\n}}",
        lines.join(",\n")
    )
}
