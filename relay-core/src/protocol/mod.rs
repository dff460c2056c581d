//! Canonical request/response contract for the gateway
//!
//! Every provider adapter translates between these types and its own wire
//! format. Callers never see provider-specific payloads except through the
//! opaque `raw` field of the response envelope.

pub mod envelope;
pub mod types;

pub use envelope::{ErrorCode, ErrorRecord, ResponseEnvelope};
pub use types::{
    ChatRequest, ChatResponse, ContentPart, GenerationOptions, Message, MessageContent,
    MessageRole, RequestEnvelope, RequestKind, RequestPayload, ResponseFormat,
};
