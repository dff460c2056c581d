//! Model catalog: the immutable, boot-time list of known models
//!
//! Entries carry a rarity tier (used by calling layers to pick a request
//! budget; irrelevant to gateway correctness) and a capability set used by
//! the resolver's capability-filtered fallback selection.

pub mod canonical;
pub mod resolver;

pub use resolver::ModelResolver;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Capability names advertised by catalog entries
pub mod caps {
    pub const CHAT: &str = "chat";
    pub const COMPLETION: &str = "completion";
    pub const VISION: &str = "vision";
    pub const STRUCTURED_OUTPUT: &str = "structured-output";
    pub const IMAGE_OUTPUT: &str = "image-output";
}

/// Coarse budget tier assigned to each model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// A single catalog entry, immutable after load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Provider-qualified id, e.g. `openai/gpt-4o-mini`
    pub id: String,

    /// Budget tier
    #[serde(default)]
    pub rarity: Rarity,

    /// Advertised capabilities
    #[serde(default)]
    pub capabilities: HashSet<String>,
}

impl ModelEntry {
    /// Create an entry from id, rarity and capability names
    pub fn new(id: impl Into<String>, rarity: Rarity, capabilities: &[&str]) -> Self {
        Self {
            id: id.into(),
            rarity,
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Whether the entry advertises a capability
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Provider segment of the id, if qualified
    pub fn provider(&self) -> Option<&str> {
        self.id.split_once('/').map(|(provider, _)| provider)
    }
}

/// Immutable, boot-time list of known models
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
}

impl ModelCatalog {
    /// Build a catalog from entries
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        Self { entries }
    }

    /// Built-in catalog used when no configuration supplies one
    pub fn default_set() -> Self {
        use caps::*;
        Self::new(vec![
            ModelEntry::new(
                "openai/gpt-4o",
                Rarity::Rare,
                &[CHAT, VISION, STRUCTURED_OUTPUT],
            ),
            ModelEntry::new(
                "openai/gpt-4o-mini",
                Rarity::Common,
                &[CHAT, VISION, STRUCTURED_OUTPUT],
            ),
            ModelEntry::new(
                "anthropic/claude-3.5-sonnet",
                Rarity::Rare,
                &[CHAT, VISION, STRUCTURED_OUTPUT],
            ),
            ModelEntry::new("anthropic/claude-3-haiku", Rarity::Common, &[CHAT, VISION]),
            ModelEntry::new(
                "google/gemini-2.5-flash",
                Rarity::Common,
                &[CHAT, VISION, STRUCTURED_OUTPUT],
            ),
            ModelEntry::new(
                "google/gemini-2.5-pro",
                Rarity::Rare,
                &[CHAT, VISION, STRUCTURED_OUTPUT],
            ),
            ModelEntry::new(
                "google/gemini-2.5-flash-image",
                Rarity::Uncommon,
                &[IMAGE_OUTPUT],
            ),
            ModelEntry::new(
                "meta-llama/llama-3.1-70b-instruct",
                Rarity::Uncommon,
                &[CHAT],
            ),
            ModelEntry::new(
                "mistralai/mistral-7b-instruct",
                Rarity::Common,
                &[CHAT, COMPLETION],
            ),
        ])
    }

    /// Exact lookup by id, case-insensitive
    pub fn get(&self, id: &str) -> Option<&ModelEntry> {
        self.entries
            .iter()
            .find(|e| e.id.eq_ignore_ascii_case(id))
    }

    /// Whether an id is present, case-insensitive
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// All entries
    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    /// Entries advertising a capability
    pub fn with_capability(&self, capability: &str) -> Vec<&ModelEntry> {
        self.entries
            .iter()
            .filter(|e| e.has_capability(capability))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
