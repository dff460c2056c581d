//! Configuration schema structures with serde support

use super::error::{ValidationError, ValidationErrorKind};
use super::secrets::SecretString;
use crate::catalog::{ModelCatalog, ModelEntry, Rarity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Configured providers
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Gateway construction flags and defaults
    #[serde(default)]
    pub gateway: GatewaySettings,
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Unique provider name, matching the provider segment of model ids
    pub name: String,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Base URL for the provider API
    pub base_url: String,

    /// Models this provider serves
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Whether this provider is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Model configuration entry
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Provider-qualified model id
    pub id: String,

    /// Budget tier
    #[serde(default)]
    pub rarity: Rarity,

    /// Advertised capabilities
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Gateway construction flags and default models
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Default text model when a request names none
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Model used for vision requests
    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    /// Model used for image generation
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Disable fuzzy resolution; canonicalized ids pass through verbatim
    #[serde(default)]
    pub lock_models: bool,

    /// Verbose per-step resolution logging
    #[serde(default)]
    pub trace_resolution: bool,

    /// Disable all model-substitution fallbacks
    #[serde(default)]
    pub disable_fallbacks: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            vision_model: default_vision_model(),
            image_model: default_image_model(),
            lock_models: false,
            trace_resolution: false,
            disable_fallbacks: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_image_model() -> String {
    "google/gemini-2.5-flash-image".to_string()
}

impl RelayConfig {
    /// Validate the configuration, reporting the offending field path
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::required("version"));
        }

        let mut seen_providers = HashSet::new();
        let mut seen_models = HashSet::new();

        for (i, provider) in self.providers.iter().enumerate() {
            if provider.name.is_empty() {
                return Err(ValidationError::required(format!("providers[{i}].name")));
            }
            if !seen_providers.insert(provider.name.clone()) {
                return Err(ValidationError::new(
                    format!("providers[{i}].name"),
                    ValidationErrorKind::DuplicateValue {
                        value: provider.name.clone(),
                    },
                ));
            }
            if provider.api_key.is_empty() {
                return Err(ValidationError::required(format!("providers[{i}].api_key")));
            }
            if let Err(e) = url::Url::parse(&provider.base_url) {
                return Err(ValidationError::new(
                    format!("providers[{i}].base_url"),
                    ValidationErrorKind::InvalidUrl {
                        message: e.to_string(),
                    },
                ));
            }

            for (j, model) in provider.models.iter().enumerate() {
                if model.id.is_empty() {
                    return Err(ValidationError::required(format!(
                        "providers[{i}].models[{j}].id"
                    )));
                }
                if !seen_models.insert(model.id.to_ascii_lowercase()) {
                    return Err(ValidationError::new(
                        format!("providers[{i}].models[{j}].id"),
                        ValidationErrorKind::DuplicateValue {
                            value: model.id.clone(),
                        },
                    ));
                }
            }
        }

        Ok(())
    }

    /// Build the boot-time catalog from the configured model lists.
    /// Falls back to the built-in default set when no models are configured.
    pub fn catalog(&self) -> ModelCatalog {
        let entries: Vec<ModelEntry> = self
            .providers
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| &p.models)
            .map(|m| ModelEntry {
                id: m.id.clone(),
                rarity: m.rarity,
                capabilities: m.capabilities.iter().cloned().collect(),
            })
            .collect();

        if entries.is_empty() {
            ModelCatalog::default_set()
        } else {
            ModelCatalog::new(entries)
        }
    }
}
