//! Gateway construction
//!
//! All collaborators are injected here, once, at composition time: adapters,
//! the catalog, the metadata source backing the probe, retry policy, and the
//! construction flags. There is no runtime backend switching.

use crate::capability::{CapabilityProbe, ModelMetadataSource};
use crate::catalog::{ModelCatalog, ModelResolver};
use crate::config::{RelayConfig, SecretString};
use crate::gateway::{Gateway, GatewayError, GatewayResult};
use crate::http::client::HttpClient;
use crate::providers::adapter::ProviderAdapter;
use crate::providers::{OpenAiAdapter, OpenRouterAdapter};
use crate::retry::RetryController;
use std::collections::HashMap;
use std::sync::Arc;

/// Builder for [`Gateway`]
pub struct GatewayBuilder {
    catalog: Option<ModelCatalog>,
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    metadata_source: Option<Arc<dyn ModelMetadataSource>>,
    retry: RetryController,
    default_model: String,
    vision_model: String,
    image_model: String,
    lock_models: bool,
    trace_resolution: bool,
    disable_fallbacks: bool,
    seed: Option<u64>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        let settings = crate::config::GatewaySettings::default();
        Self {
            catalog: None,
            adapters: Vec::new(),
            metadata_source: None,
            retry: RetryController::new(),
            default_model: settings.default_model,
            vision_model: settings.vision_model,
            image_model: settings.image_model,
            lock_models: false,
            trace_resolution: false,
            disable_fallbacks: false,
            seed: None,
        }
    }

    /// Seed the builder from a loaded configuration
    pub fn from_config(config: &RelayConfig) -> GatewayResult<Self> {
        let http = HttpClient::new()?;
        let mut builder = Self::new()
            .catalog(config.catalog())
            .default_model(&config.gateway.default_model)
            .vision_model(&config.gateway.vision_model)
            .image_model(&config.gateway.image_model)
            .lock_models(config.gateway.lock_models)
            .trace_resolution(config.gateway.trace_resolution)
            .disable_fallbacks(config.gateway.disable_fallbacks);

        for provider in config.providers.iter().filter(|p| p.enabled) {
            match provider.name.as_str() {
                "openrouter" => {
                    let adapter = Arc::new(OpenRouterAdapter::with_base_url(
                        http.clone(),
                        provider.api_key.clone(),
                        &provider.base_url,
                    ));
                    builder = builder
                        .metadata_source(adapter.clone() as Arc<dyn ModelMetadataSource>)
                        .adapter(adapter);
                }
                // anything else is treated as OpenAI-compatible
                _ => {
                    builder = builder.adapter(Arc::new(OpenAiAdapter::with_base_url(
                        http.clone(),
                        provider.api_key.clone(),
                        &provider.base_url,
                    )));
                }
            }
        }

        Ok(builder)
    }

    /// Set the model catalog (defaults to the built-in set)
    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a provider adapter. The first registered adapter becomes the
    /// default route for models whose provider prefix no adapter claims.
    pub fn adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Set the metadata source backing the capability probe
    pub fn metadata_source(mut self, source: Arc<dyn ModelMetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    /// Override the retry controller
    pub fn retry(mut self, retry: RetryController) -> Self {
        self.retry = retry;
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }

    /// Lock flag: disable fuzzy resolution
    pub fn lock_models(mut self, locked: bool) -> Self {
        self.lock_models = locked;
        self
    }

    /// Trace flag: verbose resolution logging
    pub fn trace_resolution(mut self, trace: bool) -> Self {
        self.trace_resolution = trace;
        self
    }

    /// Disable all model-substitution fallbacks
    pub fn disable_fallbacks(mut self, disable: bool) -> Self {
        self.disable_fallbacks = disable;
        self
    }

    /// Fix the resolver's RNG seed (deterministic random fallback)
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> GatewayResult<Gateway> {
        if self.adapters.is_empty() {
            return Err(GatewayError::NoAdapters);
        }
        let metadata_source = self
            .metadata_source
            .ok_or(GatewayError::MissingMetadataSource)?;

        let catalog = Arc::new(self.catalog.unwrap_or_else(ModelCatalog::default_set));
        let resolver = match self.seed {
            Some(seed) => ModelResolver::with_seed(Arc::clone(&catalog), seed),
            None => ModelResolver::new(Arc::clone(&catalog)),
        }
        .locked(self.lock_models)
        .traced(self.trace_resolution);

        let default_adapter = self.adapters[0].name().to_string();
        let adapters: HashMap<String, Arc<dyn ProviderAdapter>> = self
            .adapters
            .into_iter()
            .map(|a| (a.name().to_string(), a))
            .collect();

        Ok(Gateway {
            catalog,
            resolver,
            probe: Arc::new(CapabilityProbe::new(metadata_source)),
            adapters,
            default_adapter,
            retry: self.retry,
            default_model: self.default_model,
            vision_model: self.vision_model,
            image_model: self.image_model,
            disable_fallbacks: self.disable_fallbacks,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience: an OpenRouter-backed gateway with the built-in catalog
pub fn openrouter_gateway(api_key: impl Into<String>) -> GatewayResult<Gateway> {
    let http = HttpClient::new()?;
    let adapter = Arc::new(OpenRouterAdapter::new(
        http,
        SecretString::new(api_key.into()),
    ));
    GatewayBuilder::new()
        .metadata_source(adapter.clone() as Arc<dyn ModelMetadataSource>)
        .adapter(adapter)
        .build()
}
