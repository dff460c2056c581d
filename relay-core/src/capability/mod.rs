//! On-demand capability probing with process-lifetime caching
//!
//! Whether a model supports schema-constrained decoding is discovered from
//! the provider's model-metadata endpoint on first use and cached for the
//! rest of the process. Entries never expire: a capability flip upstream
//! requires a restart to observe. Concurrent first probes for the same id
//! may race and duplicate the metadata call; the probe is idempotent and
//! side-effect-free, so the duplicate I/O is accepted instead of a
//! single-flight lock.

use crate::providers::error::ProviderResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Parameter names that indicate schema-constrained decoding support
pub const RESPONSE_FORMAT_PARAMS: &[&str] =
    &["response_format", "structured_outputs", "json_schema"];

/// Source of model metadata, implemented by provider adapters
#[async_trait]
pub trait ModelMetadataSource: Send + Sync {
    /// Advertised parameter names for a model.
    ///
    /// A failure here is a hard error for the caller: silently treating an
    /// unreachable metadata endpoint as "unsupported" would mask confusing
    /// partial-schema output downstream.
    async fn supported_parameters(&self, model_id: &str) -> ProviderResult<Vec<String>>;
}

/// Memoized structured-output capability checks, keyed by lower-cased id
pub struct CapabilityProbe {
    source: Arc<dyn ModelMetadataSource>,
    cache: RwLock<HashMap<String, bool>>,
}

impl CapabilityProbe {
    pub fn new(source: Arc<dyn ModelMetadataSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the model supports schema-constrained decoding
    pub async fn supports_structured_output(&self, model_id: &str) -> ProviderResult<bool> {
        let key = model_id.to_ascii_lowercase();

        if let Some(cached) = self
            .cache
            .read()
            .expect("capability cache lock poisoned")
            .get(&key)
            .copied()
        {
            return Ok(cached);
        }

        let parameters = self.source.supported_parameters(model_id).await?;
        let supported = parameters
            .iter()
            .any(|p| RESPONSE_FORMAT_PARAMS.contains(&p.as_str()));
        debug!(model = %key, supported, "capability probe result cached");

        self.cache
            .write()
            .expect("capability cache lock poisoned")
            .insert(key, supported);
        Ok(supported)
    }

    /// Cached verdict for a model, if one exists
    pub fn cached(&self, model_id: &str) -> Option<bool> {
        self.cache
            .read()
            .expect("capability cache lock poisoned")
            .get(&model_id.to_ascii_lowercase())
            .copied()
    }
}
