//! Relay Core Library
//!
//! A multi-provider AI completion gateway: provider-agnostic requests in,
//! a uniform response contract out, with fuzzy model resolution, cached
//! capability probing, layered structured-output coercion and bounded
//! retry in between.

pub mod capability;
pub mod catalog;
pub mod config;
pub mod gateway;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod retry;
pub mod structured;

pub use catalog::{caps, ModelCatalog, ModelEntry, ModelResolver, Rarity};
pub use capability::CapabilityProbe;
pub use config::RelayConfig;
pub use gateway::{Gateway, GatewayBuilder, GatewayError, GatewayResult};
pub use protocol::{
    ErrorCode, ErrorRecord, GenerationOptions, Message, ResponseEnvelope,
};
pub use providers::{ProviderAdapter, ProviderError, ProviderResult};
pub use retry::RetryController;
pub use structured::StructuredOutputCoercer;

/// Returns the version of the Relay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
