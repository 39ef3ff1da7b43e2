//! Multi-chain RPC provider configuration.
//!
//! The supervisor receives this from an external collaborator (the caller
//! that resolved a task to a concrete set of chains); the RPC proxy needs
//! a concrete type to route a guest's JSON-RPC calls on, so it is defined
//! here rather than left entirely opaque.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An EVM-style numeric chain id.
pub type ChainId = u64;

/// Map from chain id to the upstream RPC endpoint URL the proxy should
/// forward calls to for that chain.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MultiChainProviderConfig {
    providers: HashMap<ChainId, String>,
}

impl MultiChainProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, chain_id: ChainId, url: impl Into<String>) -> Self {
        self.providers.insert(chain_id, url.into());
        self
    }

    /// Look up the upstream URL for a chain id.
    pub fn upstream_for(&self, chain_id: ChainId) -> Option<&str> {
        self.providers.get(&chain_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = &ChainId> {
        self.providers.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_configured_upstream() {
        let config = MultiChainProviderConfig::new().with_provider(137, "https://polygon.example");
        assert_eq!(config.upstream_for(137), Some("https://polygon.example"));
        assert_eq!(config.upstream_for(1), None);
    }
}
