//! Registry of available providers

use crate::ProviderFactory;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps provider keys to factories. Keys are case-insensitive.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name
    pub fn register(&mut self, provider: Arc<dyn ProviderFactory>) {
        let name = provider.name().to_string();
        self.register_as(&name, provider);
    }

    /// Register a provider under an alias, e.g. the key used in configuration
    pub fn register_as(&mut self, key: &str, provider: Arc<dyn ProviderFactory>) {
        tracing::info!(provider = %provider.name(), key = %key, "registering database provider");
        self.providers.insert(key.to_lowercase(), provider);
    }

    /// Get a provider by key
    pub fn get(&self, key: &str) -> Option<Arc<dyn ProviderFactory>> {
        let provider = self.providers.get(&key.to_lowercase()).cloned();
        if provider.is_none() {
            tracing::warn!(provider = %key, "provider not found in registry");
        }
        provider
    }

    /// List all registered keys
    pub fn list(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Check if a provider is registered
    pub fn has(&self, key: &str) -> bool {
        self.providers.contains_key(&key.to_lowercase())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}
