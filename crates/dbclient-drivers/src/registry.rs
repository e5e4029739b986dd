//! Registry of the built-in providers

use dbclient_core::{ClientConfig, ConnectionSettings, ProviderRegistry, Result};
use std::path::Path;

/// Create a registry with all built-in providers registered
pub fn default_registry() -> ProviderRegistry {
    #[allow(unused_mut)]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "sqlite")]
    registry.register(std::sync::Arc::new(crate::sqlite::SqliteProvider::new()));

    tracing::debug!(providers = ?registry.list(), "default provider registry created");
    registry
}

/// Resolve a configuration against the built-in providers
pub fn settings_from_config(config: &ClientConfig) -> Result<ConnectionSettings> {
    ConnectionSettings::from_config(config, &default_registry())
}

/// Load a configuration file and resolve it against the built-in providers
pub fn load_settings(path: impl AsRef<Path>) -> Result<ConnectionSettings> {
    let config = ClientConfig::load(path)?;
    settings_from_config(&config)
}
