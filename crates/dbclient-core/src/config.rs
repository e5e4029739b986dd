//! Client configuration and the resolved settings injected into assemblers
//!
//! A [`ClientConfig`] is plain data read from a TOML or JSON file (or built
//! in code). It is resolved once, against a [`ProviderRegistry`], into a
//! [`ConnectionSettings`] that assemblers share read-only.

use crate::{DbClientError, ProviderFactory, ProviderRegistry, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Connection name used when an assembler is not told otherwise
pub const DEFAULT_CONNECTION_NAME: &str = "DefaultConnection";

/// Application settings section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Registry key of the provider to use (e.g., "sqlite")
    #[serde(default, alias = "DbProviderFactory")]
    pub db_provider_factory: Option<String>,
}

/// Client configuration as stored on disk
///
/// ```toml
/// [connection_strings]
/// DefaultConnection = "Data Source=app.db"
///
/// [app_settings]
/// db_provider_factory = "sqlite"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Named connection strings
    #[serde(default, alias = "ConnectionStrings")]
    pub connection_strings: BTreeMap<String, String>,
    #[serde(default, alias = "AppSettings")]
    pub app_settings: AppSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_string(mut self, name: &str, connection_string: &str) -> Self {
        self.connection_strings
            .insert(name.to_string(), connection_string.to_string());
        self
    }

    pub fn with_provider(mut self, key: &str) -> Self {
        self.app_settings.db_provider_factory = Some(key.to_string());
        self
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| {
            DbClientError::Configuration(format!("Failed to parse TOML configuration: {}", e))
        })
    }

    /// Parse a JSON document
    pub fn from_json_str(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| {
            DbClientError::Configuration(format!("Failed to parse JSON configuration: {}", e))
        })
    }

    /// Load a configuration file; `.json` files are read as JSON, anything else as TOML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading client configuration");

        let source = std::fs::read_to_string(path).map_err(|e| {
            DbClientError::Configuration(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_toml_str(&source)
        }
    }

    /// Load a configuration file if it exists, otherwise return an empty configuration
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "configuration file not found, using defaults");
            Ok(Self::default())
        }
    }
}

/// Resolved provider and connection strings shared by assemblers
#[derive(Clone, Default)]
pub struct ConnectionSettings {
    provider: Option<Arc<dyn ProviderFactory>>,
    connection_strings: BTreeMap<String, String>,
}

impl ConnectionSettings {
    /// Settings with a provider and no connection strings
    pub fn new(provider: Arc<dyn ProviderFactory>) -> Self {
        Self {
            provider: Some(provider),
            connection_strings: BTreeMap::new(),
        }
    }

    pub fn with_connection_string(mut self, name: &str, connection_string: &str) -> Self {
        self.connection_strings
            .insert(name.to_string(), connection_string.to_string());
        self
    }

    /// Resolve a configuration against the registered providers
    pub fn from_config(config: &ClientConfig, registry: &ProviderRegistry) -> Result<Self> {
        let key = config
            .app_settings
            .db_provider_factory
            .as_deref()
            .ok_or_else(|| {
                DbClientError::Configuration("No database provider configured".into())
            })?;

        let provider = registry.get(key).ok_or_else(|| {
            DbClientError::Configuration(format!(
                "Unknown database provider '{}'. Registered providers: {}",
                key,
                registry.list().join(", ")
            ))
        })?;

        tracing::info!(
            provider = %provider.name(),
            connection_strings = config.connection_strings.len(),
            "connection settings resolved"
        );
        Ok(Self {
            provider: Some(provider),
            connection_strings: config.connection_strings.clone(),
        })
    }

    /// Look up a connection string by name (case-insensitive)
    pub fn resolve_connection_string(&self, name: &str) -> Result<&str> {
        self.connection_strings
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| {
                DbClientError::Configuration(format!("No connection string named '{}'", name))
            })
    }

    /// The configured provider
    pub fn resolve_provider_factory(&self) -> Result<Arc<dyn ProviderFactory>> {
        self.provider
            .clone()
            .ok_or_else(|| DbClientError::Configuration("No database provider configured".into()))
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .field(
                "connection_strings",
                &self.connection_strings.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests;
