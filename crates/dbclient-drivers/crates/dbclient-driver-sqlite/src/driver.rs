//! SQLite provider factory

use dbclient_core::{DbConnection, ProviderFactory, Result};

use crate::SqliteConnection;

/// SQLite database provider
#[derive(Debug)]
pub struct SqliteProvider;

impl SqliteProvider {
    /// Create a new SQLite provider instance
    pub fn new() -> Self {
        tracing::debug!("SQLite provider initialized");
        Self
    }
}

impl Default for SqliteProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory for SqliteProvider {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_connection(&self) -> Result<Box<dyn DbConnection>> {
        Ok(Box::new(SqliteConnection::new()))
    }
}
