//! dbclient drivers - built-in database providers
//!
//! This crate wires the concrete providers into a [`ProviderRegistry`] and
//! re-exports the core types, so applications only need this one dependency:
//!
//! ```no_run
//! use dbclient_drivers::{CommandAssembler, load_settings};
//! use std::sync::Arc;
//!
//! let settings = Arc::new(load_settings("dbclient.toml")?);
//! let mut assembler =
//!     CommandAssembler::new(settings).with_command_text("SELECT name FROM users WHERE id IN (@ids)");
//! assembler.bindings_mut().add_value("ids", vec![1, 2, 3])?;
//! let table = assembler.materialize_table()?;
//! # Ok::<(), dbclient_drivers::DbClientError>(())
//! ```

#[cfg(feature = "sqlite")]
pub use dbclient_driver_sqlite as sqlite;

mod registry;

pub use registry::{default_registry, load_settings, settings_from_config};

/// Re-export commonly used types from dbclient-core
pub use dbclient_core::{
    BindingSet, ClientConfig, ColumnMeta, CommandAssembler, CommandKind, ConnectionSettings,
    DataTable, DbClientError, DbType, ParameterBinding, ParameterDirection, ProviderFactory,
    ProviderRegistry, Result, Row, RowStream, StreamOptions, TypeHint, Value,
};
