//! dbclient core - parameter binding and provider-agnostic command execution
//!
//! This crate defines:
//!
//! - `BindingSet` - ordered, named parameter bindings with type hints
//! - `CommandAssembler` - expands collection bindings into placeholder
//!   lists and runs commands through a provider
//! - `ProviderFactory`, `DbConnection`, `DbCommand`, `RowReader` - the
//!   capabilities a database driver implements
//! - `ClientConfig` / `ConnectionSettings` - configuration resolved once and
//!   injected into assemblers
//!
//! ```
//! use dbclient_core::{BindingSet, Value};
//!
//! let mut bindings = BindingSet::new();
//! bindings.add_value("ids", vec![1, 2, 3]).unwrap();
//! bindings.add_value("name", "x").unwrap();
//! assert_eq!(bindings.len(), 2);
//! assert!(bindings.get("IDS").unwrap().value().is_sequence());
//! assert_eq!(bindings.get("name").unwrap().value(), &Value::from("x"));
//! ```

mod assembler;
mod config;
mod error;
pub mod expansion;
mod parameter;
pub mod placeholder;
mod provider;
mod registry;
mod stream;
mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use assembler::*;
pub use config::*;
pub use error::*;
pub use parameter::*;
pub use placeholder::PlaceholderMatch;
pub use provider::*;
pub use registry::*;
pub use stream::RowStream;
pub use types::*;
