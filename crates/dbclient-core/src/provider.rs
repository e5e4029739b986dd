//! Capability traits a database provider implements
//!
//! The assembler only talks to a driver through these traits:
//!
//! - `ProviderFactory` - creates unopened connections
//! - `DbConnection` - opens with a connection string and creates commands
//! - `DbCommand` - carries text, parameters and the execute primitives
//! - `RowReader` - pulls rows from an executed command

use crate::{ColumnMeta, DbParameter, Result, Row, Value};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default command timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// How the command text is interpreted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommandKind {
    /// Plain SQL text
    #[default]
    Text,
    /// Name of a stored procedure
    StoredProcedure,
}

/// Options for reading rows from a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Columns are read in order and each only once
    pub sequential_access: bool,
    /// Stop after the first row
    pub single_row: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            sequential_access: true,
            single_row: false,
        }
    }
}

impl StreamOptions {
    pub fn single_row() -> Self {
        Self {
            single_row: true,
            ..Self::default()
        }
    }
}

/// Command state shared by provider implementations.
///
/// Drivers embed this in their command type and hand it out through
/// [`DbCommand::state`] / [`DbCommand::state_mut`], which gives them the
/// text, kind, timeout and parameter accessors for free.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandState {
    pub text: String,
    pub kind: CommandKind,
    pub timeout: Duration,
    pub parameters: Vec<DbParameter>,
}

impl Default for CommandState {
    fn default() -> Self {
        Self {
            text: String::new(),
            kind: CommandKind::Text,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            parameters: Vec::new(),
        }
    }
}

impl CommandState {
    /// Find a parameter by name (case-insensitive)
    pub fn parameter(&self, name: &str) -> Option<&DbParameter> {
        self.parameters.iter().find(|p| p.is_named(name))
    }
}

/// Creates connections for one kind of database
pub trait ProviderFactory: Send + Sync {
    /// Registry key for this provider (e.g., "sqlite")
    fn name(&self) -> &'static str;

    /// Create a connection that has not been opened yet
    fn create_connection(&self) -> Result<Box<dyn DbConnection>>;
}

/// A driver connection
pub trait DbConnection: Send {
    /// Open the connection
    fn open(&mut self, connection_string: &str) -> Result<()>;

    /// Create a command bound to this connection
    fn create_command(&self) -> Result<Box<dyn DbCommand>>;

    /// Close the connection. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Check if the connection is open
    fn is_open(&self) -> bool;
}

/// A driver command
pub trait DbCommand: Send {
    fn state(&self) -> &CommandState;

    fn state_mut(&mut self) -> &mut CommandState;

    /// Create a parameter with this provider's defaults. It is not attached
    /// until passed to [`DbCommand::add_parameter`].
    fn create_parameter(&self) -> DbParameter {
        DbParameter::default()
    }

    fn command_text(&self) -> &str {
        &self.state().text
    }

    fn set_command_text(&mut self, text: String) {
        self.state_mut().text = text;
    }

    fn command_kind(&self) -> CommandKind {
        self.state().kind
    }

    fn set_command_kind(&mut self, kind: CommandKind) {
        self.state_mut().kind = kind;
    }

    fn timeout(&self) -> Duration {
        self.state().timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.state_mut().timeout = timeout;
    }

    fn parameters(&self) -> &[DbParameter] {
        &self.state().parameters
    }

    fn add_parameter(&mut self, parameter: DbParameter) {
        self.state_mut().parameters.push(parameter);
    }

    /// Execute and return the first column of the first row, or NULL
    fn execute_scalar(&mut self) -> Result<Value>;

    /// Execute and return the number of affected rows
    fn execute_non_query(&mut self) -> Result<u64>;

    /// Execute and return a reader over the result rows
    fn execute_reader(&mut self, options: StreamOptions) -> Result<Box<dyn RowReader>>;
}

/// Pull-based access to the rows of an executed command
pub trait RowReader: Send {
    fn columns(&self) -> &[ColumnMeta];

    /// Next row, or `None` once the result set is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;
}
