//! Command assembly and the high-level execute operations
//!
//! A [`CommandAssembler`] holds plain configuration: connection name,
//! command text, kind, timeout and a [`BindingSet`]. Every execute call
//! opens a fresh connection, expands the template against the current
//! bindings, runs the command and releases the connection again. Nothing is
//! cached between calls.

use crate::expansion::expand_into;
use crate::stream::{ScopedConnection, finish};
use crate::{
    BindingSet, CommandKind, ConnectionSettings, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_CONNECTION_NAME, DataTable, DbClientError, DbCommand, DbConnection, ProviderFactory,
    Result, RowStream, StreamOptions, Value,
};
use std::sync::Arc;
use std::time::Duration;

/// Builds and executes commands from a template and a binding set
#[derive(Debug, Clone)]
pub struct CommandAssembler {
    settings: Arc<ConnectionSettings>,
    provider: Option<ProviderOverride>,
    connection_name: String,
    command_text: Option<String>,
    command_kind: CommandKind,
    timeout: Duration,
    bindings: BindingSet,
}

#[derive(Clone)]
struct ProviderOverride(Arc<dyn ProviderFactory>);

impl std::fmt::Debug for ProviderOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.name())
    }
}

impl CommandAssembler {
    /// Create an assembler with default configuration
    pub fn new(settings: Arc<ConnectionSettings>) -> Self {
        Self {
            settings,
            provider: None,
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            command_text: None,
            command_kind: CommandKind::Text,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            bindings: BindingSet::new(),
        }
    }

    pub fn with_command_kind(mut self, kind: CommandKind) -> Self {
        self.command_kind = kind;
        self
    }

    pub fn with_connection_name(mut self, name: &str) -> Self {
        self.connection_name = name.to_string();
        self
    }

    /// Use `provider` instead of the provider from the settings
    pub fn with_provider_factory(mut self, provider: Arc<dyn ProviderFactory>) -> Self {
        self.provider = Some(ProviderOverride(provider));
        self
    }

    pub fn with_command_text(mut self, text: impl Into<String>) -> Self {
        self.command_text = Some(text.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reset everything except the injected settings to the defaults, so
    /// one assembler can be reused for an unrelated command
    pub fn initialize(&mut self) {
        self.provider = None;
        self.connection_name = DEFAULT_CONNECTION_NAME.to_string();
        self.command_text = None;
        self.command_kind = CommandKind::Text;
        self.timeout = DEFAULT_COMMAND_TIMEOUT;
        self.bindings.clear();
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    pub fn set_connection_name(&mut self, name: &str) {
        self.connection_name = name.to_string();
    }

    pub fn command_text(&self) -> Option<&str> {
        self.command_text.as_deref()
    }

    pub fn set_command_text(&mut self, text: impl Into<String>) {
        self.command_text = Some(text.into());
    }

    pub fn command_kind(&self) -> CommandKind {
        self.command_kind
    }

    pub fn set_command_kind(&mut self, kind: CommandKind) {
        self.command_kind = kind;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_provider_factory(&mut self, provider: Option<Arc<dyn ProviderFactory>>) {
        self.provider = provider.map(ProviderOverride);
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingSet {
        &mut self.bindings
    }

    /// Build a ready-to-execute command on `connection`.
    ///
    /// The template is expanded fresh on every call; neither the template
    /// nor the bindings are modified.
    pub fn build_command(&self, connection: &dyn DbConnection) -> Result<Box<dyn DbCommand>> {
        let template = self.template()?;
        let mut command = connection.create_command()?;

        let sql = expand_into(template, &self.bindings, command.as_mut());
        tracing::debug!(
            parameters = command.parameters().len(),
            sql_preview = %sql.chars().take(100).collect::<String>(),
            "command assembled"
        );

        command.set_command_text(sql);
        command.set_command_kind(self.command_kind);
        command.set_timeout(self.timeout);
        Ok(command)
    }

    /// Execute and return the first column of the first row
    #[tracing::instrument(skip(self), fields(connection = %self.connection_name))]
    pub fn execute_scalar(&self) -> Result<Value> {
        let connection = self.open_connection()?;
        let outcome = self
            .build_command(connection.get())
            .and_then(|mut command| command.execute_scalar());
        finish(connection, outcome)
    }

    /// Execute and return the number of affected rows
    #[tracing::instrument(skip(self), fields(connection = %self.connection_name))]
    pub fn execute_non_query(&self) -> Result<u64> {
        let connection = self.open_connection()?;
        let outcome = self
            .build_command(connection.get())
            .and_then(|mut command| command.execute_non_query());
        let affected = finish(connection, outcome)?;
        tracing::debug!(affected_rows = affected, "command executed");
        Ok(affected)
    }

    /// Execute and return a stream that owns the connection until it is
    /// exhausted, closed, or dropped
    #[tracing::instrument(skip(self), fields(connection = %self.connection_name))]
    pub fn open_row_stream(&self, options: StreamOptions) -> Result<RowStream> {
        let connection = self.open_connection()?;
        let outcome = self
            .build_command(connection.get())
            .and_then(|mut command| command.execute_reader(options));

        match outcome {
            Ok(reader) => Ok(RowStream::new(reader, connection, options)),
            Err(error) => finish(connection, Err(error)),
        }
    }

    /// Execute and read every row into a table
    #[tracing::instrument(skip(self), fields(connection = %self.connection_name))]
    pub fn materialize_table(&self) -> Result<DataTable> {
        let mut stream = self.open_row_stream(StreamOptions::default())?;
        let mut table = DataTable::new(stream.columns().to_vec());
        while let Some(row) = stream.next_row()? {
            table.rows.push(row);
        }
        tracing::debug!(rows = table.row_count(), "table materialized");
        Ok(table)
    }

    fn template(&self) -> Result<&str> {
        self.command_text
            .as_deref()
            .ok_or_else(|| DbClientError::Configuration("No command text set".into()))
    }

    fn provider_factory(&self) -> Result<Arc<dyn ProviderFactory>> {
        match &self.provider {
            Some(ProviderOverride(provider)) => Ok(Arc::clone(provider)),
            None => self.settings.resolve_provider_factory(),
        }
    }

    /// Resolve configuration, then open a connection. Configuration errors
    /// are reported before anything is created.
    fn open_connection(&self) -> Result<ScopedConnection> {
        self.template()?;
        let provider = self.provider_factory()?;
        let connection_string = self
            .settings
            .resolve_connection_string(&self.connection_name)?;

        let mut connection = ScopedConnection::new(provider.create_connection()?);
        connection.get_mut().open(connection_string)?;
        tracing::debug!(
            provider = %provider.name(),
            connection = %self.connection_name,
            "connection opened"
        );
        Ok(connection)
    }
}
