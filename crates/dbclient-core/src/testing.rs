//! In-memory provider that records what it is asked to do
//!
//! Used by the unit tests of this crate and, through the `testing`
//! feature, by downstream crates that want to inspect assembled commands
//! without a database.

use crate::{
    ColumnMeta, CommandState, DbClientError, DbCommand, DbConnection, ProviderFactory, Result,
    Row, RowReader, StreamOptions, Value,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LogState {
    opened: Vec<String>,
    closed: usize,
    executed: Vec<CommandState>,
    rows_fetched: usize,
}

/// Shared record of connections and executed commands
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    state: Arc<Mutex<LogState>>,
}

impl ExecutionLog {
    /// Connection strings of every connection opened, in order
    pub fn opened_connections(&self) -> Vec<String> {
        self.state.lock().opened.clone()
    }

    pub fn closed_connections(&self) -> usize {
        self.state.lock().closed
    }

    /// Connections opened and not closed yet
    pub fn open_connections(&self) -> usize {
        let state = self.state.lock();
        state.opened.len() - state.closed
    }

    /// Snapshot of every executed command
    pub fn executed_commands(&self) -> Vec<CommandState> {
        self.state.lock().executed.clone()
    }

    pub fn last_command(&self) -> Option<CommandState> {
        self.state.lock().executed.last().cloned()
    }

    /// Rows handed out by readers so far
    pub fn rows_fetched(&self) -> usize {
        self.state.lock().rows_fetched
    }
}

#[derive(Debug, Clone, Default)]
struct Script {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    affected_rows: u64,
    open_error: Option<String>,
    execute_error: Option<String>,
    fail_after_rows: Option<usize>,
}

/// Provider returning scripted results and recording every call
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    log: ExecutionLog,
    script: Script,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by readers; the first value of the first row is the scalar result
    pub fn with_rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        self.script.columns = columns
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnMeta::new(*name, "DYNAMIC", idx))
            .collect();
        self.script.rows = rows;
        self
    }

    pub fn with_affected_rows(mut self, affected_rows: u64) -> Self {
        self.script.affected_rows = affected_rows;
        self
    }

    /// Make `open` fail with a driver error
    pub fn failing_open(mut self, message: &str) -> Self {
        self.script.open_error = Some(message.to_string());
        self
    }

    /// Make every execute primitive fail with a driver error
    pub fn failing_execute(mut self, message: &str) -> Self {
        self.script.execute_error = Some(message.to_string());
        self
    }

    /// Make readers fail once `count` rows have been returned
    pub fn failing_after_rows(mut self, count: usize) -> Self {
        self.script.fail_after_rows = Some(count);
        self
    }

    pub fn log(&self) -> ExecutionLog {
        self.log.clone()
    }
}

impl ProviderFactory for RecordingProvider {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn create_connection(&self) -> Result<Box<dyn DbConnection>> {
        Ok(Box::new(RecordingConnection {
            log: self.log.clone(),
            script: self.script.clone(),
            open: false,
        }))
    }
}

struct RecordingConnection {
    log: ExecutionLog,
    script: Script,
    open: bool,
}

impl DbConnection for RecordingConnection {
    fn open(&mut self, connection_string: &str) -> Result<()> {
        if let Some(message) = &self.script.open_error {
            return Err(DbClientError::Driver(message.clone()));
        }
        self.log
            .state
            .lock()
            .opened
            .push(connection_string.to_string());
        self.open = true;
        Ok(())
    }

    fn create_command(&self) -> Result<Box<dyn DbCommand>> {
        if !self.open {
            return Err(DbClientError::Driver("connection is not open".into()));
        }
        Ok(Box::new(RecordingCommand {
            log: self.log.clone(),
            script: self.script.clone(),
            state: CommandState::default(),
        }))
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.log.state.lock().closed += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

struct RecordingCommand {
    log: ExecutionLog,
    script: Script,
    state: CommandState,
}

impl RecordingCommand {
    fn record(&self) -> Result<()> {
        self.log.state.lock().executed.push(self.state.clone());
        match &self.script.execute_error {
            Some(message) => Err(DbClientError::Driver(message.clone())),
            None => Ok(()),
        }
    }
}

impl DbCommand for RecordingCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    fn execute_scalar(&mut self) -> Result<Value> {
        self.record()?;
        Ok(self
            .script
            .rows
            .first()
            .and_then(|row| row.first())
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn execute_non_query(&mut self) -> Result<u64> {
        self.record()?;
        Ok(self.script.affected_rows)
    }

    fn execute_reader(&mut self, options: StreamOptions) -> Result<Box<dyn RowReader>> {
        self.record()?;
        let mut rows: VecDeque<Vec<Value>> = self.script.rows.iter().cloned().collect();
        if options.single_row {
            rows.truncate(1);
        }
        Ok(Box::new(RecordingReader {
            log: self.log.clone(),
            columns: self.script.columns.clone(),
            rows,
            returned: 0,
            fail_after_rows: self.script.fail_after_rows,
        }))
    }
}

struct RecordingReader {
    log: ExecutionLog,
    columns: Vec<ColumnMeta>,
    rows: VecDeque<Vec<Value>>,
    returned: usize,
    fail_after_rows: Option<usize>,
}

impl RowReader for RecordingReader {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.fail_after_rows == Some(self.returned) {
            return Err(DbClientError::Driver("reader failed".into()));
        }
        let Some(values) = self.rows.pop_front() else {
            return Ok(None);
        };
        self.returned += 1;
        self.log.state.lock().rows_fetched += 1;
        let names = self.columns.iter().map(|c| c.name.clone()).collect();
        Ok(Some(Row::new(names, values)))
    }
}
