//! SQLite command and row reader

use dbclient_core::{
    ColumnMeta, CommandKind, CommandState, DbClientError, DbCommand, DbParameter,
    ParameterDirection, Result, RowReader, StreamOptions, Value,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, Statement};
use std::sync::Arc;

use crate::reader::SqliteRowReader;
use crate::values;

/// Prefixes SQLite accepts for named parameters
const SQLITE_MARKERS: [char; 4] = [':', '@', '$', '?'];

/// A command bound to an open SQLite connection.
///
/// Parameters are matched to the statement by name (case-insensitive,
/// without the marker). Anonymous `?` placeholders take parameters in the
/// order they were added, and `?NNN` takes the NNN-th parameter.
pub struct SqliteCommand {
    conn: Arc<Mutex<RusqliteConnection>>,
    state: CommandState,
}

impl SqliteCommand {
    pub(crate) fn new(conn: Arc<Mutex<RusqliteConnection>>) -> Self {
        Self {
            conn,
            state: CommandState::default(),
        }
    }
}

fn check_supported(state: &CommandState) -> Result<()> {
    if state.kind == CommandKind::StoredProcedure {
        return Err(DbClientError::Driver(
            "SQLite does not support stored procedures".into(),
        ));
    }
    if state.text.trim().is_empty() {
        return Err(DbClientError::Driver("Command text is empty".into()));
    }
    if let Some(parameter) = state
        .parameters
        .iter()
        .find(|p| p.direction != ParameterDirection::Input)
    {
        return Err(DbClientError::Driver(format!(
            "Parameter '{}' has direction {:?}; SQLite only supports input parameters",
            parameter.name, parameter.direction
        )));
    }
    Ok(())
}

/// Prepare the statement and bind every placeholder it declares
pub(crate) fn prepare<'c>(
    state: &CommandState,
    conn: &'c RusqliteConnection,
) -> Result<Statement<'c>> {
    check_supported(state)?;
    conn.busy_timeout(state.timeout)
        .map_err(|e| DbClientError::Driver(format!("Failed to set busy timeout: {}", e)))?;

    let mut stmt = conn
        .prepare(&state.text)
        .map_err(|e| DbClientError::Driver(format!("Failed to prepare command: {}", e)))?;

    for index in 1..=stmt.parameter_count() {
        let name = stmt.parameter_name(index).map(str::to_string);
        let parameter = parameter_for(state, index, name.as_deref()).ok_or_else(|| {
            DbClientError::Driver(format!(
                "No value bound for parameter '{}'",
                name.as_deref().unwrap_or("?")
            ))
        })?;
        let value = values::to_sql(&parameter.value, parameter.db_type)?;
        stmt.raw_bind_parameter(index, value).map_err(|e| {
            DbClientError::Driver(format!(
                "Failed to bind parameter '{}': {}",
                parameter.name, e
            ))
        })?;
    }

    tracing::trace!(
        parameters = stmt.parameter_count(),
        "SQLite statement prepared"
    );
    Ok(stmt)
}

fn parameter_for<'s>(
    state: &'s CommandState,
    index: usize,
    name: Option<&str>,
) -> Option<&'s DbParameter> {
    let parameters = &state.parameters;
    let Some(name) = name else {
        return parameters.get(index - 1);
    };
    let bare = name
        .strip_prefix(|c: char| SQLITE_MARKERS.contains(&c))
        .unwrap_or(name);
    state.parameter(bare).or_else(|| {
        let position: usize = bare.parse().ok()?;
        parameters.get(position.checked_sub(1)?)
    })
}

/// Column metadata of a prepared statement, using declared types where present
pub(crate) fn column_meta(stmt: &Statement<'_>) -> Vec<ColumnMeta> {
    stmt.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| ColumnMeta::new(col.name(), col.decl_type().unwrap_or("DYNAMIC"), idx))
        .collect()
}

impl DbCommand for SqliteCommand {
    fn state(&self) -> &CommandState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.state.text.chars().take(100).collect::<String>()))]
    fn execute_scalar(&mut self) -> Result<Value> {
        let conn = self.conn.lock();
        let mut stmt = prepare(&self.state, &conn)?;
        let decl_type = column_meta(&stmt).into_iter().next().map(|c| c.data_type);

        let mut rows = stmt.raw_query();
        let first = rows
            .next()
            .map_err(|e| DbClientError::Driver(format!("Failed to fetch row: {}", e)))?;
        match (first, decl_type) {
            (Some(row), Some(decl_type)) => values::from_sql(row, 0, &decl_type),
            _ => Ok(Value::Null),
        }
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.state.text.chars().take(100).collect::<String>()))]
    fn execute_non_query(&mut self) -> Result<u64> {
        let conn = self.conn.lock();
        let mut stmt = prepare(&self.state, &conn)?;

        let rows_affected = stmt
            .raw_execute()
            .map_err(|e| DbClientError::Driver(format!("Failed to execute statement: {}", e)))?;

        tracing::debug!(affected_rows = rows_affected, "statement executed");
        Ok(rows_affected as u64)
    }

    #[tracing::instrument(skip(self), fields(sql_preview = %self.state.text.chars().take(100).collect::<String>()))]
    fn execute_reader(&mut self, options: StreamOptions) -> Result<Box<dyn RowReader>> {
        let reader = SqliteRowReader::spawn(Arc::clone(&self.conn), self.state.clone(), options)?;
        tracing::debug!(
            columns = reader.columns().len(),
            sequential_access = options.sequential_access,
            "query started"
        );
        Ok(Box::new(reader))
    }
}
