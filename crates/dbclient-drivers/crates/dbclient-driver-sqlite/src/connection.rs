//! SQLite connection implementation

use dbclient_core::{DbClientError, DbCommand, DbConnection, Result};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use std::sync::Arc;

use crate::SqliteCommand;

const MEMORY: &str = ":memory:";

/// Database location and open options parsed from a connection string.
///
/// Accepted forms:
///
/// - a file path, with `~/` expanded and relative paths resolved
/// - `:memory:`
/// - a `file:` URI
/// - `Key=Value` pairs separated by `;` (`Data Source`, `Mode`, `Foreign Keys`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteTarget {
    pub path: String,
    pub read_only: bool,
    pub foreign_keys: bool,
}

impl SqliteTarget {
    fn at(path: String) -> Self {
        Self {
            path,
            read_only: false,
            foreign_keys: true,
        }
    }

    pub fn parse(connection_string: &str) -> Result<Self> {
        let trimmed = connection_string.trim();
        if trimmed.is_empty() {
            return Err(DbClientError::Configuration(
                "SQLite connection string is empty".into(),
            ));
        }

        if trimmed == MEMORY || trimmed.starts_with("file:") || !trimmed.contains('=') {
            return Ok(Self::at(expand_path(trimmed)?));
        }

        let mut path = None;
        let mut target = Self::at(String::new());
        for pair in trimmed.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                DbClientError::Configuration(format!(
                    "Malformed connection string segment '{}'",
                    pair.trim()
                ))
            })?;
            let key: String = key
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "datasource" | "filename" | "database" => path = Some(value.to_string()),
                "mode" => match value.to_ascii_lowercase().as_str() {
                    "readonly" => target.read_only = true,
                    "readwrite" | "readwritecreate" => target.read_only = false,
                    "memory" => path = Some(MEMORY.to_string()),
                    other => {
                        return Err(DbClientError::Configuration(format!(
                            "Unsupported SQLite mode '{}'",
                            other
                        )));
                    }
                },
                "foreignkeys" => target.foreign_keys = parse_flag(value)?,
                _ => tracing::warn!(keyword = %key, "ignoring unsupported connection string keyword"),
            }
        }

        let path = path.ok_or_else(|| {
            DbClientError::Configuration("SQLite connection string has no Data Source".into())
        })?;
        target.path = expand_path(&path)?;
        Ok(target)
    }

    fn is_memory(&self) -> bool {
        self.path == MEMORY
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DbClientError::Configuration(format!(
            "Expected a boolean, found '{}'",
            other
        ))),
    }
}

/// Expand path to handle ~ (home directory) and relative paths
fn expand_path(path: &str) -> Result<String> {
    if path == MEMORY || path.starts_with("file:") {
        return Ok(path.to_string());
    }

    let expanded = if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var_os("HOME").ok_or_else(|| {
            DbClientError::Configuration("Unable to determine HOME directory".into())
        })?;
        std::path::PathBuf::from(home)
            .join(rest)
            .to_string_lossy()
            .to_string()
    } else if path.starts_with('~') {
        return Err(DbClientError::Configuration(
            "User-specific home directories (~user) are not supported".into(),
        ));
    } else {
        path.to_string()
    };

    let path_buf = std::path::PathBuf::from(&expanded);
    if path_buf.is_relative() {
        let cwd = std::env::current_dir().map_err(|e| {
            DbClientError::Configuration(format!("Unable to resolve relative path: {}", e))
        })?;
        Ok(cwd.join(path_buf).to_string_lossy().to_string())
    } else {
        Ok(expanded)
    }
}

/// SQLite connection wrapper
#[derive(Default)]
pub struct SqliteConnection {
    conn: Option<Arc<Mutex<RusqliteConnection>>>,
}

impl SqliteConnection {
    /// Create a connection that is not open yet
    pub fn new() -> Self {
        Self::default()
    }

    fn open_target(target: &SqliteTarget) -> Result<RusqliteConnection> {
        let conn = if target.is_memory() {
            RusqliteConnection::open_in_memory().map_err(|e| {
                DbClientError::Driver(format!("Failed to open in-memory database: {}", e))
            })?
        } else {
            if !target.path.starts_with("file:") {
                let file_path = std::path::Path::new(&target.path);
                if let Some(parent) = file_path.parent()
                    && !parent.exists()
                {
                    return Err(DbClientError::Driver(format!(
                        "Parent directory does not exist: {}",
                        parent.display()
                    )));
                }
            }

            let access = if target.read_only {
                OpenFlags::SQLITE_OPEN_READ_ONLY
            } else {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            };
            let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

            RusqliteConnection::open_with_flags(&target.path, flags).map_err(|e| {
                DbClientError::Driver(format!(
                    "Failed to open SQLite database at '{}': {}",
                    target.path, e
                ))
            })?
        };

        let foreign_keys = if target.foreign_keys { "ON" } else { "OFF" };
        conn.pragma_update(None, "foreign_keys", foreign_keys)
            .map_err(|e| DbClientError::Driver(format!("Failed to set foreign keys: {}", e)))?;

        Ok(conn)
    }
}

impl DbConnection for SqliteConnection {
    #[tracing::instrument(skip(self, connection_string))]
    fn open(&mut self, connection_string: &str) -> Result<()> {
        if self.conn.is_some() {
            return Err(DbClientError::Driver("Connection is already open".into()));
        }

        let target = SqliteTarget::parse(connection_string)?;
        let conn = Self::open_target(&target)?;

        tracing::info!(path = %target.path, read_only = target.read_only, "SQLite connection opened");
        self.conn = Some(Arc::new(Mutex::new(conn)));
        Ok(())
    }

    fn create_command(&self) -> Result<Box<dyn DbCommand>> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| DbClientError::Driver("Connection is not open".into()))?;
        Ok(Box::new(SqliteCommand::new(Arc::clone(conn))))
    }

    fn close(&mut self) -> Result<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(conn) {
            Ok(mutex) => mutex.into_inner().close().map_err(|(_, e)| {
                DbClientError::Driver(format!("Failed to close SQLite connection: {}", e))
            })?,
            // a command still holds the handle; the database closes when it is dropped
            Err(_) => tracing::debug!("SQLite connection still shared by a command"),
        }

        tracing::info!("SQLite connection closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }
}
