//! Row reader that steps a SQLite statement on its own thread

use dbclient_core::{
    ColumnMeta, CommandState, DbClientError, Result, Row, RowReader, StreamOptions, Value,
};
use parking_lot::Mutex;
use rusqlite::Connection as RusqliteConnection;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::command;
use crate::values;

/// Streams rows from a statement owned by a dedicated thread.
///
/// The thread holds the connection lock for as long as the reader is alive
/// and hands rows over a rendezvous channel, so SQLite is stepped once per
/// `next_row` call. Dropping the reader stops the thread and joins it.
pub struct SqliteRowReader {
    columns: Vec<ColumnMeta>,
    names: Vec<String>,
    rows: Option<Receiver<Result<Vec<Value>>>>,
    worker: Option<JoinHandle<()>>,
}

impl SqliteRowReader {
    pub(crate) fn spawn(
        conn: Arc<Mutex<RusqliteConnection>>,
        state: CommandState,
        options: StreamOptions,
    ) -> Result<Self> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<Vec<ColumnMeta>>>(1);
        let (row_tx, row_rx) = mpsc::sync_channel::<Result<Vec<Value>>>(0);

        let worker = thread::Builder::new()
            .name("sqlite-reader".into())
            .spawn(move || {
                let conn = conn.lock();
                let mut stmt = match command::prepare(&state, &conn) {
                    Ok(stmt) => stmt,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let columns = command::column_meta(&stmt);
                let decl_types: Vec<String> =
                    columns.iter().map(|c| c.data_type.clone()).collect();
                if ready_tx.send(Ok(columns)).is_err() {
                    return;
                }

                let mut rows = stmt.raw_query();
                loop {
                    let fetched = match rows.next() {
                        Ok(Some(row)) => decl_types
                            .iter()
                            .enumerate()
                            .map(|(idx, decl_type)| values::from_sql(row, idx, decl_type))
                            .collect::<Result<Vec<_>>>(),
                        Ok(None) => break,
                        Err(e) => Err(DbClientError::Driver(format!(
                            "Failed to fetch row: {}",
                            e
                        ))),
                    };
                    let failed = fetched.is_err();
                    if row_tx.send(fetched).is_err() || failed || options.single_row {
                        break;
                    }
                }
                tracing::trace!("SQLite reader finished");
            })
            .map_err(|e| {
                DbClientError::Driver(format!("Failed to start reader thread: {}", e))
            })?;

        let columns = match ready_rx.recv() {
            Ok(Ok(columns)) => columns,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DbClientError::Driver(
                    "Reader thread stopped before the query started".into(),
                ));
            }
        };

        let names = columns.iter().map(|c| c.name.clone()).collect();
        Ok(Self {
            columns,
            names,
            rows: Some(row_rx),
            worker: Some(worker),
        })
    }

    fn finish(&mut self) {
        self.rows = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::warn!("SQLite reader thread panicked");
        }
    }
}

impl RowReader for SqliteRowReader {
    fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        let Some(rows) = &self.rows else {
            return Ok(None);
        };
        match rows.recv() {
            Ok(Ok(values)) => Ok(Some(Row::new(self.names.clone(), values))),
            Ok(Err(e)) => {
                self.finish();
                Err(e)
            }
            Err(_) => {
                self.finish();
                Ok(None)
            }
        }
    }
}

impl Drop for SqliteRowReader {
    fn drop(&mut self) {
        self.finish();
    }
}
