//! Connection scoping and the lazily read row stream

use crate::{ColumnMeta, DbConnection, Result, Row, RowReader, StreamOptions};

/// An open connection that is closed when this guard goes away.
///
/// Execution paths call [`ScopedConnection::release`] to observe close
/// errors; any path that drops the guard instead (early return, error,
/// abandoned stream) still closes the connection and logs failures.
pub(crate) struct ScopedConnection {
    connection: Box<dyn DbConnection>,
    released: bool,
}

impl ScopedConnection {
    pub(crate) fn new(connection: Box<dyn DbConnection>) -> Self {
        Self {
            connection,
            released: false,
        }
    }

    pub(crate) fn get(&self) -> &dyn DbConnection {
        self.connection.as_ref()
    }

    pub(crate) fn get_mut(&mut self) -> &mut dyn DbConnection {
        self.connection.as_mut()
    }

    /// Close the connection now and report the outcome
    pub(crate) fn release(mut self) -> Result<()> {
        self.released = true;
        tracing::debug!("releasing connection");
        self.connection.close()
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = self.connection.close()
        {
            tracing::warn!(error = %e, "failed to close connection");
        }
    }
}

/// Combine an execution outcome with the release of its connection.
/// The execution error wins when both fail.
pub(crate) fn finish<T>(connection: ScopedConnection, outcome: Result<T>) -> Result<T> {
    match (outcome, connection.release()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_error)) => Err(close_error),
        (Err(error), Ok(())) => Err(error),
        (Err(error), Err(close_error)) => {
            tracing::warn!(error = %close_error, "failed to close connection after error");
            Err(error)
        }
    }
}

/// Rows of an executed command, read on demand.
///
/// The stream owns its connection. The connection is closed as soon as the
/// rows are exhausted, a read fails, [`RowStream::close`] is called, or the
/// stream is dropped.
pub struct RowStream {
    // Declared before `connection` so the reader is dropped first.
    reader: Option<Box<dyn RowReader>>,
    connection: Option<ScopedConnection>,
    columns: Vec<ColumnMeta>,
    single_row: bool,
    returned: usize,
}

impl RowStream {
    pub(crate) fn new(
        reader: Box<dyn RowReader>,
        connection: ScopedConnection,
        options: StreamOptions,
    ) -> Self {
        let columns = reader.columns().to_vec();
        Self {
            reader: Some(reader),
            connection: Some(connection),
            columns,
            single_row: options.single_row,
            returned: 0,
        }
    }

    /// Columns of the result set
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Whether the connection behind this stream has been released
    pub fn is_closed(&self) -> bool {
        self.connection.is_none()
    }

    /// Number of rows read so far
    pub fn rows_read(&self) -> usize {
        self.returned
    }

    /// Read the next row, closing the stream once no rows are left
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        if self.single_row && self.returned >= 1 {
            self.shutdown()?;
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        match reader.next_row() {
            Ok(Some(row)) => {
                self.returned += 1;
                Ok(Some(row))
            }
            Ok(None) => {
                tracing::debug!(rows = self.returned, "row stream exhausted");
                self.shutdown()?;
                Ok(None)
            }
            Err(error) => {
                if let Err(close_error) = self.shutdown() {
                    tracing::warn!(error = %close_error, "failed to close connection after read error");
                }
                Err(error)
            }
        }
    }

    /// Stop reading and release the connection
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.reader = None;
        match self.connection.take() {
            Some(connection) => connection.release(),
            None => Ok(()),
        }
    }
}

impl Iterator for RowStream {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream")
            .field("columns", &self.columns)
            .field("rows_read", &self.returned)
            .field("closed", &self.is_closed())
            .finish()
    }
}
