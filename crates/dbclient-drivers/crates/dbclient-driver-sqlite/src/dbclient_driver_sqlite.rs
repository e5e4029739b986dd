//! SQLite provider implementation

mod command;
mod connection;
mod driver;
mod reader;
mod values;

pub use command::SqliteCommand;
pub use connection::{SqliteConnection, SqliteTarget};
pub use driver::SqliteProvider;
pub use reader::SqliteRowReader;
