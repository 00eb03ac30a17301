//! DB-API style driver for ODBC data sources reached through an ODBTP server.
//!
//! ```no_run
//! use odbtp_driver::{connect, Value};
//!
//! let mut conn = connect("DSN=Northwind;UID=sa;PWD=secret", "10.0.0.5", None)?;
//! let mut cur = conn.cursor()?;
//! cur.execute("SELECT name FROM customers WHERE id = ?", &[Value::from(7)])?;
//! for row in cur.fetchall()? {
//!     println!("{}", row[0]);
//! }
//! conn.close()?;
//! # Ok::<(), odbtp_driver::Error>(())
//! ```

pub mod engine;
pub mod error;
pub mod handles;
pub mod observability;
pub mod protocol;
pub mod security;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;
pub mod transport;

pub use engine::{
    ColumnDescriptor, ConnectOptions, Connection, Cursor, DriverKind, Environment,
    IsolationLevel, Row, DEFAULT_PORT,
};
pub use error::{Error, ErrorKind, Result};
pub use protocol::{
    binary, date, date_from_ticks, time, time_from_ticks, timestamp, timestamp_from_ticks,
    InputSize, SqlType, TypeDescriptor, Value, WireType,
};
pub use security::ConnectString;
pub use transport::{LoginMode, Transport};

pub const APILEVEL: &str = "2.0";
/// Threads may share the module but not connections.
pub const THREADSAFETY: u8 = 1;
pub const PARAMSTYLE: &str = "qmark";

/// Connects through the process-wide transport. `port` defaults to
/// [`DEFAULT_PORT`].
pub fn connect(
    connection_string: impl Into<ConnectString>,
    server: impl Into<String>,
    port: Option<u16>,
) -> Result<Connection> {
    let options =
        ConnectOptions::new(connection_string, server).with_port(port.unwrap_or(DEFAULT_PORT));
    Environment::global()?.connect(&options)
}
