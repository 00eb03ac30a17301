pub mod connection;
pub mod cursor;
pub mod driver;
pub mod environment;
pub mod options;
pub mod transaction;

pub use connection::Connection;
pub use cursor::{ColumnDescriptor, Cursor, Row, Rows};
pub use driver::DriverKind;
pub use environment::Environment;
pub use options::{ConnectOptions, IsolationLevel, RowCache, DEFAULT_PORT};
pub use transaction::{Session, SessionState, SharedSession, TransactionGuard};
