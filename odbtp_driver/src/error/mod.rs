pub mod classifier;
pub mod codes;

use thiserror::Error;

pub use classifier::{classify, classify_codes, ServerDiagnostic};
pub use codes::ProtocolErrorCode;

/// Flat client-visible error taxonomy.
///
/// `Warning` is a sibling of the error root; every other kind is an error and
/// the kinds from `Database` down form the database-error subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Warning,
    /// The root "Error" kind, used when nothing more specific applies.
    Error,
    Interface,
    Database,
    Data,
    Operational,
    Integrity,
    Internal,
    Programming,
    NotSupported,
}

impl ErrorKind {
    /// True for `Database` and every kind derived from it.
    pub fn is_database_error(self) -> bool {
        matches!(
            self,
            ErrorKind::Database
                | ErrorKind::Data
                | ErrorKind::Operational
                | ErrorKind::Integrity
                | ErrorKind::Internal
                | ErrorKind::Programming
                | ErrorKind::NotSupported
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Warning => "Warning",
            ErrorKind::Error => "Error",
            ErrorKind::Interface => "InterfaceError",
            ErrorKind::Database => "DatabaseError",
            ErrorKind::Data => "DataError",
            ErrorKind::Operational => "OperationalError",
            ErrorKind::Integrity => "IntegrityError",
            ErrorKind::Internal => "InternalError",
            ErrorKind::Programming => "ProgrammingError",
            ErrorKind::NotSupported => "NotSupportedError",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{0}")]
    Unclassified(String),

    #[error("unclassified server error (ODBTP error code {0})")]
    ServerCode(u32),

    #[error("warning: {0}")]
    Warning(String),

    #[error("Column {column} was truncated. Actual size is {actual_len}.")]
    Truncated { column: u16, actual_len: usize },

    #[error("interface error: {0}")]
    Interface(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("data error: {0}")]
    Data(String),

    #[error("operational error: {0}")]
    Operational(String),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("programming error: {0}")]
    Programming(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    /// Builds an error of the given kind carrying `message`.
    pub fn of_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Warning => Error::Warning(message),
            ErrorKind::Error => Error::Unclassified(message),
            ErrorKind::Interface => Error::Interface(message),
            ErrorKind::Database => Error::Database(message),
            ErrorKind::Data => Error::Data(message),
            ErrorKind::Operational => Error::Operational(message),
            ErrorKind::Integrity => Error::Integrity(message),
            ErrorKind::Internal => Error::Internal(message),
            ErrorKind::Programming => Error::Programming(message),
            ErrorKind::NotSupported => Error::NotSupported(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unclassified(_) | Error::ServerCode(_) => ErrorKind::Error,
            Error::Warning(_) | Error::Truncated { .. } => ErrorKind::Warning,
            Error::Interface(_) => ErrorKind::Interface,
            Error::Database(_) => ErrorKind::Database,
            Error::Data(_) => ErrorKind::Data,
            Error::Operational(_) => ErrorKind::Operational,
            Error::Integrity(_) => ErrorKind::Integrity,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Programming(_) => ErrorKind::Programming,
            Error::NotSupported(_) => ErrorKind::NotSupported,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.kind() == ErrorKind::Warning
    }

    pub fn is_database_error(&self) -> bool {
        self.kind().is_database_error()
    }

    /// Message text without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            Error::Unclassified(m)
            | Error::Warning(m)
            | Error::Interface(m)
            | Error::Database(m)
            | Error::Data(m)
            | Error::Operational(m)
            | Error::Integrity(m)
            | Error::Internal(m)
            | Error::Programming(m)
            | Error::NotSupported(m) => m.clone(),
            Error::ServerCode(_) | Error::Truncated { .. } => self.to_string(),
        }
    }

    /// SQLSTATE carried by a server-classified error (`"[23000] ..."`), if any.
    pub fn sqlstate(&self) -> Option<String> {
        ServerDiagnostic::parse(&self.message()).map(|d| d.sqlstate)
    }

    /// Hint for callers deciding whether to retry. The driver never retries
    /// on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Operational(_) => true,
            Error::Interface(msg) => msg.contains("timed out"),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
