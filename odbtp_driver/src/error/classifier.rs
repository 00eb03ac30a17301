//! Translation of (ODBTP code, ODBC diagnostic) pairs into [`Error`] kinds.
//!
//! The ODBTP layer reports its own failures with a numeric code. When that
//! code is [`ProtocolErrorCode::Server`] the ODBC driver on the remote host
//! produced the error and its text starts with a bracketed SQLSTATE, e.g.
//! `"[23000][Microsoft][ODBC SQL Server Driver]Violation of PRIMARY KEY"`.
//! The SQLSTATE class (two characters) and subclass (three characters) select
//! the error kind.

use super::{Error, ErrorKind, ProtocolErrorCode};
use crate::handles::Handle;
use crate::transport::Transport;

/// Subclasses of the broad `HY` class that map to something other than
/// `ProgrammingError`.
const HY_SUBCLASSES: &[(&str, ErrorKind)] = &[
    ("000", ErrorKind::Error),
    ("001", ErrorKind::Interface),
    ("003", ErrorKind::Data),
    ("004", ErrorKind::Data),
    ("008", ErrorKind::Operational),
    ("014", ErrorKind::Interface),
    ("018", ErrorKind::Operational),
    ("C00", ErrorKind::NotSupported),
    ("T00", ErrorKind::Operational),
    ("T01", ErrorKind::Operational),
];

const SQLSTATE_CLASSES: &[(&str, ErrorKind)] = &[
    ("01", ErrorKind::Warning),
    ("07", ErrorKind::Programming),
    ("08", ErrorKind::Interface),
    ("21", ErrorKind::Programming),
    ("22", ErrorKind::Programming),
    ("23", ErrorKind::Integrity),
    ("24", ErrorKind::Internal),
    ("25", ErrorKind::Internal),
    ("28", ErrorKind::Database),
    ("34", ErrorKind::Internal),
    ("3C", ErrorKind::Internal),
    ("3D", ErrorKind::Programming),
    ("3F", ErrorKind::Programming),
    ("40", ErrorKind::Integrity),
    ("42", ErrorKind::Programming),
    ("44", ErrorKind::Database),
    ("HY", ErrorKind::Programming),
    ("IM", ErrorKind::Interface),
];

const UNKNOWN_ERROR: &str = "Unknown error.";

/// First diagnostic line of an ODBC error, split at its SQLSTATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDiagnostic {
    /// Upper-cased five character SQLSTATE (may be shorter if the server
    /// sent a malformed state).
    pub sqlstate: String,
    /// Normalized message: line endings unified, trimmed.
    pub message: String,
}

impl ServerDiagnostic {
    /// Parses `text`; `None` when no bracket-delimited segment is present.
    pub fn parse(text: &str) -> Option<Self> {
        let message = normalize(text);
        let first_line = message.split('\n').next().unwrap_or("");
        let mut segments = first_line.split(']');
        let head = segments.next()?;
        segments.next()?;

        let sqlstate: String = head.chars().skip(1).take(5).collect();
        Some(Self {
            sqlstate: sqlstate.to_uppercase(),
            message,
        })
    }

    pub fn class(&self) -> &str {
        prefix(&self.sqlstate, 0, 2)
    }

    pub fn subclass(&self) -> &str {
        prefix(&self.sqlstate, 2, 5)
    }

    /// Kind for this diagnostic, or `None` when neither table knows it.
    pub fn kind(&self) -> Option<ErrorKind> {
        let class = self.class();
        if class == "HY" {
            if let Some((_, kind)) = HY_SUBCLASSES.iter().find(|(sub, _)| *sub == self.subclass()) {
                return Some(*kind);
            }
        }
        SQLSTATE_CLASSES
            .iter()
            .find(|(code, _)| *code == class)
            .map(|(_, kind)| *kind)
    }
}

fn prefix(s: &str, start: usize, end: usize) -> &str {
    let end = end.min(s.len());
    let start = start.min(end);
    s.get(start..end).unwrap_or("")
}

fn normalize(text: &str) -> String {
    text.trim().replace("\r\n", "\n").replace('\r', "\n")
}

/// Classifies an error from its raw codes. `server_text` is only invoked when
/// the protocol code says the ODBC layer reported the error.
pub fn classify_codes<F>(protocol_code: u32, server_text: F) -> Error
where
    F: FnOnce() -> String,
{
    match ProtocolErrorCode::from_u32(protocol_code) {
        Some(ProtocolErrorCode::None) | None => Error::Unclassified(UNKNOWN_ERROR.to_string()),
        Some(ProtocolErrorCode::Server) => classify_server_text(protocol_code, &server_text()),
        Some(code) => match code.interface_message() {
            Some(msg) => Error::Interface(msg.to_string()),
            None => Error::Unclassified(UNKNOWN_ERROR.to_string()),
        },
    }
}

fn classify_server_text(protocol_code: u32, text: &str) -> Error {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "None" {
        return Error::Unclassified(UNKNOWN_ERROR.to_string());
    }

    let Some(diagnostic) = ServerDiagnostic::parse(trimmed) else {
        return Error::ServerCode(protocol_code);
    };

    match diagnostic.kind() {
        Some(kind) => Error::of_kind(kind, diagnostic.message),
        None => Error::Unclassified(diagnostic.message),
    }
}

/// Reads the error state recorded on `handle` and classifies it.
pub fn classify(transport: &dyn Transport, handle: Handle) -> Error {
    let code = transport.get_error(handle);
    let error = classify_codes(code, || transport.get_error_text(handle));
    log::debug!(
        "Classified ODBTP error code {} as {}: {}",
        code,
        error.kind().name(),
        error.message()
    );
    error
}
