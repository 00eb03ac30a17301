use crate::error::{Error, Result};
use crate::security::ConnectString;
use crate::transport::LoginMode;
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 2799;

/// Transaction isolation requested through the transactions attribute.
/// Discriminants are the ODBC `SQL_TXN_*` bits the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    ReadUncommitted = 1,
    ReadCommitted = 2,
    RepeatableRead = 4,
    #[default]
    Serializable = 8,
}

impl IsolationLevel {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::ReadUncommitted),
            2 => Some(Self::ReadCommitted),
            4 => Some(Self::RepeatableRead),
            8 => Some(Self::Serializable),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "read_uncommitted" => Some(Self::ReadUncommitted),
            "read_committed" => Some(Self::ReadCommitted),
            "repeatable_read" => Some(Self::RepeatableRead),
            "serializable" => Some(Self::Serializable),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Server-side row cache settings. A size of 0 lets the server choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RowCache {
    pub enabled: bool,
    pub size: u32,
}

impl Default for RowCache {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectOptions {
    pub server: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub connection_string: ConnectString,
    #[serde(default)]
    pub login_mode: LoginMode,
    #[serde(default)]
    pub row_cache: RowCache,
    #[serde(default)]
    pub isolation: IsolationLevel,
    #[serde(default = "default_arraysize")]
    pub arraysize: usize,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_arraysize() -> usize {
    1
}

impl ConnectOptions {
    pub fn new(connection_string: impl Into<ConnectString>, server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port: DEFAULT_PORT,
            connection_string: connection_string.into(),
            login_mode: LoginMode::default(),
            row_cache: RowCache::default(),
            isolation: IsolationLevel::default(),
            arraysize: default_arraysize(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_login_mode(mut self, mode: LoginMode) -> Self {
        self.login_mode = mode;
        self
    }

    pub fn with_row_cache(mut self, enabled: bool, size: u32) -> Self {
        self.row_cache = RowCache { enabled, size };
        self
    }

    pub fn with_isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = isolation;
        self
    }

    pub fn with_arraysize(mut self, arraysize: usize) -> Self {
        self.arraysize = arraysize.max(1);
        self
    }

    /// Reads `ODBTP_SERVER`, `ODBTP_PORT`, `ODBTP_CONNECT_STRING` and
    /// `ODBTP_ISOLATION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Interface(format!("{} is not set", key)))
        };

        let server = required("ODBTP_SERVER")?;
        let connection_string = required("ODBTP_CONNECT_STRING")?;
        let mut options = Self::new(connection_string, server);

        if let Some(port) = lookup("ODBTP_PORT").filter(|v| !v.trim().is_empty()) {
            options.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Interface(format!("Invalid ODBTP_PORT value '{}'", port)))?;
        }
        if let Some(level) = lookup("ODBTP_ISOLATION").filter(|v| !v.trim().is_empty()) {
            options.isolation = IsolationLevel::parse(&level).ok_or_else(|| {
                Error::Interface(format!("Invalid ODBTP_ISOLATION value '{}'", level))
            })?;
        }
        Ok(options)
    }
}
