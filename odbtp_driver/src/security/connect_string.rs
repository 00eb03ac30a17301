use serde::Deserialize;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const SECRET_KEYS: &[&str] = &["pwd", "password"];

/// ODBC connection string for the remote data source. Wiped from memory on
/// drop and never printed with its password.
#[derive(Clone, Default, Deserialize, ZeroizeOnDrop)]
#[serde(from = "String")]
pub struct ConnectString {
    data: String,
}

impl ConnectString {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    pub fn expose(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Copy of the string with password values masked.
    pub fn redacted(&self) -> String {
        self.data
            .split(';')
            .map(|part| match part.split_once('=') {
                Some((key, _)) if SECRET_KEYS.contains(&key.trim().to_lowercase().as_str()) => {
                    format!("{}=***", key)
                }
                _ => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl Zeroize for ConnectString {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

impl From<String> for ConnectString {
    fn from(data: String) -> Self {
        Self::new(data)
    }
}

impl From<&str> for ConnectString {
    fn from(data: &str) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for ConnectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectString").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ConnectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}
