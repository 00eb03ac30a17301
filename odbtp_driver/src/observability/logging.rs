use crate::error::Error;
use crate::security::ConnectString;
use log::Level;
use std::collections::BTreeMap;

pub type Metadata = BTreeMap<&'static str, String>;

/// Driver events written through the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct StructuredLogger {
    enabled: bool,
}

impl StructuredLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_operation(&self, level: Level, operation: &str, metadata: &Metadata) {
        if !self.enabled {
            return;
        }
        log::log!(level, "Operation: {}{}", operation, render(metadata));
    }

    /// The connection string is always logged redacted.
    pub fn log_connection(&self, level: Level, connection_string: &ConnectString, action: &str) {
        if !self.enabled {
            return;
        }
        log::log!(
            level,
            "Connection {}: {}",
            action,
            connection_string.redacted()
        );
    }

    pub fn log_error(&self, error: &Error, metadata: &Metadata) {
        if !self.enabled {
            return;
        }
        log::error!(
            "{}: {}{}",
            error.kind().name(),
            error.message(),
            render(metadata)
        );
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new(true)
    }
}

fn render(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!(", {}={}", key, value))
        .collect()
}
