use serde::Serialize;

/// ODBC driver family on the remote host, detected from the driver name the
/// server reports after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DriverKind {
    SqlServer,
    Oracle,
    FoxPro,
    Jet,
    Other,
}

impl DriverKind {
    pub fn from_name(driver_name: &str) -> Self {
        let lower = driver_name.to_lowercase();

        if lower.contains("sqlsrv") || lower.contains("sql server") {
            return DriverKind::SqlServer;
        }
        if lower.contains("oracle") || lower.contains("sqora") || lower.contains("msorcl") {
            return DriverKind::Oracle;
        }
        if lower.contains("vfpodbc") || lower.contains("foxpro") {
            return DriverKind::FoxPro;
        }
        if lower.contains("odbcjt") || lower.contains("jet") || lower.contains("access") {
            return DriverKind::Jet;
        }

        DriverKind::Other
    }

    /// FoxPro and Jet sources reject the transaction attribute.
    pub fn supports_transactions(self) -> bool {
        !matches!(self, DriverKind::FoxPro | DriverKind::Jet)
    }
}
