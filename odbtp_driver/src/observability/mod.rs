pub mod logging;

pub use logging::{Metadata, StructuredLogger};

lazy_static::lazy_static! {
    static ref LOGGER: StructuredLogger = StructuredLogger::default();
}

/// Logger shared by every connection and cursor.
pub fn logger() -> &'static StructuredLogger {
    &LOGGER
}
