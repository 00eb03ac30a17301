//! Support for tests that talk to a real ODBTP server.

use std::sync::Once;

static DOTENV: Once = Once::new();

/// Loads `.env` from the working directory or its parents, once per process.
/// A missing file is not an error.
pub fn load_dotenv() {
    DOTENV.call_once(|| match dotenvy::dotenv() {
        Ok(path) => log::debug!("Loaded test environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
    });
}
