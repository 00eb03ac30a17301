//! Settings for tests against a real ODBTP server.
use odbtp_driver::ConnectOptions;

/// Options from `ODBTP_*` variables (a `.env` file is honored), or `None`
/// when no server is configured.
pub fn live_options() -> Option<ConnectOptions> {
    odbtp_driver::test_helpers::load_dotenv();
    ConnectOptions::from_env().ok()
}

pub fn should_run_live_tests() -> bool {
    live_options().is_some()
}
