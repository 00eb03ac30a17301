#![allow(dead_code)]

#[cfg(feature = "test-helpers")]
pub mod env;
pub mod fake_server;

#[cfg(feature = "test-helpers")]
#[allow(unused_imports)]
pub use env::{live_options, should_run_live_tests};
#[allow(unused_imports)]
pub use fake_server::{FakeServer, SERVER_ERROR};

use odbtp_driver::{ConnectOptions, Connection, Environment, Transport};
use std::sync::Arc;

pub const TEST_DSN: &str = "DSN=fake;UID=tester;PWD=hunter2";

/// Opens a connection to `server` with default options.
pub fn connect(server: &Arc<FakeServer>) -> odbtp_driver::Result<Connection> {
    connect_with(server, ConnectOptions::new(TEST_DSN, "fake-host"))
}

pub fn connect_with(
    server: &Arc<FakeServer>,
    options: ConnectOptions,
) -> odbtp_driver::Result<Connection> {
    let transport: Arc<dyn Transport> = server.clone();
    Environment::with_transport(transport).connect(&options)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
