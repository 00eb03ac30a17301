use super::connection::Connection;
use super::options::ConnectOptions;
use crate::error::{Error, Result};
use crate::transport::Transport;
use std::sync::{Arc, OnceLock};

static GLOBAL_TRANSPORT: OnceLock<std::result::Result<Arc<dyn Transport>, String>> =
    OnceLock::new();

/// Entry point holding the transport every connection is made through.
#[derive(Clone)]
pub struct Environment {
    transport: Arc<dyn Transport>,
}

impl Environment {
    /// Environment over the process-wide native transport, loaded on first
    /// use and shared by all connections.
    pub fn global() -> Result<Self> {
        match GLOBAL_TRANSPORT.get_or_init(load_native) {
            Ok(transport) => Ok(Self {
                transport: transport.clone(),
            }),
            Err(msg) => Err(Error::Interface(msg.clone())),
        }
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    pub fn connect(&self, options: &ConnectOptions) -> Result<Connection> {
        Connection::open(self.transport.clone(), options)
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

#[cfg(feature = "native")]
fn load_native() -> std::result::Result<Arc<dyn Transport>, String> {
    crate::transport::NativeTransport::load()
        .map(|t| Arc::new(t) as Arc<dyn Transport>)
        .map_err(|e| e.message())
}

#[cfg(not(feature = "native"))]
fn load_native() -> std::result::Result<Arc<dyn Transport>, String> {
    Err("No ODBTP transport available: enable the `native` feature or use \
         Environment::with_transport"
        .to_string())
}
