use crate::error::{classify, Error, Result};
use crate::handles::Handle;
use crate::transport::Transport;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub open: bool,
    /// False whenever work may be pending on the server.
    pub committed: bool,
}

/// Transaction state of one login, shared by a connection and all of its
/// cursors.
pub struct Session {
    transport: Arc<dyn Transport>,
    handle: Handle,
    driver: String,
    state: Mutex<SessionState>,
}

pub type SharedSession = Arc<Session>;

impl Session {
    pub fn new(transport: Arc<dyn Transport>, handle: Handle, driver: String) -> SharedSession {
        Arc::new(Self {
            transport,
            handle,
            driver,
            state: Mutex::new(SessionState {
                open: true,
                committed: false,
            }),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SessionState {
        *self.lock()
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn is_committed(&self) -> bool {
        self.lock().committed
    }

    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Interface("The connection has been closed.".to_string()))
        }
    }

    pub fn mark_dirty(&self) {
        self.lock().committed = false;
    }

    pub(crate) fn mark_committed(&self) {
        self.lock().committed = true;
    }

    pub(crate) fn mark_closed(&self) {
        self.lock().open = false;
    }

    pub fn commit(&self) -> Result<()> {
        self.ensure_open()?;
        if !self.transport.commit(self.handle) {
            return Err(classify(self.transport.as_ref(), self.handle));
        }
        self.mark_committed();
        Ok(())
    }

    /// Explicit rollback. Leaves the committed flag untouched.
    pub fn rollback(&self) -> Result<()> {
        self.ensure_open()?;
        if !self.transport.rollback(self.handle) {
            return Err(classify(self.transport.as_ref(), self.handle));
        }
        Ok(())
    }

    /// Rollback issued after a failed operation. The caller already holds the
    /// error it will report, so a failing rollback is only logged.
    fn rollback_after_failure(&self) {
        self.mark_dirty();
        if !self.is_open() {
            return;
        }
        log::warn!("Rolling back session {:?} after a failed operation", self.handle);
        if !self.transport.rollback(self.handle) {
            let err = classify(self.transport.as_ref(), self.handle);
            log::warn!("Implicit rollback failed: {}", err);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("driver", &self.driver)
            .field("state", &self.state())
            .finish()
    }
}

/// Wraps the transport calls of one operation handle. Any failure is
/// classified from that handle and followed by exactly one session rollback.
pub struct TransactionGuard<'a> {
    session: &'a Session,
    operation: Handle,
}

impl<'a> TransactionGuard<'a> {
    pub fn new(session: &'a Session, operation: Handle) -> Self {
        Self { session, operation }
    }

    pub fn transport(&self) -> &dyn Transport {
        self.session.transport.as_ref()
    }

    pub fn operation(&self) -> Handle {
        self.operation
    }

    pub fn session(&self) -> &Session {
        self.session
    }

    /// Turns a primitive's success flag into a `Result`.
    pub fn check(&self, succeeded: bool) -> Result<()> {
        if succeeded {
            Ok(())
        } else {
            Err(self.abort())
        }
    }

    /// Classifies the pending error, then rolls the session back.
    pub fn abort(&self) -> Error {
        let error = classify(self.transport(), self.operation);
        self.session.rollback_after_failure();
        error
    }

    /// Rolls back on behalf of an error produced by the driver itself.
    pub fn fail(&self, error: Error) -> Error {
        self.session.rollback_after_failure();
        error
    }
}
