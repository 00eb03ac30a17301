use super::cursor::Cursor;
use super::driver::DriverKind;
use super::options::ConnectOptions;
use super::transaction::{Session, SharedSession};
use crate::error::{classify, classify_codes, ProtocolErrorCode, Result};
use crate::handles::{Handle, OwnedHandle};
use crate::observability::{logger, Metadata};
use crate::transport::{Attribute, Transport};
use log::Level;
use std::sync::Arc;

/// Longest driver name read back after login.
const DRIVER_NAME_LEN: usize = 50;

/// One login to an ODBTP server.
///
/// Dropping an open connection closes it, rolling back uncommitted work.
pub struct Connection {
    session: SharedSession,
    handle: OwnedHandle,
    driver_kind: DriverKind,
    arraysize: usize,
}

impl Connection {
    pub(crate) fn open(transport: Arc<dyn Transport>, options: &ConnectOptions) -> Result<Self> {
        let Some(raw) = transport.allocate(None) else {
            let err = classify_codes(ProtocolErrorCode::Memory as u32, String::new);
            logger().log_error(&err, &Metadata::new());
            return Err(err);
        };
        let mut handle = OwnedHandle::new(transport.clone(), raw);

        if !transport.login(
            raw,
            &options.server,
            options.port,
            options.login_mode,
            options.connection_string.expose(),
        ) {
            let err = classify(transport.as_ref(), raw);
            logger().log_connection(Level::Warn, &options.connection_string, "login failed");
            handle.release();
            return Err(err);
        }

        let driver = transport
            .get_attr_text(raw, Attribute::DriverName, DRIVER_NAME_LEN)
            .unwrap_or_default();
        let driver_kind = DriverKind::from_name(&driver);

        if let Err(err) = negotiate(transport.as_ref(), raw, driver_kind, options) {
            if !transport.logout(raw, true) {
                log::warn!("Logout after failed negotiation also failed");
            }
            handle.release();
            return Err(err);
        }

        logger().log_connection(Level::Info, &options.connection_string, "opened");
        log::debug!("Connected to {}:{} using driver '{}'", options.server, options.port, driver);

        Ok(Self {
            session: Session::new(transport, raw, driver),
            handle,
            driver_kind,
            arraysize: options.arraysize,
        })
    }

    pub fn driver(&self) -> &str {
        self.session.driver()
    }

    pub fn driver_kind(&self) -> DriverKind {
        self.driver_kind
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// False while work may be pending on the server.
    pub fn is_committed(&self) -> bool {
        self.session.is_committed()
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn commit(&self) -> Result<()> {
        self.session.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.session.rollback()
    }

    pub fn cursor(&self) -> Result<Cursor> {
        self.session.ensure_open()?;
        let transport = self.session.transport().clone();
        let parent = self.session.handle();
        match transport.allocate(Some(parent)) {
            Some(raw) => Ok(Cursor::new(
                self.session.clone(),
                OwnedHandle::new(transport, raw),
                self.arraysize,
            )),
            None => Err(classify(transport.as_ref(), parent)),
        }
    }

    /// Rolls back uncommitted work, logs out and releases the session.
    ///
    /// The session is released even when the rollback or logout fails; the
    /// first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        self.session.ensure_open()?;
        let pending = !self.session.is_committed() && self.driver_kind.supports_transactions();
        let rolled_back = if pending {
            self.session.rollback()
        } else {
            Ok(())
        };
        if let Err(e) = &rolled_back {
            log::warn!("Rollback on close failed: {}", e);
        }
        self.session.mark_closed();

        let transport = self.session.transport().clone();
        let raw = self.session.handle();
        let logged_out = if transport.logout(raw, true) {
            Ok(())
        } else {
            Err(classify(transport.as_ref(), raw))
        };
        self.handle.release();
        log::info!("Connection {:?} closed", raw);
        rolled_back.and(logged_out)
    }

    #[cfg(test)]
    fn handle(&self) -> Option<Handle> {
        self.handle.get()
    }
}

fn negotiate(
    transport: &dyn Transport,
    handle: Handle,
    driver_kind: DriverKind,
    options: &ConnectOptions,
) -> Result<()> {
    let check = |ok: bool| -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(classify(transport, handle))
        }
    };

    check(transport.load_data_types(handle))?;
    check(transport.set_attr_long(handle, Attribute::DescribeParams, 0))?;
    check(transport.set_attr_long(handle, Attribute::FullColumnInfo, 1))?;
    check(transport.use_row_cache(handle, options.row_cache.enabled, options.row_cache.size))?;
    if driver_kind.supports_transactions() {
        check(transport.set_attr_long(handle, Attribute::Transactions, options.isolation.code()))?;
    } else {
        log::debug!("Driver {:?} has no transaction support", driver_kind);
    }
    Ok(())
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.session.is_open() {
            log::warn!("Connection dropped without close - closing");
            if let Err(e) = self.close() {
                log::warn!("Implicit close failed: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("driver_kind", &self.driver_kind)
            .finish()
    }
}
