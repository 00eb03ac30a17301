use crate::transport::Transport;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Opaque token for a session or operation handle issued by the transport.
///
/// A zero handle signals allocation failure, so a `Handle` is never zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroUsize);

impl Handle {
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0.get())
    }
}

/// A handle owned exclusively by one object and freed exactly once.
///
/// `release` frees it explicitly; otherwise it is freed on drop unless
/// `forget` was called because the parent session already released it.
pub struct OwnedHandle {
    transport: Arc<dyn Transport>,
    handle: Option<Handle>,
}

impl OwnedHandle {
    pub fn new(transport: Arc<dyn Transport>, handle: Handle) -> Self {
        Self {
            transport,
            handle: Some(handle),
        }
    }

    /// The live handle, or `None` once released or forgotten.
    pub fn get(&self) -> Option<Handle> {
        self.handle
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Frees the handle now. Later calls are no-ops.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.transport.free(handle);
        }
    }

    /// Drops ownership without freeing.
    pub fn forget(&mut self) {
        self.handle = None;
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for OwnedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("handle", &self.handle)
            .finish()
    }
}
