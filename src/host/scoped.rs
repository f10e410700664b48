// ============================================================================
// File: src/host/scoped.rs
// ----------------------------------------------------------------------------
// Scoped acquisition: guaranteed teardown on every exit path
// ============================================================================

use std::ops::{Deref, DerefMut};

use log::warn;

use crate::errors::HostResult;

use super::Host;

impl Host {
    /// Run `f` inside a managed scope
    ///
    /// Runs setup, then `f`, then teardown, and always closes the session,
    /// including when setup, `f` or teardown fail. The first error wins.
    pub fn scoped<T, F>(&mut self, f: F) -> HostResult<T>
    where
        F: FnOnce(&mut Host) -> HostResult<T>,
    {
        let outcome = match self.setup() {
            Ok(()) => {
                let value = f(self);
                let teardown = self.teardown();
                value.and_then(|value| teardown.map(|()| value))
            }
            Err(e) => Err(e),
        };

        let closed = self.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }
}

/// Owns a host and closes it (or releases it) when dropped
///
/// Errors during drop are logged. Call `close` or `release` explicitly to
/// observe them.
#[derive(Debug)]
pub struct HostGuard {
    host: Host,
    release_on_drop: bool,
}

impl HostGuard {
    /// Guard that closes the session on drop
    pub fn new(host: Host) -> Self {
        Self {
            host,
            release_on_drop: false,
        }
    }

    /// Guard that releases the host to its provider on drop
    pub fn releasing(host: Host) -> Self {
        Self {
            host,
            release_on_drop: true,
        }
    }

    /// Close now, reporting any error
    pub fn close(&mut self) -> HostResult<()> {
        self.host.close()
    }

    /// Release now, reporting any error; nothing further happens on drop
    pub fn release(mut self) -> HostResult<()> {
        self.release_on_drop = false;
        let released = self.host.release();
        let closed = self.host.close();
        released?;
        closed
    }
}

impl Deref for HostGuard {
    type Target = Host;

    fn deref(&self) -> &Host {
        &self.host
    }
}

impl DerefMut for HostGuard {
    fn deref_mut(&mut self) -> &mut Host {
        &mut self.host
    }
}

impl Drop for HostGuard {
    fn drop(&mut self) {
        if self.release_on_drop
            && let Err(e) = self.host.release()
        {
            warn!("Failed to release {}: {e}", self.host.label());
        }
        if let Err(e) = self.host.close() {
            warn!("Failed to close {}: {e}", self.host.label());
        }
    }
}
