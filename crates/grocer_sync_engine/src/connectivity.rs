//! Connectivity checks performed before any network attempt.

use crate::error::{SyncError, SyncResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether the network is reachable.
///
/// Implementations wrap the platform's reachability API. Every network
/// entry point consults the guard first and fails with
/// [`SyncError::NetworkUnavailable`] without attempting or retrying.
pub trait ConnectivityGuard: Send + Sync {
    /// Returns true if the network is currently reachable.
    fn is_available(&self) -> bool;

    /// Fails with [`SyncError::NetworkUnavailable`] when offline.
    fn ensure_available(&self) -> SyncResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SyncError::NetworkUnavailable)
        }
    }
}

impl<G: ConnectivityGuard + ?Sized> ConnectivityGuard for Arc<G> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// A connectivity flag set by the host application.
#[derive(Debug)]
pub struct StaticConnectivity {
    available: AtomicBool,
}

impl StaticConnectivity {
    /// Creates a guard that reports the given state.
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
        }
    }

    /// Creates a guard that reports online.
    pub fn online() -> Self {
        Self::new(true)
    }

    /// Creates a guard that reports offline.
    pub fn offline() -> Self {
        Self::new(false)
    }

    /// Updates the reported state.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

impl ConnectivityGuard for StaticConnectivity {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Adapts a probe closure, such as a platform reachability callback.
pub struct FnConnectivity<F>(F);

impl<F: Fn() -> bool + Send + Sync> FnConnectivity<F> {
    /// Wraps `probe`.
    pub fn new(probe: F) -> Self {
        Self(probe)
    }
}

impl<F: Fn() -> bool + Send + Sync> ConnectivityGuard for FnConnectivity<F> {
    fn is_available(&self) -> bool {
        (self.0)()
    }
}
