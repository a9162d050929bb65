//! Remote state gateway abstraction.

use crate::error::{SyncError, SyncResult};
use grocer_sync_protocol::{ResolveConflictRequest, ResolveConflictResponse, ServerState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The network boundary to the server's authoritative state.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, loopback, mock for testing, etc.). Transport
/// failures should be reported as retryable [`SyncError::Transport`]
/// errors; non-success answers as [`SyncError::ServerRejected`].
pub trait RemoteStateGateway: Send + Sync {
    /// Fetches the server's snapshot of every entity in one round trip.
    fn fetch_server_state(&self) -> SyncResult<ServerState>;

    /// Offers a locally newer state to the server for adjudication.
    fn resolve_conflict(
        &self,
        request: &ResolveConflictRequest,
    ) -> SyncResult<ResolveConflictResponse>;
}

impl<G: RemoteStateGateway + ?Sized> RemoteStateGateway for Arc<G> {
    fn fetch_server_state(&self) -> SyncResult<ServerState> {
        (**self).fetch_server_state()
    }

    fn resolve_conflict(
        &self,
        request: &ResolveConflictRequest,
    ) -> SyncResult<ResolveConflictResponse> {
        (**self).resolve_conflict(request)
    }
}

/// A scripted gateway for testing.
///
/// Queued failures are returned first, one per call; a sticky failure is
/// returned on every call after the queue drains. Every call is counted,
/// including failed ones.
#[derive(Debug, Default)]
pub struct MockGateway {
    server_state: Mutex<Option<ServerState>>,
    resolve_response: Mutex<Option<ResolveConflictResponse>>,
    fetch_failures: Mutex<VecDeque<SyncError>>,
    resolve_failures: Mutex<VecDeque<SyncError>>,
    sticky_fetch_failure: Mutex<Option<SyncError>>,
    sticky_resolve_failure: Mutex<Option<SyncError>>,
    fetch_calls: AtomicUsize,
    resolve_requests: Mutex<Vec<ResolveConflictRequest>>,
}

impl MockGateway {
    /// Creates a new mock gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock gateway serving the given state.
    pub fn with_state(state: ServerState) -> Self {
        let gateway = Self::new();
        gateway.set_server_state(state);
        gateway
    }

    /// Sets the state returned by fetches.
    pub fn set_server_state(&self, state: ServerState) {
        *self.server_state.lock() = Some(state);
    }

    /// Sets the response returned by conflict resolution.
    pub fn set_resolve_response(&self, response: ResolveConflictResponse) {
        *self.resolve_response.lock() = Some(response);
    }

    /// Makes the next fetch fail with `error`.
    pub fn fail_next_fetch(&self, error: SyncError) {
        self.fetch_failures.lock().push_back(error);
    }

    /// Makes every fetch fail with `error`.
    pub fn fail_all_fetches(&self, error: SyncError) {
        *self.sticky_fetch_failure.lock() = Some(error);
    }

    /// Makes the next conflict resolution fail with `error`.
    pub fn fail_next_resolve(&self, error: SyncError) {
        self.resolve_failures.lock().push_back(error);
    }

    /// Makes every conflict resolution fail with `error`.
    pub fn fail_all_resolves(&self, error: SyncError) {
        *self.sticky_resolve_failure.lock() = Some(error);
    }

    /// Number of fetch calls made.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of conflict resolution calls made.
    pub fn resolve_calls(&self) -> usize {
        self.resolve_requests.lock().len()
    }

    /// Total number of gateway calls made.
    pub fn total_calls(&self) -> usize {
        self.fetch_calls() + self.resolve_calls()
    }

    /// Every conflict resolution request received, in order.
    pub fn resolve_requests(&self) -> Vec<ResolveConflictRequest> {
        self.resolve_requests.lock().clone()
    }
}

impl RemoteStateGateway for MockGateway {
    fn fetch_server_state(&self) -> SyncResult<ServerState> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.fetch_failures.lock().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.sticky_fetch_failure.lock().clone() {
            return Err(err);
        }

        self.server_state
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock server state set".into()))
    }

    fn resolve_conflict(
        &self,
        request: &ResolveConflictRequest,
    ) -> SyncResult<ResolveConflictResponse> {
        self.resolve_requests.lock().push(request.clone());

        if let Some(err) = self.resolve_failures.lock().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.sticky_resolve_failure.lock().clone() {
            return Err(err);
        }

        self.resolve_response
            .lock()
            .clone()
            .ok_or_else(|| SyncError::Protocol("no mock resolve response set".into()))
    }
}
