//! In-process state server.
//!
//! Holds an authoritative [`ServerState`] and answers the two sync
//! endpoints the way the backend does. Used behind a [`LoopbackClient`]
//! by tests and by the CLI.
//!
//! Adjudication rules for `/sync/resolve`:
//! - orders are server-authoritative; pushes are rejected with 409
//! - identical content: `no_conflict`
//! - local timestamp strictly newer: `local_wins`, the server adopts the
//!   pushed state stamped with the local timestamp
//! - otherwise: `server_wins`, the server keeps its copy
//!
//! [`LoopbackClient`]: crate::LoopbackClient

use crate::http::{HttpResponse, LoopbackServer, Method, RESOLVE_PATH, STATE_PATH};
use grocer_sync_protocol::{
    ConflictAction, ResolveConflictRequest, ResolveConflictResponse, ServerState,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// An in-memory authoritative state server.
#[derive(Debug)]
pub struct InMemoryStateServer {
    state: RwLock<ServerState>,
    fetches: AtomicUsize,
    resolves: AtomicUsize,
}

impl InMemoryStateServer {
    /// Creates a server holding `state`.
    pub fn new(state: ServerState) -> Self {
        Self {
            state: RwLock::new(state),
            fetches: AtomicUsize::new(0),
            resolves: AtomicUsize::new(0),
        }
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> ServerState {
        self.state.read().clone()
    }

    /// Replaces the state, e.g. to simulate another device's write.
    pub fn set_state(&self, state: ServerState) {
        *self.state.write() = state;
    }

    /// Number of snapshot fetches served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of conflict resolutions served (including rejected ones).
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    /// Serves a snapshot fetch.
    pub fn handle_fetch(&self) -> ServerState {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.state()
    }

    /// Adjudicates a pushed local state.
    pub fn handle_resolve(
        &self,
        request: ResolveConflictRequest,
    ) -> Result<ResolveConflictResponse, (u16, String)> {
        self.resolves.fetch_add(1, Ordering::SeqCst);

        let kind = request.entity();
        if kind.is_server_authoritative() {
            return Err((409, format!("{} are server-authoritative", kind)));
        }

        let local_checksum = request
            .local_state
            .checksum()
            .map_err(|e| (400, e.to_string()))?;

        let mut state = self.state.write();
        let server_updated_at = state.updated_at(kind).clone();

        let action = if state.checksum(kind).matches(&local_checksum) {
            ConflictAction::NoConflict
        } else if request.local_timestamp.is_newer_than(&server_updated_at) {
            state
                .replace(request.local_state.clone(), request.local_timestamp.clone())
                .map_err(|e| (500, e.to_string()))?;
            ConflictAction::LocalWins
        } else {
            ConflictAction::ServerWins
        };

        debug!(entity = %kind, ?action, "adjudicated pushed state");

        Ok(ResolveConflictResponse::new(
            action,
            state.payload(kind),
            state.updated_at(kind).clone(),
        ))
    }

    fn route_resolve(&self, body: &[u8]) -> HttpResponse {
        let request = match ResolveConflictRequest::from_json(body) {
            Ok(request) => request,
            Err(e) => return HttpResponse::new(400, e.to_string()),
        };

        match self.handle_resolve(request) {
            Ok(response) => match response.to_json() {
                Ok(body) => HttpResponse::ok(body),
                Err(e) => HttpResponse::new(500, e.to_string()),
            },
            Err((status, message)) => HttpResponse::new(status, message),
        }
    }
}

impl LoopbackServer for InMemoryStateServer {
    fn handle(&self, method: Method, path: &str, body: &[u8]) -> HttpResponse {
        match (method, path) {
            (Method::Get, STATE_PATH) => match self.handle_fetch().to_json() {
                Ok(json) => HttpResponse::ok(json),
                Err(e) => HttpResponse::new(500, e.to_string()),
            },
            (Method::Post, RESOLVE_PATH) => self.route_resolve(body),
            _ => HttpResponse::new(404, format!("no route for {:?} {}", method, path)),
        }
    }
}
