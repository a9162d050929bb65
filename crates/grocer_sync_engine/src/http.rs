//! HTTP gateway implementation.
//!
//! This module provides an HTTP-based gateway for the sync engine.
//! The actual HTTP client is abstracted via a trait to allow different
//! implementations (reqwest, ureq, the platform's native stack, etc.).

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::RemoteStateGateway;
use grocer_sync_protocol::{ResolveConflictRequest, ResolveConflictResponse, ServerState};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// Path of the snapshot endpoint.
pub(crate) const STATE_PATH: &str = "/sync/state";

/// Path of the conflict resolution endpoint.
pub(crate) const RESOLVE_PATH: &str = "/sync/resolve";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
}

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a 200 response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. `Err` means
/// no response was obtained (DNS, TLS, reset, timeout); any response,
/// whatever its status, is `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends a GET request.
    fn get(&self, url: &str) -> Result<HttpResponse, String>;

    /// Sends a POST request with a JSON body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String>;
}

/// HTTP-based gateway.
///
/// Uses JSON for request and response bodies.
pub struct HttpGateway<C: HttpClient> {
    /// Base URL of the state service (e.g., "https://api.grocer.example").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Last error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpGateway<C> {
    /// Creates a new HTTP gateway.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Creates a gateway for `config.server_url`.
    pub fn from_config(config: &SyncConfig, client: C) -> Self {
        Self::new(config.server_url.as_str(), client)
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(&self, sent: Result<HttpResponse, String>) -> SyncResult<Vec<u8>> {
        let response = sent.map_err(|e| {
            *self.last_error.write() = Some(e.clone());
            SyncError::transport_retryable(e)
        })?;

        if !response.is_success() {
            let message = String::from_utf8_lossy(&response.body).into_owned();
            *self.last_error.write() = Some(message.clone());
            return Err(SyncError::ServerRejected {
                status: response.status,
                message,
            });
        }

        *self.last_error.write() = None;
        Ok(response.body)
    }
}

impl<C: HttpClient> RemoteStateGateway for HttpGateway<C> {
    fn fetch_server_state(&self) -> SyncResult<ServerState> {
        let body = self.check(self.client.get(&self.url(STATE_PATH)))?;
        let json = std::str::from_utf8(&body)
            .map_err(|e| SyncError::Protocol(format!("response is not UTF-8: {}", e)))?;
        Ok(ServerState::from_json(json)?)
    }

    fn resolve_conflict(
        &self,
        request: &ResolveConflictRequest,
    ) -> SyncResult<ResolveConflictResponse> {
        let payload = request.to_json()?;
        let body = self.check(self.client.post(&self.url(RESOLVE_PATH), payload))?;
        Ok(ResolveConflictResponse::from_json(&body)?)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a request and returns the response.
    fn handle(&self, method: Method, path: &str, body: &[u8]) -> HttpResponse;
}

impl<S: LoopbackServer + ?Sized> LoopbackServer for std::sync::Arc<S> {
    fn handle(&self, method: Method, path: &str, body: &[u8]) -> HttpResponse {
        (**self).handle(method, path, body)
    }
}

/// A loopback HTTP client that routes requests directly to a server.
///
/// Useful for testing and local tooling without actual network overhead.
/// Can drop a number of upcoming requests to simulate a flaky link.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
    drop_next: AtomicU32,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            drop_next: AtomicU32::new(0),
        }
    }

    /// Returns the server this client talks to.
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Fails the next `count` requests as if the connection dropped.
    pub fn drop_next(&self, count: u32) {
        self.drop_next.store(count, Ordering::SeqCst);
    }

    fn route(&self, method: Method, url: &str, body: &[u8]) -> Result<HttpResponse, String> {
        let dropped = self
            .drop_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if dropped {
            return Err("connection reset by peer".into());
        }

        // Endpoint paths sit at the end; the base URL may contain "/sync/" itself
        let path = url.rfind("/sync/").map(|i| &url[i..]).unwrap_or(url);

        Ok(self.server.handle(method, path, body))
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn get(&self, url: &str) -> Result<HttpResponse, String> {
        self.route(Method::Get, url, &[])
    }

    fn post(&self, url: &str, body: Vec<u8>) -> Result<HttpResponse, String> {
        self.route(Method::Post, url, &body)
    }
}
