//! # Grocer Sync Engine
//!
//! Keeps the client's cached cart, order history and profile consistent
//! with the server's authoritative copy after offline periods or
//! multi-device divergence.
//!
//! This crate provides:
//! - Connectivity guard checked before any network attempt
//! - Bounded retry with exponential backoff
//! - Per-entity reconcilers (cart, orders, profile)
//! - A sync orchestrator that isolates per-entity failures
//! - Gateway abstraction with HTTP, loopback and mock implementations
//! - In-memory and file-backed local stores
//!
//! ## Reconciliation Pass
//!
//! 1. Check connectivity (fail fast when offline)
//! 2. Fetch the full remote snapshot set once (retried)
//! 3. Reconcile each entity independently:
//!    - matching checksums: nothing to do
//!    - local newer: offer local state to the server, adopt its verdict
//!    - otherwise: overwrite the local cache with the remote copy
//! 4. Aggregate per-entity results into a [`SyncSummary`]
//!
//! ## Key Invariants
//!
//! - An empty checksum never counts as a match
//! - Orders are server-authoritative and never pushed
//! - Local state is never unilaterally declared the winner
//! - One entity's failure never aborts the others

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod error;
mod file_store;
mod http;
mod orchestrator;
mod reconcile;
mod retry;
mod server;
mod store;
mod summary;
mod transport;

pub use config::{RetryConfig, SyncConfig, BASE_DELAY, MAX_RETRIES};
pub use connectivity::{ConnectivityGuard, FnConnectivity, StaticConnectivity};
pub use error::{SyncError, SyncResult};
pub use file_store::FileStateStore;
pub use http::{HttpClient, HttpGateway, HttpResponse, LoopbackClient, LoopbackServer, Method};
pub use orchestrator::{SyncOrchestrator, SyncState, SyncStats};
pub use reconcile::{
    Cart, EntityPass, EntityReconciler, EntitySyncState, Orders, Profile, SyncContext, SyncEntity,
};
pub use retry::RetryExecutor;
pub use server::InMemoryStateServer;
pub use store::{LocalState, LocalStateStore, MemoryStateStore};
pub use summary::{EntitySyncResult, SyncSummary};
pub use transport::{MockGateway, RemoteStateGateway};
