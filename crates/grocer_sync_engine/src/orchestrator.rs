//! Full-sync orchestration.

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityGuard;
use crate::error::{SyncError, SyncResult};
use crate::reconcile::{
    Cart, EntityPass, EntityReconciler, EntitySyncState, Orders, Profile, SyncContext, SyncEntity,
};
use crate::retry::RetryExecutor;
use crate::store::LocalStateStore;
use crate::summary::{EntitySyncResult, SyncSummary};
use crate::transport::RemoteStateGateway;
use grocer_sync_protocol::ServerState;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// The current state of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Not syncing.
    Idle,
    /// Checking connectivity.
    Connecting,
    /// Fetching the remote snapshot set.
    Fetching,
    /// Reconciling entities.
    Reconciling,
    /// The last pass completed.
    Synced,
    /// The last pass aborted with an error.
    Error,
}

impl SyncState {
    /// Returns true if a pass is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::Connecting | SyncState::Fetching | SyncState::Reconciling
        )
    }

    /// Returns true if a new pass can start.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Synced | SyncState::Error)
    }
}

/// Statistics about sync passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Passes that reached the summary step.
    pub passes_completed: u64,
    /// Entities overwritten with the remote copy.
    pub entities_pulled: u64,
    /// Entities offered to the server.
    pub entities_pushed: u64,
    /// Entities that ended a pass with an error.
    pub entity_failures: u64,
    /// Retries performed by the executor.
    pub retries: u64,
    /// Last completed pass.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Runs full reconciliation passes over cart, orders and profile.
///
/// One pass fetches the remote snapshot set once, then reconciles each
/// entity independently. A failing entity is recorded in the summary and
/// never aborts the others; only connectivity and fetch failures abort
/// the whole pass.
pub struct SyncOrchestrator<G, S, C>
where
    G: RemoteStateGateway,
    S: LocalStateStore,
    C: ConnectivityGuard,
{
    config: SyncConfig,
    gateway: G,
    store: S,
    connectivity: C,
    retry: RetryExecutor,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: Arc<AtomicBool>,
}

impl<G, S, C> SyncOrchestrator<G, S, C>
where
    G: RemoteStateGateway,
    S: LocalStateStore,
    C: ConnectivityGuard,
{
    /// Creates an orchestrator.
    pub fn new(config: SyncConfig, gateway: G, store: S, connectivity: C) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let retry = RetryExecutor::with_cancel_flag(config.retry.clone(), Arc::clone(&cancelled));
        Self {
            config,
            gateway,
            store,
            connectivity,
            retry,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the local store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the connectivity guard.
    pub fn connectivity(&self) -> &C {
        &self.connectivity
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Cancels the running pass at its next checkpoint.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn context(&self) -> SyncContext<'_> {
        SyncContext {
            gateway: &self.gateway,
            store: &self.store,
            guard: &self.connectivity,
            retry: &self.retry,
        }
    }

    /// Runs one full reconciliation pass.
    ///
    /// Fails with [`SyncError::NetworkUnavailable`] before any gateway call
    /// when offline, with the fetch error when the remote snapshot set
    /// cannot be fetched, and with [`SyncError::SyncInProgress`] when
    /// another pass is running on this orchestrator. Entity-level failures
    /// are reported in the summary instead.
    pub fn perform_full_sync(&self) -> SyncResult<SyncSummary> {
        {
            let mut state = self.state.write();
            if !state.can_start_sync() {
                return Err(SyncError::SyncInProgress);
            }
            // cleared before the pass becomes visible as active
            self.reset_cancel();
            *state = SyncState::Connecting;
        }
        let _active = ActivePass(&self.state);

        let start = Instant::now();
        info!(concurrent = self.config.concurrent_entities, "sync pass started");

        match self.run_pass() {
            Ok(summary) => {
                self.record_success(&summary);
                info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    failed = summary.failed_count(),
                    "sync pass finished"
                );
                Ok(summary)
            }
            Err(err) => {
                self.handle_error(&err);
                Err(err)
            }
        }
    }

    fn run_pass(&self) -> SyncResult<SyncSummary> {
        self.connectivity.ensure_available()?;
        self.check_cancelled()?;

        self.set_state(SyncState::Fetching);
        let ctx = self.context();
        let server = ctx.fetch_server_state()?;

        self.check_cancelled()?;

        self.set_state(SyncState::Reconciling);
        let (cart, orders, profile) = if self.config.concurrent_entities {
            reconcile_concurrently(ctx, &server)
        } else {
            (
                reconcile_isolated::<Cart>(ctx, &server),
                reconcile_isolated::<Orders>(ctx, &server),
                reconcile_isolated::<Profile>(ctx, &server),
            )
        };

        Ok(SyncSummary::new(
            cart,
            orders,
            profile,
            self.store.current_timestamp(),
        ))
    }

    fn record_success(&self, summary: &SyncSummary) {
        self.set_state(SyncState::Synced);

        let results = [&summary.cart, &summary.orders, &summary.profile];
        let mut stats = self.stats.write();
        stats.passes_completed += 1;
        stats.entities_pulled += results.iter().filter(|r| r.pulled).count() as u64;
        stats.entities_pushed += results.iter().filter(|r| r.pushed).count() as u64;
        stats.entity_failures += summary.failed_count() as u64;
        stats.retries = self.retry.retries();
        stats.last_sync_time = Some(Instant::now());
        stats.last_error = summary.errors.first().cloned();
    }

    fn handle_error(&self, err: &SyncError) {
        warn!(error = %err, "sync pass aborted");
        self.set_state(SyncState::Error);
        let mut stats = self.stats.write();
        stats.retries = self.retry.retries();
        stats.last_error = Some(err.to_string());
    }
}

/// Moves a pass that unwinds out of `perform_full_sync` to `Error`.
struct ActivePass<'a>(&'a RwLock<SyncState>);

impl Drop for ActivePass<'_> {
    fn drop(&mut self) {
        let mut state = self.0.write();
        if state.is_active() {
            *state = SyncState::Error;
        }
    }
}

/// Runs one reconciler, turning a panic into an entity failure.
fn reconcile_isolated<E: SyncEntity>(
    ctx: SyncContext<'_>,
    server: &ServerState,
) -> EntitySyncResult {
    panic::catch_unwind(AssertUnwindSafe(|| {
        EntityReconciler::<E>::new(ctx).run(server)
    }))
    .unwrap_or_else(|_| panicked::<E>())
}

fn reconcile_concurrently(
    ctx: SyncContext<'_>,
    server: &ServerState,
) -> (EntitySyncResult, EntitySyncResult, EntitySyncResult) {
    thread::scope(|scope| {
        let cart = scope.spawn(|| reconcile_isolated::<Cart>(ctx, server));
        let orders = scope.spawn(|| reconcile_isolated::<Orders>(ctx, server));
        let profile = scope.spawn(|| reconcile_isolated::<Profile>(ctx, server));
        (
            cart.join().unwrap_or_else(|_| panicked::<Cart>()),
            orders.join().unwrap_or_else(|_| panicked::<Orders>()),
            profile.join().unwrap_or_else(|_| panicked::<Profile>()),
        )
    })
}

fn panicked<E: SyncEntity>() -> EntitySyncResult {
    let mut pass = EntityPass::new(E::KIND);
    pass.advance(EntitySyncState::Failed);
    warn!(entity = %E::KIND, "reconciler panicked");
    EntitySyncResult::failed_with("reconciler panicked".into(), &pass)
}
