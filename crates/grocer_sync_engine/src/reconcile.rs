//! Per-entity reconciliation.
//!
//! Each synchronizable entity implements [`SyncEntity`], which ties its
//! data type to the matching store accessors and payload variant. An
//! [`EntityReconciler`] then runs the same three-way decision for any
//! entity:
//!
//! 1. checksums match: nothing to do
//! 2. local is newer and the entity is negotiable: offer the local copy to
//!    the server and adopt its verdict without touching the local cache
//! 3. otherwise: overwrite the local cache with the remote copy

use crate::connectivity::ConnectivityGuard;
use crate::error::SyncResult;
use crate::retry::RetryExecutor;
use crate::store::LocalStateStore;
use crate::summary::EntitySyncResult;
use crate::transport::RemoteStateGateway;
use grocer_sync_protocol::{
    CartItems, EntityKind, EntityPayload, OrderList, ProfileData, ReconcileOutcome,
    ResolveConflictRequest, ResolveConflictResponse, ServerState, StateSnapshot, Timestamp,
};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Collaborators shared by every reconciler in a pass.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    /// Remote state service.
    pub gateway: &'a dyn RemoteStateGateway,
    /// Local cache.
    pub store: &'a dyn LocalStateStore,
    /// Connectivity check consulted before every network call.
    pub guard: &'a dyn ConnectivityGuard,
    /// Retry policy for network calls.
    pub retry: &'a RetryExecutor,
}

impl<'a> SyncContext<'a> {
    /// Fetches the full remote snapshot set, retrying transient failures.
    pub fn fetch_server_state(&self) -> SyncResult<ServerState> {
        self.guard.ensure_available()?;
        self.retry
            .run("fetch_server_state", || self.gateway.fetch_server_state())
    }

    /// Offers a local state to the server, retrying transient failures.
    pub fn resolve_conflict(
        &self,
        request: &ResolveConflictRequest,
    ) -> SyncResult<ResolveConflictResponse> {
        self.guard.ensure_available()?;
        self.retry
            .run("resolve_conflict", || self.gateway.resolve_conflict(request))
    }
}

/// An entity kept in sync between the local cache and the server.
pub trait SyncEntity {
    /// The entity's data.
    type Data: Serialize + Clone + Send + Sync;

    /// Which entity this is.
    const KIND: EntityKind;

    /// Reads the cached snapshot, if the entity has one.
    fn load(store: &dyn LocalStateStore) -> SyncResult<Option<StateSnapshot<Self::Data>>>;

    /// Overwrites the cached snapshot.
    fn save(store: &dyn LocalStateStore, data: Self::Data, updated_at: Timestamp)
        -> SyncResult<()>;

    /// The entity's snapshot within the server state.
    fn remote(state: &ServerState) -> &StateSnapshot<Self::Data>;

    /// Wraps data in the matching payload variant.
    fn into_payload(data: Self::Data) -> EntityPayload;
}

/// The shopping cart. Negotiated: a newer local cart is offered to the server.
#[derive(Debug, Clone, Copy)]
pub struct Cart;

/// The order history. Server-authoritative: always pulled.
#[derive(Debug, Clone, Copy)]
pub struct Orders;

/// The user profile. Negotiated, and may be absent locally.
#[derive(Debug, Clone, Copy)]
pub struct Profile;

impl SyncEntity for Cart {
    type Data = CartItems;
    const KIND: EntityKind = EntityKind::Cart;

    fn load(store: &dyn LocalStateStore) -> SyncResult<Option<StateSnapshot<CartItems>>> {
        store.get_cart_state().map(Some)
    }

    fn save(store: &dyn LocalStateStore, data: CartItems, updated_at: Timestamp) -> SyncResult<()> {
        store.save_cart_state(data, updated_at)
    }

    fn remote(state: &ServerState) -> &StateSnapshot<CartItems> {
        &state.cart
    }

    fn into_payload(data: CartItems) -> EntityPayload {
        EntityPayload::Cart(data)
    }
}

impl SyncEntity for Orders {
    type Data = OrderList;
    const KIND: EntityKind = EntityKind::Orders;

    fn load(store: &dyn LocalStateStore) -> SyncResult<Option<StateSnapshot<OrderList>>> {
        store.get_orders_state().map(Some)
    }

    fn save(store: &dyn LocalStateStore, data: OrderList, updated_at: Timestamp) -> SyncResult<()> {
        store.save_orders_state(data, updated_at)
    }

    fn remote(state: &ServerState) -> &StateSnapshot<OrderList> {
        &state.orders
    }

    fn into_payload(data: OrderList) -> EntityPayload {
        EntityPayload::Orders(data)
    }
}

impl SyncEntity for Profile {
    type Data = ProfileData;
    const KIND: EntityKind = EntityKind::Profile;

    fn load(store: &dyn LocalStateStore) -> SyncResult<Option<StateSnapshot<ProfileData>>> {
        store.get_profile_state()
    }

    fn save(
        store: &dyn LocalStateStore,
        data: ProfileData,
        updated_at: Timestamp,
    ) -> SyncResult<()> {
        store.save_profile_state(data, updated_at)
    }

    fn remote(state: &ServerState) -> &StateSnapshot<ProfileData> {
        &state.profile
    }

    fn into_payload(data: ProfileData) -> EntityPayload {
        EntityPayload::Profile(data)
    }
}

/// Where one entity is within a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySyncState {
    /// Not started.
    Idle,
    /// Waiting on the server's verdict for a pushed local state.
    Pushing,
    /// Writing the remote copy into the local cache.
    Pulling,
    /// Finished successfully.
    Synced,
    /// Finished with an error.
    Failed,
}

impl EntitySyncState {
    /// Returns true if moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: EntitySyncState) -> bool {
        use EntitySyncState::*;
        matches!(
            (self, next),
            (Idle, Pushing | Pulling | Synced | Failed)
                | (Pushing, Synced | Failed)
                | (Pulling, Synced | Failed)
        )
    }

    /// Returns true once the pass for this entity has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntitySyncState::Synced | EntitySyncState::Failed)
    }
}

/// Progress of one entity through a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPass {
    /// The entity being reconciled.
    pub kind: EntityKind,
    /// Current state.
    pub state: EntitySyncState,
    /// Whether the local copy was offered to the server.
    pub pushed: bool,
    /// Whether the remote copy was written locally.
    pub pulled: bool,
}

impl EntityPass {
    /// Starts a pass for `kind` in the idle state.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: EntitySyncState::Idle,
            pushed: false,
            pulled: false,
        }
    }

    /// Moves to `next`.
    pub fn advance(&mut self, next: EntitySyncState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(entity = %self.kind, from = ?self.state, to = ?next, "entity transition");
        self.state = next;
    }

    /// Marks the pass as failed, unless it already ended.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.advance(EntitySyncState::Failed);
        }
    }
}

/// Runs one reconciliation pass for entity `E`.
pub struct EntityReconciler<'a, E: SyncEntity> {
    ctx: SyncContext<'a>,
    _entity: PhantomData<E>,
}

impl<'a, E: SyncEntity> EntityReconciler<'a, E> {
    /// Creates a reconciler over the given collaborators.
    pub fn new(ctx: SyncContext<'a>) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }

    /// Loads the local copy, reconciles it against `server`, and reports
    /// the result. Never fails: errors are captured in the result.
    pub fn run(&self, server: &ServerState) -> EntitySyncResult {
        let mut pass = EntityPass::new(E::KIND);
        let outcome = E::load(self.ctx.store)
            .and_then(|local| self.reconcile(local.as_ref(), E::remote(server), &mut pass));

        match outcome {
            Ok(outcome) => EntitySyncResult::synced(outcome, &pass),
            Err(err) => {
                pass.fail();
                warn!(entity = %E::KIND, error = %err, "entity sync failed");
                EntitySyncResult::failed(&err, &pass)
            }
        }
    }

    /// Reconciles a local snapshot (if any) against the remote one.
    pub fn reconcile(
        &self,
        local: Option<&StateSnapshot<E::Data>>,
        remote: &StateSnapshot<E::Data>,
        pass: &mut EntityPass,
    ) -> SyncResult<ReconcileOutcome> {
        if let Some(local) = local {
            if local.matches(remote) {
                debug!(entity = %E::KIND, checksum = %remote.checksum, "already in sync");
                pass.advance(EntitySyncState::Synced);
                return Ok(ReconcileOutcome::NoConflict);
            }

            if !E::KIND.is_server_authoritative()
                && self
                    .ctx
                    .store
                    .is_local_newer(&local.updated_at, &remote.updated_at)
            {
                return self.push(local, pass);
            }
        }

        self.pull(remote, pass)
    }

    fn push(
        &self,
        local: &StateSnapshot<E::Data>,
        pass: &mut EntityPass,
    ) -> SyncResult<ReconcileOutcome> {
        pass.advance(EntitySyncState::Pushing);
        pass.pushed = true;

        let request = ResolveConflictRequest::new(
            E::into_payload(local.data.clone()),
            local.updated_at.clone(),
        );
        let response = self.ctx.resolve_conflict(&request)?;
        response.resolved_state.expect_kind(E::KIND)?;

        let outcome = ReconcileOutcome::from(response.action);
        debug!(
            entity = %E::KIND,
            action = ?response.action,
            server_timestamp = %response.timestamp,
            "server adjudicated local state"
        );
        pass.advance(EntitySyncState::Synced);
        Ok(outcome)
    }

    fn pull(
        &self,
        remote: &StateSnapshot<E::Data>,
        pass: &mut EntityPass,
    ) -> SyncResult<ReconcileOutcome> {
        pass.advance(EntitySyncState::Pulling);
        E::save(self.ctx.store, remote.data.clone(), remote.updated_at.clone())?;
        pass.pulled = true;
        pass.advance(EntitySyncState::Synced);
        Ok(ReconcileOutcome::ServerWins)
    }
}
