//! Local state store abstraction.
//!
//! The store is the persistence boundary for the client's cached copy of
//! each entity. Saves are whole-value overwrites; a snapshot is never
//! merged field by field.

use crate::error::{SyncError, SyncResult};
use grocer_sync_protocol::{
    CartItems, EntityKind, OrderList, ProfileData, StateSnapshot, Timestamp,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// The persistence boundary for cached entity snapshots.
pub trait LocalStateStore: Send + Sync {
    /// Reads the cached cart. A never-written cart has an empty timestamp and checksum.
    fn get_cart_state(&self) -> SyncResult<StateSnapshot<CartItems>>;

    /// Reads the cached order history. Never-written history has an empty timestamp and checksum.
    fn get_orders_state(&self) -> SyncResult<StateSnapshot<OrderList>>;

    /// Reads the cached profile, if any.
    fn get_profile_state(&self) -> SyncResult<Option<StateSnapshot<ProfileData>>>;

    /// Overwrites the cached cart.
    fn save_cart_state(&self, items: CartItems, updated_at: Timestamp) -> SyncResult<()>;

    /// Overwrites the cached order history.
    fn save_orders_state(&self, orders: OrderList, updated_at: Timestamp) -> SyncResult<()>;

    /// Overwrites the cached profile.
    fn save_profile_state(&self, profile: ProfileData, updated_at: Timestamp) -> SyncResult<()>;

    /// Returns true if the local timestamp is strictly newer than the remote one.
    fn is_local_newer(&self, local: &Timestamp, remote: &Timestamp) -> bool {
        local.is_newer_than(remote)
    }

    /// Current time by the device clock. Stamps sync summaries, never entities.
    fn current_timestamp(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<S: LocalStateStore + ?Sized> LocalStateStore for Arc<S> {
    fn get_cart_state(&self) -> SyncResult<StateSnapshot<CartItems>> {
        (**self).get_cart_state()
    }

    fn get_orders_state(&self) -> SyncResult<StateSnapshot<OrderList>> {
        (**self).get_orders_state()
    }

    fn get_profile_state(&self) -> SyncResult<Option<StateSnapshot<ProfileData>>> {
        (**self).get_profile_state()
    }

    fn save_cart_state(&self, items: CartItems, updated_at: Timestamp) -> SyncResult<()> {
        (**self).save_cart_state(items, updated_at)
    }

    fn save_orders_state(&self, orders: OrderList, updated_at: Timestamp) -> SyncResult<()> {
        (**self).save_orders_state(orders, updated_at)
    }

    fn save_profile_state(&self, profile: ProfileData, updated_at: Timestamp) -> SyncResult<()> {
        (**self).save_profile_state(profile, updated_at)
    }

    fn is_local_newer(&self, local: &Timestamp, remote: &Timestamp) -> bool {
        (**self).is_local_newer(local, remote)
    }

    fn current_timestamp(&self) -> Timestamp {
        (**self).current_timestamp()
    }
}

/// Everything the client caches, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalState {
    /// Cached cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<StateSnapshot<CartItems>>,
    /// Cached order history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<StateSnapshot<OrderList>>,
    /// Cached profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<StateSnapshot<ProfileData>>,
}

impl LocalState {
    /// The cart snapshot, or an empty never-synced one.
    pub fn cart_snapshot(&self) -> StateSnapshot<CartItems> {
        self.cart.clone().unwrap_or_else(never_written)
    }

    /// The orders snapshot, or an empty never-synced one.
    pub fn orders_snapshot(&self) -> StateSnapshot<OrderList> {
        self.orders.clone().unwrap_or_else(never_written)
    }

    /// Returns the timestamp stored for an entity, if any.
    pub fn updated_at(&self, kind: EntityKind) -> Option<&Timestamp> {
        match kind {
            EntityKind::Cart => self.cart.as_ref().map(|s| &s.updated_at),
            EntityKind::Orders => self.orders.as_ref().map(|s| &s.updated_at),
            EntityKind::Profile => self.profile.as_ref().map(|s| &s.updated_at),
        }
    }

    /// Serializes to pretty JSON.
    pub fn to_json_pretty(&self) -> SyncResult<String> {
        serde_json::to_string_pretty(self).map_err(SyncError::local_store)
    }

    /// Deserializes from JSON.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        serde_json::from_str(json).map_err(SyncError::local_store)
    }
}

fn never_written<T: Default>() -> StateSnapshot<T> {
    StateSnapshot::from_parts(T::default(), Timestamp::empty(), Default::default())
}

/// An in-memory store for tests and ephemeral sessions.
///
/// Counts saves per entity and can be told to fail reads or writes for
/// one entity, to exercise partial-failure handling.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<LocalState>,
    saves: Mutex<HashMap<EntityKind, usize>>,
    failing_reads: Mutex<HashMap<EntityKind, String>>,
    failing_writes: Mutex<HashMap<EntityKind, String>>,
    clock: Mutex<Option<Timestamp>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `state`.
    pub fn with_state(state: LocalState) -> Self {
        let store = Self::new();
        *store.state.write() = state;
        store
    }

    /// Returns a copy of everything cached.
    pub fn state(&self) -> LocalState {
        self.state.read().clone()
    }

    /// Number of saves performed for an entity.
    pub fn saves(&self, kind: EntityKind) -> usize {
        self.saves.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Number of saves performed across all entities.
    pub fn total_saves(&self) -> usize {
        self.saves.lock().values().sum()
    }

    /// Makes reads of an entity fail with a local store error.
    pub fn fail_reads(&self, kind: EntityKind, message: impl Into<String>) {
        self.failing_reads.lock().insert(kind, message.into());
    }

    /// Makes writes of an entity fail with a local store error.
    pub fn fail_writes(&self, kind: EntityKind, message: impl Into<String>) {
        self.failing_writes.lock().insert(kind, message.into());
    }

    /// Pins the value returned by [`LocalStateStore::current_timestamp`].
    pub fn set_clock(&self, now: impl Into<Timestamp>) {
        *self.clock.lock() = Some(now.into());
    }

    fn check_read(&self, kind: EntityKind) -> SyncResult<()> {
        match self.failing_reads.lock().get(&kind) {
            Some(message) => Err(SyncError::LocalStore(message.clone())),
            None => Ok(()),
        }
    }

    fn check_write(&self, kind: EntityKind) -> SyncResult<()> {
        match self.failing_writes.lock().get(&kind) {
            Some(message) => Err(SyncError::LocalStore(message.clone())),
            None => Ok(()),
        }
    }

    fn record_save(&self, kind: EntityKind) {
        *self.saves.lock().entry(kind).or_insert(0) += 1;
    }
}

impl LocalStateStore for MemoryStateStore {
    fn get_cart_state(&self) -> SyncResult<StateSnapshot<CartItems>> {
        self.check_read(EntityKind::Cart)?;
        Ok(self.state.read().cart_snapshot())
    }

    fn get_orders_state(&self) -> SyncResult<StateSnapshot<OrderList>> {
        self.check_read(EntityKind::Orders)?;
        Ok(self.state.read().orders_snapshot())
    }

    fn get_profile_state(&self) -> SyncResult<Option<StateSnapshot<ProfileData>>> {
        self.check_read(EntityKind::Profile)?;
        Ok(self.state.read().profile.clone())
    }

    fn save_cart_state(&self, items: CartItems, updated_at: Timestamp) -> SyncResult<()> {
        self.check_write(EntityKind::Cart)?;
        let snapshot = StateSnapshot::new(items, updated_at)?;
        self.state.write().cart = Some(snapshot);
        self.record_save(EntityKind::Cart);
        Ok(())
    }

    fn save_orders_state(&self, orders: OrderList, updated_at: Timestamp) -> SyncResult<()> {
        self.check_write(EntityKind::Orders)?;
        let snapshot = StateSnapshot::new(orders, updated_at)?;
        self.state.write().orders = Some(snapshot);
        self.record_save(EntityKind::Orders);
        Ok(())
    }

    fn save_profile_state(&self, profile: ProfileData, updated_at: Timestamp) -> SyncResult<()> {
        self.check_write(EntityKind::Profile)?;
        let snapshot = StateSnapshot::new(profile, updated_at)?;
        self.state.write().profile = Some(snapshot);
        self.record_save(EntityKind::Profile);
        Ok(())
    }

    fn current_timestamp(&self) -> Timestamp {
        self.clock.lock().clone().unwrap_or_else(Timestamp::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_sync_protocol::CartItem;

    #[test]
    fn never_written_cart_has_no_checksum() {
        let store = MemoryStateStore::new();
        let cart = store.get_cart_state().unwrap();
        assert!(cart.data.is_empty());
        assert!(cart.updated_at.is_empty());
        assert!(cart.checksum.is_empty());
        assert!(store.get_profile_state().unwrap().is_none());
    }

    #[test]
    fn save_overwrites_and_checksums() {
        let store = MemoryStateStore::new();
        let items = vec![CartItem::new("sku-1", "Rice", 1, 450)];

        store
            .save_cart_state(items.clone(), Timestamp::new("10"))
            .unwrap();
        store
            .save_cart_state(items.clone(), Timestamp::new("20"))
            .unwrap();

        let cart = store.get_cart_state().unwrap();
        assert_eq!(cart.data, items);
        assert_eq!(cart.updated_at, Timestamp::new("20"));
        assert!(cart.verify().unwrap());
        assert_eq!(store.saves(EntityKind::Cart), 2);
        assert_eq!(store.total_saves(), 2);
    }

    #[test]
    fn injected_failures() {
        let store = MemoryStateStore::new();
        store.fail_reads(EntityKind::Orders, "corrupt cache");
        store.fail_writes(EntityKind::Profile, "disk full");

        assert_eq!(
            store.get_orders_state().unwrap_err(),
            SyncError::LocalStore("corrupt cache".into())
        );
        assert!(store.get_cart_state().is_ok());

        let profile = ProfileData {
            user_id: "u".into(),
            full_name: "n".into(),
            email: "e".into(),
            phone: None,
            default_address: None,
        };
        assert!(store
            .save_profile_state(profile, Timestamp::new("1"))
            .is_err());
        assert_eq!(store.saves(EntityKind::Profile), 0);
    }

    #[test]
    fn pinned_clock() {
        let store = MemoryStateStore::new();
        store.set_clock("2024-06-01T12:00:00Z");
        assert_eq!(store.current_timestamp().as_str(), "2024-06-01T12:00:00Z");
    }

    #[test]
    fn is_local_newer_uses_timestamp_heuristic() {
        let store = MemoryStateStore::new();
        assert!(store.is_local_newer(&Timestamp::new("100"), &Timestamp::new("50")));
        assert!(!store.is_local_newer(&Timestamp::new("50"), &Timestamp::new("100")));
        assert!(!store.is_local_newer(&Timestamp::empty(), &Timestamp::new("1")));
    }

    #[test]
    fn local_state_json() {
        let state = LocalState {
            cart: Some(StateSnapshot::new(Vec::new(), "5").unwrap()),
            ..Default::default()
        };

        let json = state.to_json_pretty().unwrap();
        assert!(!json.contains("profile"));
        assert_eq!(LocalState::from_json(&json).unwrap(), state);
        assert_eq!(state.updated_at(EntityKind::Cart), Some(&Timestamp::new("5")));
        assert_eq!(state.updated_at(EntityKind::Orders), None);
    }
}
