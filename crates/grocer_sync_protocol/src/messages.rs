//! Messages exchanged with the remote state service.

use crate::conflict::ConflictAction;
use crate::entity::EntityKind;
use crate::error::{ProtocolError, ProtocolResult};
use crate::model::{CartItems, OrderList, ProfileData};
use crate::snapshot::{Checksum, StateSnapshot, Timestamp};
use serde::{Deserialize, Serialize};

/// The server's authoritative snapshot of every synchronizable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    /// Cart snapshot.
    pub cart: StateSnapshot<CartItems>,
    /// Order history snapshot.
    pub orders: StateSnapshot<OrderList>,
    /// Profile snapshot.
    pub profile: StateSnapshot<ProfileData>,
}

impl ServerState {
    /// Returns the payload held for an entity.
    pub fn payload(&self, kind: EntityKind) -> EntityPayload {
        match kind {
            EntityKind::Cart => EntityPayload::Cart(self.cart.data.clone()),
            EntityKind::Orders => EntityPayload::Orders(self.orders.data.clone()),
            EntityKind::Profile => EntityPayload::Profile(self.profile.data.clone()),
        }
    }

    /// Returns the timestamp held for an entity.
    pub fn updated_at(&self, kind: EntityKind) -> &Timestamp {
        match kind {
            EntityKind::Cart => &self.cart.updated_at,
            EntityKind::Orders => &self.orders.updated_at,
            EntityKind::Profile => &self.profile.updated_at,
        }
    }

    /// Returns the checksum held for an entity.
    pub fn checksum(&self, kind: EntityKind) -> &Checksum {
        match kind {
            EntityKind::Cart => &self.cart.checksum,
            EntityKind::Orders => &self.orders.checksum,
            EntityKind::Profile => &self.profile.checksum,
        }
    }

    /// Replaces one entity's snapshot with a payload stamped at `updated_at`.
    ///
    /// The checksum is recomputed from the new data.
    pub fn replace(&mut self, payload: EntityPayload, updated_at: Timestamp) -> ProtocolResult<()> {
        match payload {
            EntityPayload::Cart(items) => self.cart = StateSnapshot::new(items, updated_at)?,
            EntityPayload::Orders(orders) => self.orders = StateSnapshot::new(orders, updated_at)?,
            EntityPayload::Profile(profile) => {
                self.profile = StateSnapshot::new(profile, updated_at)?
            }
        }
        Ok(())
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Serializes to pretty JSON.
    pub fn to_json_pretty(&self) -> ProtocolResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Deserializes from JSON.
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        serde_json::from_str(json).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// Entity data tagged with the entity it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "state", rename_all = "lowercase")]
pub enum EntityPayload {
    /// Cart contents.
    Cart(CartItems),
    /// Order history.
    Orders(OrderList),
    /// Profile data.
    Profile(ProfileData),
}

impl EntityPayload {
    /// Returns the entity this payload belongs to.
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityPayload::Cart(_) => EntityKind::Cart,
            EntityPayload::Orders(_) => EntityKind::Orders,
            EntityPayload::Profile(_) => EntityKind::Profile,
        }
    }

    /// Computes the checksum of the inner data.
    pub fn checksum(&self) -> ProtocolResult<Checksum> {
        match self {
            EntityPayload::Cart(items) => Checksum::of(items),
            EntityPayload::Orders(orders) => Checksum::of(orders),
            EntityPayload::Profile(profile) => Checksum::of(profile),
        }
    }

    /// Fails unless this payload belongs to `expected`.
    pub fn expect_kind(&self, expected: EntityKind) -> ProtocolResult<()> {
        let actual = self.kind();
        if actual == expected {
            Ok(())
        } else {
            Err(ProtocolError::PayloadMismatch { expected, actual })
        }
    }
}

/// A locally newer state offered to the server for adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConflictRequest {
    /// Local data, tagged by entity.
    pub local_state: EntityPayload,
    /// Local `updated_at` of that data.
    pub local_timestamp: Timestamp,
}

impl ResolveConflictRequest {
    /// Creates a request.
    pub fn new(local_state: EntityPayload, local_timestamp: impl Into<Timestamp>) -> Self {
        Self {
            local_state,
            local_timestamp: local_timestamp.into(),
        }
    }

    /// Returns the entity being adjudicated.
    pub fn entity(&self) -> EntityKind {
        self.local_state.kind()
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Deserializes from JSON.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}

/// The server's verdict on a [`ResolveConflictRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConflictResponse {
    /// Which side won.
    pub action: ConflictAction,
    /// The state the server now holds.
    pub resolved_state: EntityPayload,
    /// The server's `updated_at` for the resolved state.
    pub timestamp: Timestamp,
}

impl ResolveConflictResponse {
    /// Creates a response.
    pub fn new(
        action: ConflictAction,
        resolved_state: EntityPayload,
        timestamp: impl Into<Timestamp>,
    ) -> Self {
        Self {
            action,
            resolved_state,
            timestamp: timestamp.into(),
        }
    }

    /// Serializes to JSON.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Deserializes from JSON.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
