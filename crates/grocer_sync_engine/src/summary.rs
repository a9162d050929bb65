//! Results of a reconciliation pass.

use crate::error::SyncError;
use crate::reconcile::{EntityPass, EntitySyncState};
use grocer_sync_protocol::{EntityKind, ReconcileOutcome, Timestamp};
use serde::Serialize;

/// Result of reconciling one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySyncResult {
    /// Whether the entity finished without error.
    pub synced: bool,
    /// The reconciliation outcome; `None` when the entity failed.
    pub outcome: Option<ReconcileOutcome>,
    /// Error message when the entity failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final state of the entity's pass.
    pub state: EntitySyncState,
    /// Whether the local copy was offered to the server.
    pub pushed: bool,
    /// Whether the remote copy was written locally.
    pub pulled: bool,
}

impl EntitySyncResult {
    /// A successful result.
    pub fn synced(outcome: ReconcileOutcome, pass: &EntityPass) -> Self {
        Self {
            synced: true,
            outcome: Some(outcome),
            error: None,
            state: pass.state,
            pushed: pass.pushed,
            pulled: pass.pulled,
        }
    }

    /// A failed result.
    pub fn failed(error: &SyncError, pass: &EntityPass) -> Self {
        Self::failed_with(error.to_string(), pass)
    }

    pub(crate) fn failed_with(message: String, pass: &EntityPass) -> Self {
        Self {
            synced: false,
            outcome: None,
            error: Some(message),
            state: pass.state,
            pushed: pass.pushed,
            pulled: pass.pulled,
        }
    }
}

/// Aggregate result of one full reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    /// Cart result.
    pub cart: EntitySyncResult,
    /// Orders result.
    pub orders: EntitySyncResult,
    /// Profile result.
    pub profile: EntitySyncResult,
    /// One `"<entity>: <message>"` line per failed entity.
    pub errors: Vec<String>,
    /// When the pass finished, by the device clock.
    pub timestamp: Timestamp,
}

impl SyncSummary {
    /// Builds a summary, collecting failed entities into `errors`.
    pub fn new(
        cart: EntitySyncResult,
        orders: EntitySyncResult,
        profile: EntitySyncResult,
        timestamp: Timestamp,
    ) -> Self {
        let errors = [
            (EntityKind::Cart, &cart),
            (EntityKind::Orders, &orders),
            (EntityKind::Profile, &profile),
        ]
        .into_iter()
        .filter_map(|(kind, result)| {
            result
                .error
                .as_ref()
                .map(|message| format!("{kind}: {message}"))
        })
        .collect();

        Self {
            cart,
            orders,
            profile,
            errors,
            timestamp,
        }
    }

    /// Returns the result for one entity.
    pub fn result(&self, kind: EntityKind) -> &EntitySyncResult {
        match kind {
            EntityKind::Cart => &self.cart,
            EntityKind::Orders => &self.orders,
            EntityKind::Profile => &self.profile,
        }
    }

    /// Whether the cart synced.
    pub fn cart_synced(&self) -> bool {
        self.cart.synced
    }

    /// Whether the orders synced.
    pub fn orders_synced(&self) -> bool {
        self.orders.synced
    }

    /// Whether the profile synced.
    pub fn profile_synced(&self) -> bool {
        self.profile.synced
    }

    /// The cart outcome, if it synced.
    pub fn cart_action(&self) -> Option<ReconcileOutcome> {
        self.cart.outcome
    }

    /// The orders outcome, if it synced.
    pub fn orders_action(&self) -> Option<ReconcileOutcome> {
        self.orders.outcome
    }

    /// The profile outcome, if it synced.
    pub fn profile_action(&self) -> Option<ReconcileOutcome> {
        self.profile.outcome
    }

    /// Returns true if every entity synced.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of entities that failed.
    pub fn failed_count(&self) -> usize {
        self.errors.len()
    }
}
