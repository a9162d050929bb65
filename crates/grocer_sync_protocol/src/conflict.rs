//! Conflict adjudication outcomes.

use serde::{Deserialize, Serialize};

/// Who decides the winner when local and remote copies of an entity diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// The remote copy always wins; local state is never pushed.
    Server,
    /// A locally newer copy is offered to the server, which adjudicates.
    Negotiated,
}

/// The server's verdict on a pushed local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictAction {
    /// Both sides already agree.
    NoConflict,
    /// The server kept its own copy.
    ServerWins,
    /// The server accepted the local copy.
    LocalWins,
}

/// Result of one reconciliation pass for a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileOutcome {
    /// Checksums matched, or the server reported no conflict.
    NoConflict,
    /// The remote copy is authoritative for this pass.
    ServerWins,
    /// The server confirmed the local copy as the winner.
    LocalWinsConfirmed,
}

impl From<ConflictAction> for ReconcileOutcome {
    fn from(action: ConflictAction) -> Self {
        match action {
            ConflictAction::NoConflict => ReconcileOutcome::NoConflict,
            ConflictAction::ServerWins => ReconcileOutcome::ServerWins,
            ConflictAction::LocalWins => ReconcileOutcome::LocalWinsConfirmed,
        }
    }
}
