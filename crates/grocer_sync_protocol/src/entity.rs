//! Synchronizable entity kinds.

use crate::conflict::Authority;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three entities the client keeps in sync with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// The shopper's cart.
    Cart,
    /// Order history, mutated by payment and delivery processes server-side.
    Orders,
    /// The user's profile.
    Profile,
}

impl EntityKind {
    /// All entity kinds, in reconciliation order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Cart, EntityKind::Orders, EntityKind::Profile];

    /// Returns the lowercase tag used in logs and error entries.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Cart => "cart",
            EntityKind::Orders => "orders",
            EntityKind::Profile => "profile",
        }
    }

    /// Returns who has the final say when local and remote disagree.
    pub fn authority(&self) -> Authority {
        match self {
            EntityKind::Orders => Authority::Server,
            EntityKind::Cart | EntityKind::Profile => Authority::Negotiated,
        }
    }

    /// Returns true if the remote copy always wins for this entity.
    pub fn is_server_authoritative(&self) -> bool {
        self.authority() == Authority::Server
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
