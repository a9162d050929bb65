//! Sample data and scenario builders.
//!
//! Every helper panics on failure; these are for tests only.

use grocer_sync_protocol::{
    Address, CartItem, CartItems, Order, OrderList, OrderStatus, ProfileData, ServerState,
    StateSnapshot, Timestamp,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A three-line cart.
pub fn sample_cart() -> CartItems {
    vec![
        CartItem::new("sku-apple", "Gala Apples", 6, 79),
        CartItem::new("sku-milk", "Whole Milk 1L", 2, 149),
        CartItem::new("sku-bread", "Sourdough Loaf", 1, 425),
    ]
}

/// A single-line cart, distinct from [`sample_cart`].
pub fn alternate_cart() -> CartItems {
    vec![CartItem::new("sku-coffee", "Ground Coffee", 1, 899)]
}

/// Two past orders, one delivered and one on its way.
pub fn sample_orders() -> OrderList {
    let delivered = vec![CartItem::new("sku-eggs", "Free Range Eggs", 1, 389)];
    let en_route = vec![
        CartItem::new("sku-rice", "Basmati Rice 2kg", 1, 649),
        CartItem::new("sku-oil", "Olive Oil 500ml", 1, 799),
    ];
    vec![
        Order {
            order_id: "ord-1001".into(),
            status: OrderStatus::Delivered,
            total_cents: total(&delivered),
            items: delivered,
            placed_at: "2024-01-03T09:15:00Z".into(),
        },
        Order {
            order_id: "ord-1002".into(),
            status: OrderStatus::OutForDelivery,
            total_cents: total(&en_route),
            items: en_route,
            placed_at: "2024-01-05T17:40:00Z".into(),
        },
    ]
}

/// A complete profile.
pub fn sample_profile() -> ProfileData {
    ProfileData {
        user_id: "user-42".into(),
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: Some("+44 20 7946 0000".into()),
        default_address: Some(Address {
            line1: "12 St James's Square".into(),
            line2: None,
            city: "London".into(),
            postal_code: "SW1Y 4JH".into(),
        }),
    }
}

/// [`sample_profile`] with a different name.
pub fn renamed_profile(full_name: &str) -> ProfileData {
    ProfileData {
        full_name: full_name.into(),
        ..sample_profile()
    }
}

fn total(items: &[CartItem]) -> i64 {
    items.iter().map(CartItem::line_total_cents).sum()
}

/// Creates a snapshot with its checksum computed.
pub fn snapshot<T: Serialize>(data: T, updated_at: impl Into<Timestamp>) -> StateSnapshot<T> {
    StateSnapshot::new(data, updated_at).expect("sample data serializes")
}

/// Builds a [`ServerState`], defaulting every entity to sample data at `"100"`.
#[derive(Debug, Clone)]
pub struct ServerStateBuilder {
    state: ServerState,
}

impl ServerStateBuilder {
    /// Starts from sample data stamped `"100"`.
    pub fn new() -> Self {
        Self {
            state: ServerState {
                cart: snapshot(sample_cart(), "100"),
                orders: snapshot(sample_orders(), "100"),
                profile: snapshot(sample_profile(), "100"),
            },
        }
    }

    /// Sets the cart.
    pub fn cart(mut self, items: CartItems, updated_at: &str) -> Self {
        self.state.cart = snapshot(items, updated_at);
        self
    }

    /// Sets the order history.
    pub fn orders(mut self, orders: OrderList, updated_at: &str) -> Self {
        self.state.orders = snapshot(orders, updated_at);
        self
    }

    /// Sets the profile.
    pub fn profile(mut self, profile: ProfileData, updated_at: &str) -> Self {
        self.state.profile = snapshot(profile, updated_at);
        self
    }

    /// Stamps every entity with `updated_at`, keeping the data.
    pub fn all_at(mut self, updated_at: &str) -> Self {
        self.state.cart.updated_at = Timestamp::new(updated_at);
        self.state.orders.updated_at = Timestamp::new(updated_at);
        self.state.profile.updated_at = Timestamp::new(updated_at);
        self
    }

    /// Finishes the state.
    pub fn build(self) -> ServerState {
        self.state
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A JSON file in a temporary directory, removed on drop.
pub struct TempStateFile {
    path: PathBuf,
    _dir: TempDir,
}

impl TempStateFile {
    /// Reserves a path; the file itself is not created.
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        Self {
            path: dir.path().join(name),
            _dir: dir,
        }
    }

    /// Creates the file with `contents`.
    pub fn with_contents(name: &str, contents: &str) -> Self {
        let file = Self::new(name);
        file.write(contents);
        file
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the file.
    pub fn write(&self, contents: &str) {
        fs::write(&self.path, contents).expect("write temp state file");
    }

    /// Reads the file.
    pub fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("read temp state file")
    }

    /// Reads and parses the file as JSON.
    pub fn read_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.read()).expect("temp state file holds JSON")
    }
}

/// Conflict scenarios that recur across tests.
pub mod scenarios {
    use super::*;

    /// Server cart at `"100"`; the client edited its cart offline at `"200"`.
    pub fn offline_cart_edit() -> (ServerState, StateSnapshot<CartItems>) {
        let server = ServerStateBuilder::new().build();
        (server, snapshot(alternate_cart(), "200"))
    }

    /// A fresh install: the server has a profile from `2024-01-01`, the
    /// client has none.
    pub fn fresh_install_profile() -> ServerState {
        ServerStateBuilder::new()
            .profile(sample_profile(), "2024-01-01")
            .build()
    }
}
