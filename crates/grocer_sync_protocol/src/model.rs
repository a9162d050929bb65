//! Domain payloads carried by snapshots.

use serde::{Deserialize, Serialize};

/// Cart contents, in the order the shopper added them.
pub type CartItems = Vec<CartItem>;

/// Order history, newest first as served by the backend.
pub type OrderList = Vec<Order>;

/// A line in the cart or in a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog product ID.
    pub product_id: String,
    /// Display name at the time the item was added.
    pub name: String,
    /// Number of units.
    pub quantity: u32,
    /// Price per unit in minor currency units.
    pub unit_price_cents: i64,
}

impl CartItem {
    /// Creates a cart line.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price_cents: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_price_cents,
        }
    }

    /// Line total in minor currency units, saturating at the `i64` bounds.
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents.saturating_mul(i64::from(self.quantity))
    }
}

/// Lifecycle of an order. Advanced by payment and driver assignment on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Pending,
    /// Payment captured.
    Paid,
    /// A driver has been assigned.
    Assigned,
    /// On its way to the customer.
    OutForDelivery,
    /// Handed over.
    Delivered,
    /// Cancelled by the shopper or the store.
    Cancelled,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Backend order ID.
    pub order_id: String,
    /// Current status.
    pub status: OrderStatus,
    /// Ordered lines.
    pub items: Vec<CartItem>,
    /// Order total in minor currency units.
    pub total_cents: i64,
    /// When the order was placed, as reported by the server.
    pub placed_at: String,
}

/// A delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street and number.
    pub line1: String,
    /// Apartment, floor, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    /// City.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
}

/// The user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    /// Auth user ID.
    pub user_id: String,
    /// Full name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Default delivery address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_address: Option<Address>,
}
