//! Property-based test generators using proptest.

use grocer_sync_protocol::{
    Address, CartItem, CartItems, Order, OrderStatus, ProfileData, Timestamp,
};
use proptest::prelude::*;

/// Strategy for generating cart lines.
pub fn cart_item_strategy() -> impl Strategy<Value = CartItem> {
    (
        "sku-[a-z0-9]{1,8}",
        "[A-Z][a-z]{1,12}( [A-Z][a-z]{1,8})?",
        1u32..20,
        0i64..10_000,
    )
        .prop_map(|(sku, name, quantity, price)| CartItem::new(sku, name, quantity, price))
}

/// Strategy for generating carts of up to `max_items` lines.
pub fn cart_strategy(max_items: usize) -> impl Strategy<Value = CartItems> {
    prop::collection::vec(cart_item_strategy(), 0..=max_items)
}

/// Strategy for generating order statuses.
pub fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::Paid),
        Just(OrderStatus::Assigned),
        Just(OrderStatus::OutForDelivery),
        Just(OrderStatus::Delivered),
        Just(OrderStatus::Cancelled),
    ]
}

/// Strategy for generating orders whose totals match their lines.
pub fn order_strategy() -> impl Strategy<Value = Order> {
    (
        "ord-[0-9]{1,6}",
        order_status_strategy(),
        prop::collection::vec(cart_item_strategy(), 1..5),
        numeric_timestamp_strategy(),
    )
        .prop_map(|(order_id, status, items, placed_at)| Order {
            order_id,
            status,
            total_cents: items.iter().map(CartItem::line_total_cents).sum(),
            items,
            placed_at: placed_at.to_string(),
        })
}

/// Strategy for generating profiles.
pub fn profile_strategy() -> impl Strategy<Value = ProfileData> {
    (
        "user-[0-9]{1,6}",
        "[A-Z][a-z]{1,10} [A-Z][a-z]{1,12}",
        "[a-z]{1,10}@example\\.com",
        proptest::option::of("\\+[0-9]{8,12}"),
        proptest::option::of(("[0-9]{1,3} [A-Z][a-z]{2,10} St", "[A-Z][a-z]{2,10}", "[0-9]{5}")),
    )
        .prop_map(|(user_id, full_name, email, phone, address)| ProfileData {
            user_id,
            full_name,
            email,
            phone,
            default_address: address.map(|(line1, city, postal_code)| Address {
                line1,
                line2: None,
                city,
                postal_code,
            }),
        })
}

/// Strategy for generating epoch-millisecond timestamps.
pub fn numeric_timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (0u64..4_102_444_800_000).prop_map(|ms| Timestamp::new(ms.to_string()))
}

/// Strategy for generating RFC 3339 timestamps between 2000 and 2099.
pub fn rfc3339_timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (2000u32..2100, 1u32..13, 1u32..29, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, minute, second)| {
            Timestamp::new(format!(
                "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
            ))
        },
    )
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn generated_orders_total_their_lines(order in order_strategy()) {
            let sum: i64 = order.items.iter().map(CartItem::line_total_cents).sum();
            prop_assert_eq!(order.total_cents, sum);
        }

        #[test]
        fn numeric_timestamps_parse(ts in numeric_timestamp_strategy()) {
            prop_assert!(ts.as_str().parse::<u64>().is_ok());
        }

        #[test]
        fn rfc3339_timestamps_are_never_empty(ts in rfc3339_timestamp_strategy()) {
            prop_assert!(!ts.is_empty());
            prop_assert!(ts.as_str().ends_with('Z'));
        }

        #[test]
        fn carts_respect_length_bound(cart in cart_strategy(4)) {
            prop_assert!(cart.len() <= 4);
        }
    }
}
