//! Property-based tests for the stock-delta planning core.
//!
//! The plan functions are pure, so proptest can sweep them broadly: every
//! transfer plan conserves stock per product, reversal is exact negation,
//! and netting never changes what a plan adds up to.

use std::collections::HashMap;

use proptest::prelude::*;
use uuid::Uuid;

use opsboard_api::location::LocationRef;
use opsboard_api::services::stock::{
    negated, net_deltas, reversal_deltas, transfer_deltas, StockDelta,
};

// Strategies draw from small pools so keys collide often; collisions are
// where netting has to do real work.
fn product_strategy() -> impl Strategy<Value = Uuid> {
    (1u128..6).prop_map(Uuid::from_u128)
}

fn location_strategy() -> impl Strategy<Value = LocationRef> {
    prop_oneof![
        (100u128..103).prop_map(|i| LocationRef::Warehouse(Uuid::from_u128(i))),
        (200u128..203).prop_map(|i| LocationRef::Shop(Uuid::from_u128(i))),
    ]
}

fn endpoints_strategy() -> impl Strategy<Value = (LocationRef, LocationRef)> {
    (location_strategy(), location_strategy()).prop_filter(
        "source and destination must differ",
        |(source, destination)| source != destination,
    )
}

fn items_strategy() -> impl Strategy<Value = Vec<(Uuid, i32)>> {
    prop::collection::vec((product_strategy(), 1i32..1_000), 1..8)
}

fn key_sums(plan: &[StockDelta]) -> HashMap<(Uuid, LocationRef), i64> {
    let mut sums = HashMap::new();
    for delta in plan {
        *sums.entry((delta.product_id, delta.location)).or_insert(0) += delta.delta;
    }
    sums.retain(|_, v| *v != 0);
    sums
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn transfer_plans_conserve_stock_per_product(
        (source, destination) in endpoints_strategy(),
        items in items_strategy(),
    ) {
        let plan = transfer_deltas(source, destination, &items);
        let mut per_product: HashMap<Uuid, i64> = HashMap::new();
        for delta in &plan {
            *per_product.entry(delta.product_id).or_insert(0) += delta.delta;
        }
        for (product, sum) in per_product {
            prop_assert_eq!(sum, 0, "product {} leaked stock", product);
        }
    }

    #[test]
    fn reversal_cancels_the_transfer(
        (source, destination) in endpoints_strategy(),
        items in items_strategy(),
    ) {
        let mut combined = transfer_deltas(source, destination, &items);
        combined.extend(reversal_deltas(source, destination, &items));
        prop_assert!(net_deltas(combined).is_empty());
    }

    #[test]
    fn negation_is_an_involution(
        (source, destination) in endpoints_strategy(),
        items in items_strategy(),
    ) {
        let plan = transfer_deltas(source, destination, &items);
        prop_assert_eq!(negated(negated(plan.clone())), plan);
    }

    #[test]
    fn netting_preserves_key_sums(
        (source, destination) in endpoints_strategy(),
        items in items_strategy(),
    ) {
        let plan = transfer_deltas(source, destination, &items);
        let netted = net_deltas(plan.clone());
        prop_assert_eq!(key_sums(&plan), key_sums(&netted));
    }

    #[test]
    fn netted_plans_have_unique_nonzero_keys(
        (source, destination) in endpoints_strategy(),
        items in items_strategy(),
    ) {
        let netted = net_deltas(transfer_deltas(source, destination, &items));
        for (i, a) in netted.iter().enumerate() {
            prop_assert!(a.delta != 0);
            for b in netted.iter().skip(i + 1) {
                prop_assert!(
                    a.product_id != b.product_id || a.location != b.location,
                    "duplicate key in netted plan"
                );
            }
        }
    }

    #[test]
    fn rewrite_plan_equals_new_minus_old(
        (source, destination) in endpoints_strategy(),
        old_items in items_strategy(),
        new_items in items_strategy(),
    ) {
        // The plan used by the update path...
        let mut rewrite = reversal_deltas(source, destination, &old_items);
        rewrite.extend(transfer_deltas(source, destination, &new_items));

        // ...must sum to exactly (new transfer) - (old transfer) per key.
        let mut expected = transfer_deltas(source, destination, &new_items);
        expected.extend(negated(transfer_deltas(source, destination, &old_items)));

        prop_assert_eq!(key_sums(&rewrite), key_sums(&expected));
    }
}
