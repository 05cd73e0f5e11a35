//! The stock store and the delta plan that drives every inventory mutation.
//!
//! State-changing operations never decrement and increment rows imperatively.
//! They build a declarative plan of signed [`StockDelta`]s, net it per
//! (product, location) key, and hand it to [`apply_deltas`] inside their own
//! transaction. Validation happens against the netted result, so a rewritten
//! transfer sees its original reservation as already returned.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::stock_level::{self, Entity as StockLevels};
use crate::errors::ServiceError;
use crate::location::LocationRef;

/// One signed movement of a product at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: Uuid,
    pub location: LocationRef,
    pub delta: i64,
}

/// Plan for moving `items` (product, quantity pairs) from `source` to
/// `destination`: a decrement at the source and a matching increment at the
/// destination per line.
pub fn transfer_deltas(
    source: LocationRef,
    destination: LocationRef,
    items: &[(Uuid, i32)],
) -> Vec<StockDelta> {
    let mut plan = Vec::with_capacity(items.len() * 2);
    for &(product_id, quantity) in items {
        plan.push(StockDelta {
            product_id,
            location: source,
            delta: -i64::from(quantity),
        });
        plan.push(StockDelta {
            product_id,
            location: destination,
            delta: i64::from(quantity),
        });
    }
    plan
}

/// The plan that undoes `plan` exactly.
pub fn negated(plan: impl IntoIterator<Item = StockDelta>) -> Vec<StockDelta> {
    plan.into_iter()
        .map(|d| StockDelta {
            delta: -d.delta,
            ..d
        })
        .collect()
}

/// Plan for undoing a previously applied transfer.
pub fn reversal_deltas(
    source: LocationRef,
    destination: LocationRef,
    items: &[(Uuid, i32)],
) -> Vec<StockDelta> {
    negated(transfer_deltas(source, destination, items))
}

/// Nets a plan per (product, location) key, preserving first-touch order and
/// dropping keys that cancel out.
pub fn net_deltas(plan: impl IntoIterator<Item = StockDelta>) -> Vec<StockDelta> {
    let mut netted: Vec<StockDelta> = Vec::new();
    for delta in plan {
        match netted
            .iter_mut()
            .find(|n| n.product_id == delta.product_id && n.location == delta.location)
        {
            Some(existing) => existing.delta += delta.delta,
            None => netted.push(delta),
        }
    }
    netted.retain(|n| n.delta != 0);
    netted
}

/// Quantity on hand for one product at one location. Absence means zero.
pub async fn quantity_on_hand<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: LocationRef,
) -> Result<i32, ServiceError> {
    let row = find_level(conn, product_id, location).await?;
    Ok(row.map(|r| r.quantity).unwrap_or(0))
}

/// Applies a plan inside the caller's transaction context.
///
/// The plan is netted first; each netted entry is then checked against the
/// current row and applied, creating the row lazily on first receipt. Any
/// shortfall aborts with [`ServiceError::InsufficientStock`] before the
/// caller commits, so a multi-line operation is all-or-nothing.
pub async fn apply_deltas<C: ConnectionTrait>(
    conn: &C,
    plan: Vec<StockDelta>,
) -> Result<(), ServiceError> {
    for entry in net_deltas(plan) {
        apply_one(conn, entry).await?;
    }
    Ok(())
}

async fn apply_one<C: ConnectionTrait>(conn: &C, entry: StockDelta) -> Result<(), ServiceError> {
    let existing = find_level(conn, entry.product_id, entry.location).await?;

    match existing {
        Some(row) => {
            let new_quantity = i64::from(row.quantity) + entry.delta;
            if new_quantity < 0 {
                return Err(ServiceError::InsufficientStock {
                    product_id: entry.product_id,
                    location: entry.location,
                    requested: -entry.delta,
                    available: i64::from(row.quantity),
                });
            }
            let new_quantity = i32::try_from(new_quantity).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Stock quantity overflow for product {}",
                    entry.product_id
                ))
            })?;

            debug!(
                product_id = %entry.product_id,
                location = %entry.location,
                delta = entry.delta,
                new_quantity,
                "Applying stock delta"
            );

            // Compare-and-swap on `version`: a concurrent writer between our
            // read and this update leaves rows_affected at zero.
            let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
            let result = StockLevels::update_many()
                .col_expr(stock_level::Column::Quantity, Expr::value(new_quantity))
                .col_expr(stock_level::Column::Version, Expr::value(row.version + 1))
                .col_expr(stock_level::Column::UpdatedAt, Expr::value(now))
                .filter(stock_level::Column::Id.eq(row.id))
                .filter(stock_level::Column::Version.eq(row.version))
                .exec(conn)
                .await
                .map_err(ServiceError::db_error)?;

            if result.rows_affected == 0 {
                return Err(ServiceError::Conflict(format!(
                    "Stock for product {} at {} was modified concurrently",
                    entry.product_id, entry.location
                )));
            }
        }
        None => {
            if entry.delta < 0 {
                return Err(ServiceError::InsufficientStock {
                    product_id: entry.product_id,
                    location: entry.location,
                    requested: -entry.delta,
                    available: 0,
                });
            }
            let quantity = i32::try_from(entry.delta).map_err(|_| {
                ServiceError::ValidationError(format!(
                    "Stock quantity overflow for product {}",
                    entry.product_id
                ))
            })?;

            debug!(
                product_id = %entry.product_id,
                location = %entry.location,
                quantity,
                "Creating stock level on first receipt"
            );

            let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
            stock_level::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(entry.product_id),
                location_type: Set(entry.location.kind().to_string()),
                location_id: Set(entry.location.id()),
                quantity: Set(quantity),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;
        }
    }

    Ok(())
}

async fn find_level<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    location: LocationRef,
) -> Result<Option<stock_level::Model>, ServiceError> {
    StockLevels::find()
        .filter(stock_level::Column::ProductId.eq(product_id))
        .filter(stock_level::Column::LocationType.eq(location.kind().to_string()))
        .filter(stock_level::Column::LocationId.eq(location.id()))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wh() -> LocationRef {
        LocationRef::Warehouse(Uuid::from_u128(1))
    }

    fn shop() -> LocationRef {
        LocationRef::Shop(Uuid::from_u128(2))
    }

    #[test]
    fn transfer_plan_pairs_decrement_with_increment() {
        let p = Uuid::from_u128(10);
        let plan = transfer_deltas(wh(), shop(), &[(p, 6)]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].delta, -6);
        assert_eq!(plan[0].location, wh());
        assert_eq!(plan[1].delta, 6);
        assert_eq!(plan[1].location, shop());
    }

    #[test]
    fn per_product_deltas_sum_to_zero() {
        let a = Uuid::from_u128(10);
        let b = Uuid::from_u128(11);
        let plan = transfer_deltas(wh(), shop(), &[(a, 3), (b, 7), (a, 2)]);
        let sum_a: i64 = plan.iter().filter(|d| d.product_id == a).map(|d| d.delta).sum();
        let sum_b: i64 = plan.iter().filter(|d| d.product_id == b).map(|d| d.delta).sum();
        assert_eq!(sum_a, 0);
        assert_eq!(sum_b, 0);
    }

    #[test]
    fn reversal_cancels_transfer_exactly() {
        let p = Uuid::from_u128(10);
        let items = [(p, 6)];
        let mut combined = transfer_deltas(wh(), shop(), &items);
        combined.extend(reversal_deltas(wh(), shop(), &items));
        assert!(net_deltas(combined).is_empty());
    }

    #[test]
    fn netting_merges_duplicate_lines() {
        let p = Uuid::from_u128(10);
        let plan = transfer_deltas(wh(), shop(), &[(p, 3), (p, 4)]);
        let netted = net_deltas(plan);
        assert_eq!(netted.len(), 2);
        assert_eq!(netted[0], StockDelta { product_id: p, location: wh(), delta: -7 });
        assert_eq!(netted[1], StockDelta { product_id: p, location: shop(), delta: 7 });
    }

    #[test]
    fn rewrite_plan_frees_the_original_reservation() {
        // 6 units reserved at the warehouse, rewritten to 8: the net demand
        // on the warehouse is only the 2 extra units.
        let p = Uuid::from_u128(10);
        let mut plan = reversal_deltas(wh(), shop(), &[(p, 6)]);
        plan.extend(transfer_deltas(wh(), shop(), &[(p, 8)]));
        let netted = net_deltas(plan);
        assert_eq!(netted.len(), 2);
        assert!(netted.contains(&StockDelta { product_id: p, location: wh(), delta: -2 }));
        assert!(netted.contains(&StockDelta { product_id: p, location: shop(), delta: 2 }));
    }

    #[test]
    fn unchanged_rewrite_nets_to_nothing() {
        let p = Uuid::from_u128(10);
        let mut plan = reversal_deltas(wh(), shop(), &[(p, 5)]);
        plan.extend(transfer_deltas(wh(), shop(), &[(p, 5)]));
        assert!(net_deltas(plan).is_empty());
    }
}
