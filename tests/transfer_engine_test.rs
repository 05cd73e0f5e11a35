mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

use opsboard_api::commands::transfers::{CreateTransferCommand, TransferLine, UpdateTransferCommand};
use opsboard_api::entities::{transfer, transfer_item};
use opsboard_api::errors::ServiceError;
use opsboard_api::location::LocationRef;
use opsboard_api::services::stock::{self, StockDelta};

use common::{quantity_at, seed_product, seed_shop, seed_stock, seed_warehouse, TestContext};

fn line(product_id: Uuid, quantity: i32) -> TransferLine {
    TransferLine {
        product_id,
        quantity,
    }
}

#[tokio::test]
async fn create_moves_stock_between_locations() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .expect("transfer should succeed");

    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 4);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 6);

    assert_eq!(record.transfer.status, "completed");
    assert_eq!(record.transfer.source_id, wh.id);
    assert_eq!(record.transfer.destination_id, shop.id);
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.items[0].quantity, 6);
    assert_eq!(record.items[0].product_id, product.id);
}

#[tokio::test]
async fn insufficient_stock_leaves_state_untouched() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 3).await;

    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 5)],
        })
        .await
        .unwrap_err();

    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            requested: 5,
            available: 3,
            ..
        }
    );

    // Nothing moved, nothing recorded
    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 3);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 0);
    let transfers = transfer::Entity::find().all(&*ctx.db).await.unwrap();
    assert!(transfers.is_empty());
}

#[tokio::test]
async fn multi_item_transfer_is_all_or_nothing() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let plenty = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;
    let scarce = seed_product(&ctx.db, "DESK-002", dec!(40.00), dec!(89.00)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, plenty.id, source, 10).await;
    seed_stock(&ctx.db, scarce.id, source, 2).await;

    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(plenty.id, 5), line(scarce.id, 5)],
        })
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock { .. });

    // The valid line must not have been applied either
    assert_eq!(quantity_at(&ctx.db, plenty.id, source).await, 10);
    assert_eq!(quantity_at(&ctx.db, plenty.id, destination).await, 0);
    assert_eq!(quantity_at(&ctx.db, scarce.id, source).await, 2);
    let transfers = transfer::Entity::find().all(&*ctx.db).await.unwrap();
    assert!(transfers.is_empty());
}

#[tokio::test]
async fn delete_restores_previous_state() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    ctx.services
        .transfers
        .delete_transfer(record.transfer.id)
        .await
        .expect("delete should succeed");

    // Round-trip identity: both balances are back where they started
    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 10);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 0);

    // Header and items are gone
    let header = transfer::Entity::find_by_id(record.transfer.id)
        .one(&*ctx.db)
        .await
        .unwrap();
    assert!(header.is_none());
    let items = transfer_item::Entity::find().all(&*ctx.db).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn delete_fails_when_destination_stock_was_consumed() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    // A sale at the shop consumes 5 of the transferred 6
    stock::apply_deltas(
        &*ctx.db,
        vec![StockDelta {
            product_id: product.id,
            location: destination,
            delta: -5,
        }],
    )
    .await
    .unwrap();

    let err = ctx
        .services
        .transfers
        .delete_transfer(record.transfer.id)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::InsufficientStock {
            requested: 6,
            available: 1,
            ..
        }
    );

    // The failed reversal must not have touched anything
    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 4);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 1);
    let header = transfer::Entity::find_by_id(record.transfer.id)
        .one(&*ctx.db)
        .await
        .unwrap();
    assert!(header.is_some());
}

#[tokio::test]
async fn update_on_same_source_sees_its_own_reservation_as_returned() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();
    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 4);

    // Only 4 on hand, but editing 6 -> 8 succeeds because the original 6 are
    // returned before the new demand is validated.
    let updated = ctx
        .services
        .transfers
        .update_transfer(UpdateTransferCommand {
            transfer_id: record.transfer.id,
            source,
            destination,
            items: vec![line(product.id, 8)],
        })
        .await
        .expect("edit within the returned reservation should succeed");

    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 2);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 8);
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].quantity, 8);
    assert_eq!(updated.transfer.id, record.transfer.id);
}

#[tokio::test]
async fn update_beyond_available_plus_reservation_fails() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    // 4 on hand + 6 returned = 10 available; 11 must fail and roll back
    let err = ctx
        .services
        .transfers
        .update_transfer(UpdateTransferCommand {
            transfer_id: record.transfer.id,
            source,
            destination,
            items: vec![line(product.id, 11)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock { .. });

    // Rolled back to the post-create state, reversal included
    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 4);
    assert_eq!(quantity_at(&ctx.db, product.id, destination).await, 6);
    let current = ctx
        .services
        .transfers
        .get_transfer(record.transfer.id)
        .await
        .unwrap();
    assert_eq!(current.items[0].quantity, 6);
}

#[tokio::test]
async fn update_can_move_the_destination() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let first = seed_shop(&ctx.db, "Downtown Shop").await;
    let second = seed_shop(&ctx.db, "Airport Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination: LocationRef::Shop(first.id),
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    ctx.services
        .transfers
        .update_transfer(UpdateTransferCommand {
            transfer_id: record.transfer.id,
            source,
            destination: LocationRef::Shop(second.id),
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    assert_eq!(quantity_at(&ctx.db, product.id, source).await, 4);
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Shop(first.id)).await,
        0
    );
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Shop(second.id)).await,
        6
    );
}

#[tokio::test]
async fn update_is_equivalent_to_delete_then_create() {
    // Same seed, two histories: one goes through update, the other through
    // delete + create with the same final shape.
    async fn seeded() -> (TestContext, Uuid, LocationRef, LocationRef, LocationRef) {
        let ctx = TestContext::new().await;
        let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
        let first = seed_shop(&ctx.db, "Downtown Shop").await;
        let second = seed_shop(&ctx.db, "Airport Shop").await;
        let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;
        let source = LocationRef::Warehouse(wh.id);
        seed_stock(&ctx.db, product.id, source, 10).await;
        (
            ctx,
            product.id,
            source,
            LocationRef::Shop(first.id),
            LocationRef::Shop(second.id),
        )
    }

    let (updated_ctx, product_a, src_a, first_a, second_a) = seeded().await;
    let created = updated_ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: src_a,
            destination: first_a,
            items: vec![line(product_a, 6)],
        })
        .await
        .unwrap();
    updated_ctx
        .services
        .transfers
        .update_transfer(UpdateTransferCommand {
            transfer_id: created.transfer.id,
            source: src_a,
            destination: second_a,
            items: vec![line(product_a, 8)],
        })
        .await
        .unwrap();

    let (recreated_ctx, product_b, src_b, first_b, second_b) = seeded().await;
    let created = recreated_ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: src_b,
            destination: first_b,
            items: vec![line(product_b, 6)],
        })
        .await
        .unwrap();
    recreated_ctx
        .services
        .transfers
        .delete_transfer(created.transfer.id)
        .await
        .unwrap();
    recreated_ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: src_b,
            destination: second_b,
            items: vec![line(product_b, 8)],
        })
        .await
        .unwrap();

    assert_eq!(
        quantity_at(&updated_ctx.db, product_a, src_a).await,
        quantity_at(&recreated_ctx.db, product_b, src_b).await
    );
    assert_eq!(
        quantity_at(&updated_ctx.db, product_a, first_a).await,
        quantity_at(&recreated_ctx.db, product_b, first_b).await
    );
    assert_eq!(
        quantity_at(&updated_ctx.db, product_a, second_a).await,
        quantity_at(&recreated_ctx.db, product_b, second_b).await
    );
}

#[tokio::test]
async fn validation_rejects_bad_movements() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;
    seed_stock(&ctx.db, product.id, LocationRef::Warehouse(wh.id), 10).await;

    // Same location on both ends
    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: LocationRef::Warehouse(wh.id),
            destination: LocationRef::Warehouse(wh.id),
            items: vec![line(product.id, 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Non-positive quantity
    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: LocationRef::Warehouse(wh.id),
            destination: LocationRef::Shop(shop.id),
            items: vec![line(product.id, 0)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Empty item list
    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: LocationRef::Warehouse(wh.id),
            destination: LocationRef::Shop(shop.id),
            items: vec![],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Unknown product
    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: LocationRef::Warehouse(wh.id),
            destination: LocationRef::Shop(shop.id),
            items: vec![line(Uuid::new_v4(), 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // Unknown destination shop
    let err = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source: LocationRef::Warehouse(wh.id),
            destination: LocationRef::Shop(Uuid::new_v4()),
            items: vec![line(product.id, 1)],
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // All rejected before any movement
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        10
    );
}

#[tokio::test]
async fn missing_transfer_reports_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx
        .services
        .transfers
        .get_transfer(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = ctx
        .services
        .transfers
        .delete_transfer(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn available_quantity_counts_own_reservation() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let record = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 6)],
        })
        .await
        .unwrap();

    // Plain availability reflects the committed decrement
    let plain = ctx
        .services
        .transfers
        .available_quantity(product.id, source, None)
        .await
        .unwrap();
    assert_eq!(plain, 4);

    // Edit-dialog availability counts the transfer's own 6 as returned
    let editing = ctx
        .services
        .transfers
        .available_quantity(product.id, source, Some(record.transfer.id))
        .await
        .unwrap();
    assert_eq!(editing, 10);

    // Excluding the transfer does not inflate other locations
    let at_destination = ctx
        .services
        .transfers
        .available_quantity(product.id, destination, Some(record.transfer.id))
        .await
        .unwrap();
    assert_eq!(at_destination, 6);
}

#[tokio::test]
async fn list_transfers_is_newest_first_and_date_filtered() {
    let ctx = TestContext::new().await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(5.00), dec!(12.50)).await;

    let source = LocationRef::Warehouse(wh.id);
    let destination = LocationRef::Shop(shop.id);
    seed_stock(&ctx.db, product.id, source, 10).await;

    let first = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 2)],
        })
        .await
        .unwrap();
    let second = ctx
        .services
        .transfers
        .create_transfer(CreateTransferCommand {
            source,
            destination,
            items: vec![line(product.id, 3)],
        })
        .await
        .unwrap();

    let (listed, total) = ctx
        .services
        .transfers
        .list_transfers(None, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].transfer.id, second.transfer.id);
    assert_eq!(listed[1].transfer.id, first.transfer.id);

    // A range in the distant past matches nothing
    let past = opsboard_api::handlers::common::parse_date_range(
        Some("1999-01-01"),
        Some("1999-12-31"),
    )
    .unwrap();
    let (listed, total) = ctx
        .services
        .transfers
        .list_transfers(past, 1, 20)
        .await
        .unwrap();
    assert_eq!(total, 0);
    assert!(listed.is_empty());
}
