mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::EntityTrait;
use uuid::Uuid;

use opsboard_api::commands::invoices::{InvoiceLine, ReceiveInvoiceCommand};
use opsboard_api::entities::{invoice, product};
use opsboard_api::errors::ServiceError;
use opsboard_api::location::LocationRef;

use common::{quantity_at, seed_product, seed_shop, seed_stock, seed_supplier, seed_warehouse, TestContext};

fn receipt(
    supplier_id: Uuid,
    warehouse_id: Uuid,
    number: &str,
    items: Vec<InvoiceLine>,
) -> ReceiveInvoiceCommand {
    ReceiveInvoiceCommand {
        supplier_id,
        warehouse_id,
        number: number.to_string(),
        invoiced_at: None,
        items,
    }
}

#[tokio::test]
async fn first_receipt_sets_cost_and_creates_stock() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(0), dec!(12.50)).await;

    let record = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1001",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 20,
                unit_cost: dec!(4.25),
            }],
        ))
        .await
        .expect("receipt should succeed");

    // No stock anywhere before the receipt: cost is taken verbatim
    let updated = product::Entity::find_by_id(product.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.unit_cost, dec!(4.25));

    // Stock row was created lazily at the destination warehouse
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        20
    );

    assert_eq!(record.invoice.number, "INV-1001");
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.items[0].quantity, 20);
    assert_eq!(record.items[0].unit_cost, dec!(4.25));
}

#[tokio::test]
async fn receipt_blends_cost_across_all_locations() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let shop = seed_shop(&ctx.db, "Downtown Shop").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(10), dec!(25)).await;

    // 10 units across both locations at cost 10
    seed_stock(&ctx.db, product.id, LocationRef::Warehouse(wh.id), 6).await;
    seed_stock(&ctx.db, product.id, LocationRef::Shop(shop.id), 4).await;

    ctx.services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1002",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 10,
                unit_cost: dec!(16),
            }],
        ))
        .await
        .unwrap();

    // (10 * 10 + 10 * 16) / 20 = 13
    let updated = product::Entity::find_by_id(product.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.unit_cost, dec!(13));

    // Only the destination warehouse received quantity
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        16
    );
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Shop(shop.id)).await,
        4
    );
}

#[tokio::test]
async fn later_lines_see_stock_received_by_earlier_lines() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(0), dec!(25)).await;

    ctx.services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1003",
            vec![
                InvoiceLine {
                    product_id: product.id,
                    quantity: 5,
                    unit_cost: dec!(10),
                },
                InvoiceLine {
                    product_id: product.id,
                    quantity: 5,
                    unit_cost: dec!(20),
                },
            ],
        ))
        .await
        .unwrap();

    // Line 1: empty stock -> cost 10. Line 2: (5*10 + 5*20) / 10 = 15.
    let updated = product::Entity::find_by_id(product.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.unit_cost, dec!(15));
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        10
    );
}

#[tokio::test]
async fn duplicate_invoice_number_is_rejected_atomically() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(10), dec!(25)).await;

    ctx.services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1004",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 5,
                unit_cost: dec!(10),
            }],
        ))
        .await
        .unwrap();

    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1004",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 7,
                unit_cost: dec!(12),
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    // The rejected receipt left no trace: stock and cost are unchanged
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        5
    );
    let unchanged = product::Entity::find_by_id(product.id)
        .one(&*ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.unit_cost, dec!(10));
}

#[tokio::test]
async fn unknown_references_abort_before_any_mutation() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(10), dec!(25)).await;

    // Unknown supplier
    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            Uuid::new_v4(),
            wh.id,
            "INV-1005",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 5,
                unit_cost: dec!(10),
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // Unknown warehouse
    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            Uuid::new_v4(),
            "INV-1005",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 5,
                unit_cost: dec!(10),
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    // Unknown product, second line: the first line must roll back with it
    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1005",
            vec![
                InvoiceLine {
                    product_id: product.id,
                    quantity: 5,
                    unit_cost: dec!(10),
                },
                InvoiceLine {
                    product_id: Uuid::new_v4(),
                    quantity: 5,
                    unit_cost: dec!(10),
                },
            ],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        0
    );
    let invoices = invoice::Entity::find().all(&*ctx.db).await.unwrap();
    assert!(invoices.is_empty());
}

#[tokio::test]
async fn invoice_deletion_is_refused() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(10), dec!(25)).await;

    let record = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1006",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 5,
                unit_cost: dec!(10),
            }],
        ))
        .await
        .unwrap();

    let err = ctx
        .services
        .procurement
        .delete_invoice(record.invoice.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // Still present, stock untouched
    assert!(ctx
        .services
        .procurement
        .get_invoice(record.invoice.id)
        .await
        .is_ok());
    assert_eq!(
        quantity_at(&ctx.db, product.id, LocationRef::Warehouse(wh.id)).await,
        5
    );

    // A missing invoice still reports NotFound
    let err = ctx
        .services
        .procurement
        .delete_invoice(Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn invalid_lines_are_rejected_up_front() {
    let ctx = TestContext::new().await;
    let supplier = seed_supplier(&ctx.db, "Acme Trading").await;
    let wh = seed_warehouse(&ctx.db, "Main Warehouse").await;
    let product = seed_product(&ctx.db, "LAMP-001", dec!(10), dec!(25)).await;

    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1007",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 0,
                unit_cost: dec!(10),
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(
            supplier.id,
            wh.id,
            "INV-1007",
            vec![InvoiceLine {
                product_id: product.id,
                quantity: 5,
                unit_cost: dec!(-1),
            }],
        ))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = ctx
        .services
        .procurement
        .receive_invoice(receipt(supplier.id, wh.id, "", vec![]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}
