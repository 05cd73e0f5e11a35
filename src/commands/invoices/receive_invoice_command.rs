use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::commands::{ensure_location_exists, ensure_supplier_exists, Command};
use crate::db::DbPool;
use crate::entities::{invoice, invoice_item, product, stock_level};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::location::LocationRef;
use crate::services::stock::{self, StockDelta};

lazy_static! {
    static ref INVOICES_RECEIVED: IntCounter = IntCounter::new(
        "invoices_received_total",
        "Total number of procurement receipts applied"
    )
    .expect("metric can be created");
    static ref INVOICE_FAILURES: IntCounter = IntCounter::new(
        "invoice_failures_total",
        "Total number of failed procurement receipts"
    )
    .expect("metric can be created");
}

/// One line of a procurement receipt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

/// Applies a supplier invoice: increments warehouse stock per line and folds
/// each line's cost into the product's weighted-average unit cost, then
/// persists the invoice header and items — one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiveInvoiceCommand {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, message = "Invoice number cannot be empty"))]
    pub number: String,
    pub invoiced_at: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "An invoice needs at least one item"))]
    pub items: Vec<InvoiceLine>,
}

#[async_trait]
impl Command for ReceiveInvoiceCommand {
    type Result = invoice::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            INVOICE_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        for line in &self.items {
            if line.quantity < 1 {
                INVOICE_FAILURES.inc();
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be at least 1",
                    line.product_id
                )));
            }
            if line.unit_cost < Decimal::ZERO {
                INVOICE_FAILURES.inc();
                return Err(ServiceError::ValidationError(format!(
                    "Unit cost for product {} cannot be negative",
                    line.product_id
                )));
            }
        }

        let supplier_id = self.supplier_id;
        let warehouse_id = self.warehouse_id;
        let number = self.number.clone();
        let invoiced_at = self.invoiced_at;
        let items = self.items.clone();

        let db = db_pool.as_ref();
        let received = db
            .transaction::<_, invoice::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    ensure_supplier_exists(txn, supplier_id).await?;
                    let destination = LocationRef::Warehouse(warehouse_id);
                    ensure_location_exists(txn, destination).await?;

                    let duplicate = invoice::Entity::find()
                        .filter(invoice::Column::Number.eq(number.clone()))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if duplicate.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Invoice number '{}' already exists",
                            number
                        )));
                    }

                    let now: DateTimeWithTimeZone = Utc::now().into();
                    let header = invoice::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        number: Set(number),
                        supplier_id: Set(supplier_id),
                        warehouse_id: Set(warehouse_id),
                        invoiced_at: Set(invoiced_at.map(Into::into).unwrap_or(now)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    // Lines are applied in submitted order: the weighted
                    // average for a later line sees stock received by an
                    // earlier line of the same product.
                    for (position, line) in items.iter().enumerate() {
                        receive_line(txn, destination, line).await?;

                        invoice_item::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            invoice_id: Set(header.id),
                            position: Set(position as i32),
                            product_id: Set(line.product_id),
                            quantity: Set(line.quantity),
                            unit_cost: Set(line.unit_cost),
                        }
                        .insert(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    }

                    Ok(header)
                })
            })
            .await
            .map_err(|e| {
                INVOICE_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        event_sender
            .send(Event::InvoiceReceived {
                invoice_id: received.id,
                warehouse_id,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for invoice receipt: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        info!(
            invoice_id = %received.id,
            number = %received.number,
            warehouse_id = %warehouse_id,
            lines = self.items.len(),
            "Procurement receipt applied"
        );
        INVOICES_RECEIVED.inc();

        Ok(received)
    }
}

/// Recomputes the product's weighted-average cost against its total stock
/// across ALL locations prior to this line, then lands the quantity in the
/// destination warehouse.
async fn receive_line<C: ConnectionTrait>(
    conn: &C,
    destination: LocationRef,
    line: &InvoiceLine,
) -> Result<(), ServiceError> {
    let existing = product::Entity::find_by_id(line.product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Product {} does not exist", line.product_id))
        })?;

    let levels = stock_level::Entity::find()
        .filter(stock_level::Column::ProductId.eq(line.product_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let existing_total: i64 = levels.iter().map(|l| i64::from(l.quantity)).sum();

    let new_cost = if existing_total == 0 {
        line.unit_cost
    } else {
        (Decimal::from(existing_total) * existing.unit_cost
            + Decimal::from(line.quantity) * line.unit_cost)
            / Decimal::from(existing_total + i64::from(line.quantity))
    };

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: product::ActiveModel = existing.into();
    active.unit_cost = Set(new_cost);
    active.updated_at = Set(now);
    active.update(conn).await.map_err(ServiceError::db_error)?;

    stock::apply_deltas(
        conn,
        vec![StockDelta {
            product_id: line.product_id,
            location: destination,
            delta: i64::from(line.quantity),
        }],
    )
    .await
}
