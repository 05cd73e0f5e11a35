use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::commands::transfers::{
    insert_items, item_movements, movements, validate_movement, TransferLine,
};
use crate::commands::{ensure_location_exists, ensure_products_exist, Command};
use crate::db::DbPool;
use crate::entities::{transfer, transfer_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::location::LocationRef;
use crate::services::stock;

lazy_static! {
    static ref TRANSFERS_UPDATED: IntCounter = IntCounter::new(
        "transfers_updated_total",
        "Total number of stock transfers rewritten"
    )
    .expect("metric can be created");
    static ref TRANSFER_UPDATE_FAILURES: IntCounter = IntCounter::new(
        "transfer_update_failures_total",
        "Total number of failed transfer updates"
    )
    .expect("metric can be created");
}

/// Rewrites a transfer: reverses the original movement, replaces the header
/// refs and item set, and applies the new movement — one transaction.
///
/// Reversal and new demand are netted into a single plan before validation,
/// so stock reserved by the original transfer counts as available again while
/// the new quantities are checked.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTransferCommand {
    pub transfer_id: Uuid,
    pub source: LocationRef,
    pub destination: LocationRef,
    #[validate(length(min = 1, message = "A transfer needs at least one item"))]
    pub items: Vec<TransferLine>,
}

#[async_trait]
impl Command for UpdateTransferCommand {
    type Result = transfer::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            TRANSFER_UPDATE_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        validate_movement(self.source, self.destination, &self.items).map_err(|e| {
            TRANSFER_UPDATE_FAILURES.inc();
            e
        })?;

        let transfer_id = self.transfer_id;
        let source = self.source;
        let destination = self.destination;
        let items = self.items.clone();

        let db = db_pool.as_ref();
        let updated = db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let header = transfer::Entity::find_by_id(transfer_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
                        })?;

                    let original_items = transfer_item::Entity::find()
                        .filter(transfer_item::Column::TransferId.eq(transfer_id))
                        .all(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let original_source = header.source()?;
                    let original_destination = header.destination()?;

                    ensure_location_exists(txn, source).await?;
                    ensure_location_exists(txn, destination).await?;
                    let product_ids: Vec<Uuid> =
                        items.iter().map(|l| l.product_id).collect();
                    ensure_products_exist(txn, &product_ids).await?;

                    // Undo the original movement and apply the new one as one
                    // netted plan; validation runs against the combined result.
                    let mut plan = stock::reversal_deltas(
                        original_source,
                        original_destination,
                        &item_movements(&original_items),
                    );
                    plan.extend(stock::transfer_deltas(
                        source,
                        destination,
                        &movements(&items),
                    ));
                    stock::apply_deltas(txn, plan).await?;

                    transfer_item::Entity::delete_many()
                        .filter(transfer_item::Column::TransferId.eq(transfer_id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let now: DateTimeWithTimeZone = Utc::now().into();
                    let mut active: transfer::ActiveModel = header.into();
                    active.source_type = Set(source.kind().to_string());
                    active.source_id = Set(source.id());
                    active.destination_type = Set(destination.kind().to_string());
                    active.destination_id = Set(destination.id());
                    active.updated_at = Set(now);
                    let rewritten = active.update(txn).await.map_err(ServiceError::db_error)?;

                    insert_items(txn, transfer_id, &items).await?;

                    Ok(rewritten)
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_UPDATE_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        event_sender
            .send(Event::TransferAmended {
                transfer_id: updated.id,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for transfer update: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        info!(
            transfer_id = %updated.id,
            source = %self.source,
            destination = %self.destination,
            lines = self.items.len(),
            "Stock transfer rewritten"
        );
        TRANSFERS_UPDATED.inc();

        Ok(updated)
    }
}
