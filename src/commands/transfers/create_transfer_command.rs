use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, Set, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::commands::transfers::{insert_items, movements, validate_movement, TransferLine};
use crate::commands::{ensure_location_exists, ensure_products_exist, Command};
use crate::db::DbPool;
use crate::entities::transfer::{self, TransferStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::location::LocationRef;
use crate::services::stock;

lazy_static! {
    static ref TRANSFERS_CREATED: IntCounter = IntCounter::new(
        "transfers_created_total",
        "Total number of stock transfers created"
    )
    .expect("metric can be created");
    static ref TRANSFER_CREATE_FAILURES: IntCounter = IntCounter::new(
        "transfer_create_failures_total",
        "Total number of failed transfer creations"
    )
    .expect("metric can be created");
}

/// Creates a transfer: validates source stock, moves the quantities and
/// persists the ledger entry, all in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransferCommand {
    pub source: LocationRef,
    pub destination: LocationRef,
    #[validate(length(min = 1, message = "A transfer needs at least one item"))]
    pub items: Vec<TransferLine>,
}

#[async_trait]
impl Command for CreateTransferCommand {
    type Result = transfer::Model;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            TRANSFER_CREATE_FAILURES.inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;
        validate_movement(self.source, self.destination, &self.items).map_err(|e| {
            TRANSFER_CREATE_FAILURES.inc();
            e
        })?;

        let source = self.source;
        let destination = self.destination;
        let items = self.items.clone();

        let db = db_pool.as_ref();
        let created = db
            .transaction::<_, transfer::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    ensure_location_exists(txn, source).await?;
                    ensure_location_exists(txn, destination).await?;
                    let product_ids: Vec<Uuid> =
                        items.iter().map(|l| l.product_id).collect();
                    ensure_products_exist(txn, &product_ids).await?;

                    // The whole movement is one netted plan: either every
                    // line has sufficient source stock or nothing is applied.
                    let plan = stock::transfer_deltas(source, destination, &movements(&items));
                    stock::apply_deltas(txn, plan).await?;

                    let now: DateTimeWithTimeZone = Utc::now().into();
                    let header = transfer::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        source_type: Set(source.kind().to_string()),
                        source_id: Set(source.id()),
                        destination_type: Set(destination.kind().to_string()),
                        destination_id: Set(destination.id()),
                        status: Set(TransferStatus::Completed.to_string()),
                        transferred_at: Set(now),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    insert_items(txn, header.id, &items).await?;

                    Ok(header)
                })
            })
            .await
            .map_err(|e| {
                TRANSFER_CREATE_FAILURES.inc();
                match e {
                    TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                    TransactionError::Transaction(service_err) => service_err,
                }
            })?;

        event_sender
            .send(Event::TransferCompleted {
                transfer_id: created.id,
            })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for transfer creation: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        info!(
            transfer_id = %created.id,
            source = %self.source,
            destination = %self.destination,
            lines = self.items.len(),
            "Stock transfer completed"
        );
        TRANSFERS_CREATED.inc();

        Ok(created)
    }
}
