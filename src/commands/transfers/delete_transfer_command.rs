use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionError, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::commands::transfers::item_movements;
use crate::commands::Command;
use crate::db::DbPool;
use crate::entities::{transfer, transfer_item};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock;

lazy_static! {
    static ref TRANSFERS_DELETED: IntCounter = IntCounter::new(
        "transfers_deleted_total",
        "Total number of stock transfers deleted"
    )
    .expect("metric can be created");
    static ref TRANSFER_DELETE_FAILURES: IntCounter = IntCounter::new(
        "transfer_delete_failures_total",
        "Total number of failed transfer deletions"
    )
    .expect("metric can be created");
}

/// Deletes a transfer after reversing its inventory effects. The reversal
/// decrements the destination, which can legitimately fail when destination
/// stock was consumed since the transfer; that failure aborts the deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTransferCommand {
    pub transfer_id: Uuid,
}

#[async_trait]
impl Command for DeleteTransferCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let transfer_id = self.transfer_id;

        let db = db_pool.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let header = transfer::Entity::find_by_id(transfer_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Transfer {} not found", transfer_id))
                    })?;

                let items = transfer_item::Entity::find()
                    .filter(transfer_item::Column::TransferId.eq(transfer_id))
                    .all(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                let source = header.source()?;
                let destination = header.destination()?;

                let plan = stock::reversal_deltas(source, destination, &item_movements(&items));
                stock::apply_deltas(txn, plan).await?;

                transfer_item::Entity::delete_many()
                    .filter(transfer_item::Column::TransferId.eq(transfer_id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                transfer::Entity::delete_by_id(transfer_id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                Ok(())
            })
        })
        .await
        .map_err(|e| {
            TRANSFER_DELETE_FAILURES.inc();
            match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            }
        })?;

        event_sender
            .send(Event::TransferReversed { transfer_id })
            .await
            .map_err(|e| {
                let msg = format!("Failed to send event for transfer deletion: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })?;

        info!(transfer_id = %transfer_id, "Stock transfer reversed and deleted");
        TRANSFERS_DELETED.inc();

        Ok(())
    }
}
