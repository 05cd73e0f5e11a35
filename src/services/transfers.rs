use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::commands::transfers::{
    CreateTransferCommand, DeleteTransferCommand, UpdateTransferCommand,
};
use crate::commands::Command;
use crate::db::DbPool;
use crate::entities::{transfer, transfer_item};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::location::LocationRef;
use crate::services::stock;

/// A transfer header together with its ordered line items.
#[derive(Debug, Clone)]
pub struct TransferWithItems {
    pub transfer: transfer::Model,
    pub items: Vec<transfer_item::Model>,
}

/// Facade over the transfer engine: create/update/delete run through their
/// commands (one transaction each); the rest are committed-state reads.
#[derive(Clone)]
pub struct TransferService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl TransferService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_transfer(
        &self,
        command: CreateTransferCommand,
    ) -> Result<TransferWithItems, ServiceError> {
        let header = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        self.get_transfer(header.id).await
    }

    #[instrument(skip(self))]
    pub async fn update_transfer(
        &self,
        command: UpdateTransferCommand,
    ) -> Result<TransferWithItems, ServiceError> {
        let header = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        self.get_transfer(header.id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_transfer(&self, transfer_id: Uuid) -> Result<(), ServiceError> {
        DeleteTransferCommand { transfer_id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_transfer(&self, transfer_id: Uuid) -> Result<TransferWithItems, ServiceError> {
        let db = &*self.db_pool;

        let header = transfer::Entity::find_by_id(transfer_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Transfer {} not found", transfer_id)))?;

        let items = self.items_for(header.id).await?;

        Ok(TransferWithItems {
            transfer: header,
            items,
        })
    }

    /// Lists transfers newest first, optionally limited to a date range on
    /// the transfer timestamp.
    #[instrument(skip(self))]
    pub async fn list_transfers(
        &self,
        range: Option<(DateTimeWithTimeZone, DateTimeWithTimeZone)>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<TransferWithItems>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = transfer::Entity::find();
        if let Some((start, end)) = range {
            query = query
                .filter(transfer::Column::TransferredAt.gte(start))
                .filter(transfer::Column::TransferredAt.lte(end));
        }

        let paginator = query
            .order_by_desc(transfer::Column::TransferredAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let headers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let mut transfers = Vec::with_capacity(headers.len());
        for header in headers {
            let items = self.items_for(header.id).await?;
            transfers.push(TransferWithItems {
                transfer: header,
                items,
            });
        }

        Ok((transfers, total))
    }

    /// Quantity a caller may move out of `location`, as seen from the edit
    /// dialog of `exclude_transfer`: stock the excluded transfer reserved at
    /// its source counts as available again.
    #[instrument(skip(self))]
    pub async fn available_quantity(
        &self,
        product_id: Uuid,
        location: LocationRef,
        exclude_transfer: Option<Uuid>,
    ) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;

        let mut available = i64::from(stock::quantity_on_hand(db, product_id, location).await?);

        if let Some(transfer_id) = exclude_transfer {
            let existing = self.get_transfer(transfer_id).await?;
            if existing.transfer.source()? == location {
                available += existing
                    .items
                    .iter()
                    .filter(|i| i.product_id == product_id)
                    .map(|i| i64::from(i.quantity))
                    .sum::<i64>();
            }
        }

        i32::try_from(available).map_err(|_| {
            ServiceError::InternalError(format!(
                "Available quantity overflow for product {}",
                product_id
            ))
        })
    }

    async fn items_for(&self, transfer_id: Uuid) -> Result<Vec<transfer_item::Model>, ServiceError> {
        let db = &*self.db_pool;
        transfer_item::Entity::find()
            .filter(transfer_item::Column::TransferId.eq(transfer_id))
            .order_by_asc(transfer_item::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
