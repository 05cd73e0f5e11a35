use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::commands::invoices::ReceiveInvoiceCommand;
use crate::commands::Command;
use crate::db::DbPool;
use crate::entities::{invoice, invoice_item};
use crate::errors::ServiceError;
use crate::events::EventSender;

/// An invoice header together with its ordered line items.
#[derive(Debug, Clone)]
pub struct InvoiceWithItems {
    pub invoice: invoice::Model,
    pub items: Vec<invoice_item::Model>,
}

/// Procurement leg: receipts from suppliers into warehouses.
#[derive(Clone)]
pub struct ProcurementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProcurementService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn receive_invoice(
        &self,
        command: ReceiveInvoiceCommand,
    ) -> Result<InvoiceWithItems, ServiceError> {
        let header = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        self.get_invoice(header.id).await
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceWithItems, ServiceError> {
        let db = &*self.db_pool;

        let header = invoice::Entity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))?;

        let items = invoice_item::Entity::find()
            .filter(invoice_item::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(invoice_item::Column::Position)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(InvoiceWithItems {
            invoice: header,
            items,
        })
    }

    /// Lists invoices newest first, optionally limited to a date range on
    /// the invoice date.
    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        range: Option<(DateTimeWithTimeZone, DateTimeWithTimeZone)>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<InvoiceWithItems>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = invoice::Entity::find();
        if let Some((start, end)) = range {
            query = query
                .filter(invoice::Column::InvoicedAt.gte(start))
                .filter(invoice::Column::InvoicedAt.lte(end));
        }

        let paginator = query
            .order_by_desc(invoice::Column::InvoicedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let headers = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        let mut invoices = Vec::with_capacity(headers.len());
        for header in headers {
            let items = invoice_item::Entity::find()
                .filter(invoice_item::Column::InvoiceId.eq(header.id))
                .order_by_asc(invoice_item::Column::Position)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            invoices.push(InvoiceWithItems {
                invoice: header,
                items,
            });
        }

        Ok((invoices, total))
    }

    /// Invoices are immutable ledger entries: there is no inventory-reversal
    /// path for a receipt, so deletion is refused rather than applied
    /// half-way. Missing invoices still report `NotFound`.
    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let exists = invoice::Entity::find_by_id(invoice_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .is_some();
        if !exists {
            return Err(ServiceError::NotFound(format!(
                "Invoice {} not found",
                invoice_id
            )));
        }

        Err(ServiceError::InvalidOperation(
            "Invoices are immutable procurement ledger entries and cannot be deleted".to_string(),
        ))
    }
}
