use crate::entities::{product, shop, supplier, warehouse};
use crate::location::LocationRef;
use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

/// Command trait for implementing the Command Pattern
///
/// This trait allows for encapsulating all the logic needed to execute a
/// business operation into a single object that can be validated, executed,
/// and produce events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    ///
    /// # Returns
    /// * `Result<Self::Result, ServiceError>` - The result of command execution or an error
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod invoices;
pub mod transfers;

/// Fails with `NotFound` naming the first product id that has no catalog row.
pub(crate) async fn ensure_products_exist<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> Result<(), ServiceError> {
    let mut unique: Vec<Uuid> = product_ids.to_vec();
    unique.sort();
    unique.dedup();

    let found = product::Entity::find()
        .filter(product::Column::Id.is_in(unique.clone()))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    for id in &unique {
        if !found.iter().any(|p| p.id == *id) {
            return Err(ServiceError::NotFound(format!(
                "Product {} does not exist",
                id
            )));
        }
    }
    Ok(())
}

pub(crate) async fn ensure_location_exists<C: ConnectionTrait>(
    conn: &C,
    location: LocationRef,
) -> Result<(), ServiceError> {
    match location {
        LocationRef::Warehouse(id) => {
            warehouse::Entity::find_by_id(id)
                .one(conn)
                .await
                .map_err(ServiceError::db_error)?
                .map(|_| ())
                .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} does not exist", id)))
        }
        LocationRef::Shop(id) => shop::Entity::find_by_id(id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Shop {} does not exist", id))),
    }
}

pub(crate) async fn ensure_supplier_exists<C: ConnectionTrait>(
    conn: &C,
    supplier_id: Uuid,
) -> Result<(), ServiceError> {
    supplier::Entity::find_by_id(supplier_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Supplier {} does not exist", supplier_id))
        })
}
