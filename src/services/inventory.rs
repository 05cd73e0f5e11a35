use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::stock_level;
use crate::errors::ServiceError;
use crate::location::LocationRef;
use crate::services::stock;

/// Read surface over per-location stock. All writes go through the commands;
/// this service only ever reads committed state.
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Quantity on hand for a product at a location; absence means zero.
    #[instrument(skip(self))]
    pub async fn quantity(
        &self,
        product_id: Uuid,
        location: LocationRef,
    ) -> Result<i32, ServiceError> {
        stock::quantity_on_hand(&*self.db_pool, product_id, location).await
    }

    /// Lists stock rows with optional product/location filters.
    #[instrument(skip(self))]
    pub async fn list_stock(
        &self,
        product_id: Option<Uuid>,
        location: Option<LocationRef>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<stock_level::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = stock_level::Entity::find();
        if let Some(product_id) = product_id {
            query = query.filter(stock_level::Column::ProductId.eq(product_id));
        }
        if let Some(location) = location {
            query = query
                .filter(stock_level::Column::LocationType.eq(location.kind().to_string()))
                .filter(stock_level::Column::LocationId.eq(location.id()));
        }

        let paginator = query
            .order_by_asc(stock_level::Column::ProductId)
            .order_by_asc(stock_level::Column::LocationType)
            .order_by_asc(stock_level::Column::LocationId)
            .paginate(db, per_page);
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let rows = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((rows, total))
    }
}
