use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::location::LocationRef;

/// Quantity on hand for one product at one location.
///
/// At most one row exists per (product, location) pair; rows are created
/// lazily on first receipt and never deleted, so a zero quantity means
/// "known but empty". `version` is bumped on every quantity change and
/// guards against lost updates under concurrent writers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_levels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_type: String,
    pub location_id: Uuid,
    pub quantity: i32,
    pub version: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// The typed location this row belongs to.
    pub fn location(&self) -> Result<LocationRef, ServiceError> {
        LocationRef::parse(&self.location_type, self.location_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
