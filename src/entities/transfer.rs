use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::errors::ServiceError;
use crate::location::LocationRef;

/// One recorded stock movement between two locations.
///
/// Source and destination are persisted as (type, id) pairs and parsed back
/// through [`LocationRef`]; the engine guarantees they never coincide.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub source_type: String,
    pub source_id: Uuid,
    pub destination_type: String,
    pub destination_id: Uuid,
    pub status: String,
    pub transferred_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Transfers are applied synchronously; the only persisted state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TransferStatus {
    Completed,
}

impl Model {
    pub fn source(&self) -> Result<LocationRef, ServiceError> {
        LocationRef::parse(&self.source_type, self.source_id)
    }

    pub fn destination(&self) -> Result<LocationRef, ServiceError> {
        LocationRef::parse(&self.destination_type, self.destination_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transfer_item::Entity")]
    TransferItem,
}

impl Related<super::transfer_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransferItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
