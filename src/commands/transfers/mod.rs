pub mod create_transfer_command;
pub mod delete_transfer_command;
pub mod update_transfer_command;

pub use create_transfer_command::CreateTransferCommand;
pub use delete_transfer_command::DeleteTransferCommand;
pub use update_transfer_command::UpdateTransferCommand;

use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::transfer_item;
use crate::errors::ServiceError;
use crate::location::LocationRef;

/// One line of a transfer intent: move `quantity` units of a product.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Structural checks shared by create and update. Runs before any
/// persistence access.
pub(crate) fn validate_movement(
    source: LocationRef,
    destination: LocationRef,
    items: &[TransferLine],
) -> Result<(), ServiceError> {
    if source == destination {
        return Err(ServiceError::ValidationError(
            "Source and destination must be different locations".to_string(),
        ));
    }
    for line in items {
        if line.quantity < 1 {
            return Err(ServiceError::ValidationError(format!(
                "Quantity for product {} must be at least 1",
                line.product_id
            )));
        }
    }
    Ok(())
}

pub(crate) fn movements(items: &[TransferLine]) -> Vec<(Uuid, i32)> {
    items.iter().map(|l| (l.product_id, l.quantity)).collect()
}

pub(crate) fn item_movements(items: &[transfer_item::Model]) -> Vec<(Uuid, i32)> {
    items.iter().map(|i| (i.product_id, i.quantity)).collect()
}

/// Inserts the ordered line set for a transfer header.
pub(crate) async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    transfer_id: Uuid,
    items: &[TransferLine],
) -> Result<(), ServiceError> {
    for (position, line) in items.iter().enumerate() {
        transfer_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            transfer_id: Set(transfer_id),
            position: Set(position as i32),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
    }
    Ok(())
}
