pub mod catalog;
pub mod common;
pub mod health;
pub mod invoices;
pub mod stock;
pub mod transfers;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::catalog::CatalogService;
use crate::services::inventory::InventoryService;
use crate::services::procurement::ProcurementService;
use crate::services::transfers::TransferService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub transfers: Arc<TransferService>,
    pub inventory: Arc<InventoryService>,
    pub procurement: Arc<ProcurementService>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            transfers: Arc::new(TransferService::new(db_pool.clone(), event_sender.clone())),
            inventory: Arc::new(InventoryService::new(db_pool.clone())),
            procurement: Arc::new(ProcurementService::new(db_pool.clone(), event_sender)),
            catalog: Arc::new(CatalogService::new(db_pool)),
        }
    }
}
