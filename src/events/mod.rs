use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after a state-changing operation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// A transfer was applied and its inventory effects committed
    TransferCompleted { transfer_id: Uuid },
    /// An existing transfer was rewritten (old effects reversed, new applied)
    TransferAmended { transfer_id: Uuid },
    /// A transfer was deleted and its inventory effects reversed
    TransferReversed { transfer_id: Uuid },
    /// A procurement receipt landed in a warehouse
    InvoiceReceived {
        invoice_id: Uuid,
        warehouse_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Processes incoming events. Spawned once at startup; runs until every
/// sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::TransferCompleted { transfer_id } => {
                info!(transfer_id = %transfer_id, "Transfer completed");
            }
            Event::TransferAmended { transfer_id } => {
                info!(transfer_id = %transfer_id, "Transfer amended");
            }
            Event::TransferReversed { transfer_id } => {
                info!(transfer_id = %transfer_id, "Transfer reversed and deleted");
            }
            Event::InvoiceReceived {
                invoice_id,
                warehouse_id,
            } => {
                info!(
                    invoice_id = %invoice_id,
                    warehouse_id = %warehouse_id,
                    "Procurement receipt applied"
                );
            }
        }
    }

    warn!("Event channel closed; stopping event processing loop");
}
