#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use opsboard_api::entities::{product, shop, stock_level, supplier, warehouse};
use opsboard_api::events::{Event, EventSender};
use opsboard_api::handlers::AppServices;
use opsboard_api::location::LocationRef;
use opsboard_api::migrator::Migrator;
use opsboard_api::services::stock;

/// Test harness: services backed by a fresh single-connection in-memory
/// SQLite database with the embedded migrations applied.
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub event_sender: EventSender,
    // Events are fire-and-forget in tests, but the receiver must stay alive
    // for sends to succeed.
    _event_rx: mpsc::Receiver<Event>,
}

impl TestContext {
    pub async fn new() -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt)
            .await
            .expect("failed to connect to in-memory sqlite");
        Migrator::up(&db, None)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(db);

        let (tx, rx) = mpsc::channel(1024);
        let event_sender = EventSender::new(tx);
        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));

        Self {
            db,
            services,
            event_sender,
            _event_rx: rx,
        }
    }
}

fn now() -> DateTimeWithTimeZone {
    Utc::now().into()
}

pub async fn seed_product(
    db: &DatabaseConnection,
    sku: &str,
    unit_cost: Decimal,
    unit_price: Decimal,
) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku: Set(sku.to_string()),
        name: Set(format!("Product {}", sku)),
        unit_cost: Set(unit_cost),
        unit_price: Set(unit_price),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("failed to seed product")
}

pub async fn seed_warehouse(db: &DatabaseConnection, name: &str) -> warehouse::Model {
    warehouse::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        address: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("failed to seed warehouse")
}

pub async fn seed_shop(db: &DatabaseConnection, name: &str) -> shop::Model {
    shop::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        address: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("failed to seed shop")
}

pub async fn seed_supplier(db: &DatabaseConnection, name: &str) -> supplier::Model {
    supplier::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        contact: Set(None),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("failed to seed supplier")
}

pub async fn seed_stock(
    db: &DatabaseConnection,
    product_id: Uuid,
    location: LocationRef,
    quantity: i32,
) -> stock_level::Model {
    stock_level::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        location_type: Set(location.kind().to_string()),
        location_id: Set(location.id()),
        quantity: Set(quantity),
        version: Set(0),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(db)
    .await
    .expect("failed to seed stock level")
}

/// Quantity on hand, read through the same primitive the engine uses.
pub async fn quantity_at(db: &DatabaseConnection, product_id: Uuid, location: LocationRef) -> i32 {
    stock::quantity_on_hand(db, product_id, location)
        .await
        .expect("failed to read quantity")
}
