use sea_orm_migration::prelude::*;

/// Embedded migrator: the schema ships with the binary so tests and fresh
/// deployments can bring a database up without external tooling.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_products_table::Migration),
            Box::new(m20240101_000002_create_location_tables::Migration),
            Box::new(m20240101_000003_create_suppliers_table::Migration),
            Box::new(m20240101_000004_create_stock_levels_table::Migration),
            Box::new(m20240101_000005_create_transfer_tables::Migration),
            Box::new(m20240101_000006_create_invoice_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null().unique_key())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(
                            ColumnDef::new(Products::UnitCost)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UnitPrice)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Id,
        Sku,
        Name,
        UnitCost,
        UnitPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_location_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_location_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Warehouses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Warehouses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Warehouses::Name).string().not_null())
                        .col(ColumnDef::new(Warehouses::Address).string().null())
                        .col(
                            ColumnDef::new(Warehouses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Warehouses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Shops::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shops::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shops::Name).string().not_null())
                        .col(ColumnDef::new(Shops::Address).string().null())
                        .col(
                            ColumnDef::new(Shops::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shops::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Shops::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Warehouses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Warehouses {
        Table,
        Id,
        Name,
        Address,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum Shops {
        Table,
        Id,
        Name,
        Address,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_suppliers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_suppliers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Suppliers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Suppliers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Suppliers::Name).string().not_null())
                        .col(ColumnDef::new(Suppliers::Contact).string().null())
                        .col(
                            ColumnDef::new(Suppliers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Suppliers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Suppliers {
        Table,
        Id,
        Name,
        Contact,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_stock_levels_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_stock_levels_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLevels::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLevels::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLevels::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockLevels::LocationType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockLevels::LocationId).uuid().not_null())
                        .col(ColumnDef::new(StockLevels::Quantity).integer().not_null())
                        .col(ColumnDef::new(StockLevels::Version).integer().not_null())
                        .col(
                            ColumnDef::new(StockLevels::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockLevels::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // One row per (product, location) pair
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_levels_product_location")
                        .table(StockLevels::Table)
                        .col(StockLevels::ProductId)
                        .col(StockLevels::LocationType)
                        .col(StockLevels::LocationId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockLevels::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockLevels {
        Table,
        Id,
        ProductId,
        LocationType,
        LocationId,
        Quantity,
        Version,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_transfer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_transfer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transfers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transfers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::SourceType).string().not_null())
                        .col(ColumnDef::new(Transfers::SourceId).uuid().not_null())
                        .col(
                            ColumnDef::new(Transfers::DestinationType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transfers::DestinationId).uuid().not_null())
                        .col(ColumnDef::new(Transfers::Status).string().not_null())
                        .col(
                            ColumnDef::new(Transfers::TransferredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Transfers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TransferItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(TransferItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(TransferItems::TransferId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::Position).integer().not_null())
                        .col(ColumnDef::new(TransferItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(TransferItems::Quantity).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transfer_items_transfer_id")
                                .from(TransferItems::Table, TransferItems::TransferId)
                                .to(Transfers::Table, Transfers::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transfer_items_transfer_id")
                        .table(TransferItems::Table)
                        .col(TransferItems::TransferId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(TransferItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Transfers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Transfers {
        Table,
        Id,
        SourceType,
        SourceId,
        DestinationType,
        DestinationId,
        Status,
        TransferredAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum TransferItems {
        Table,
        Id,
        TransferId,
        Position,
        ProductId,
        Quantity,
    }
}

mod m20240101_000006_create_invoice_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_invoice_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Invoices::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Invoices::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Invoices::Number)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Invoices::SupplierId).uuid().not_null())
                        .col(ColumnDef::new(Invoices::WarehouseId).uuid().not_null())
                        .col(
                            ColumnDef::new(Invoices::InvoicedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Invoices::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(InvoiceItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(InvoiceItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(InvoiceItems::InvoiceId).uuid().not_null())
                        .col(ColumnDef::new(InvoiceItems::Position).integer().not_null())
                        .col(ColumnDef::new(InvoiceItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(InvoiceItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(InvoiceItems::UnitCost)
                                .decimal_len(19, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_invoice_items_invoice_id")
                                .from(InvoiceItems::Table, InvoiceItems::InvoiceId)
                                .to(Invoices::Table, Invoices::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_invoice_items_invoice_id")
                        .table(InvoiceItems::Table)
                        .col(InvoiceItems::InvoiceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(InvoiceItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Invoices::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Invoices {
        Table,
        Id,
        Number,
        SupplierId,
        WarehouseId,
        InvoicedAt,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub enum InvoiceItems {
        Table,
        Id,
        InvoiceId,
        Position,
        ProductId,
        Quantity,
        UnitCost,
    }
}
