use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::handlers;

/// OpenAPI document served by the Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "opsboard API",
        description = "Retail/warehouse operations backend: stock transfers between locations, procurement receipts, per-location inventory"
    ),
    paths(
        handlers::health::health_check,
        handlers::transfers::create_transfer,
        handlers::transfers::list_transfers,
        handlers::transfers::get_transfer,
        handlers::transfers::update_transfer,
        handlers::transfers::delete_transfer,
        handlers::transfers::transfer_availability,
        handlers::invoices::receive_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::delete_invoice,
        handlers::stock::list_stock,
        handlers::stock::stock_quantity,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::list_warehouses,
        handlers::catalog::list_shops,
        handlers::catalog::list_suppliers,
    ),
    components(schemas(
        ErrorResponse,
        handlers::transfers::TransferRequest,
        handlers::transfers::TransferItemRequest,
        handlers::transfers::TransferResponse,
        handlers::transfers::TransferItemResponse,
        handlers::transfers::AvailabilityResponse,
        handlers::invoices::InvoiceRequest,
        handlers::invoices::InvoiceItemRequest,
        handlers::invoices::InvoiceResponse,
        handlers::invoices::InvoiceItemResponse,
        handlers::stock::StockLevelResponse,
        handlers::stock::QuantityResponse,
        handlers::catalog::ProductResponse,
        handlers::catalog::LocationResponse,
        handlers::catalog::SupplierResponse,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "transfers", description = "Stock movements between warehouses and shops"),
        (name = "invoices", description = "Procurement receipts from suppliers"),
        (name = "stock", description = "Per-location quantities on hand"),
        (name = "catalog", description = "Products, locations and suppliers"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
