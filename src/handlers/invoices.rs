use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::commands::invoices::{InvoiceLine, ReceiveInvoiceCommand};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, default_page, default_per_page, parse_date_range, success_response,
};
use crate::services::procurement::InvoiceWithItems;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

/// Body for receiving a supplier invoice into a warehouse.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InvoiceRequest {
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    pub number: String,
    /// Defaults to the receipt time when omitted
    pub invoiced_at: Option<DateTime<Utc>>,
    pub items: Vec<InvoiceItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_cost: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub number: String,
    pub supplier_id: Uuid,
    pub warehouse_id: Uuid,
    #[schema(value_type = String, format = DateTime)]
    pub invoiced_at: DateTimeWithTimeZone,
    pub items: Vec<InvoiceItemResponse>,
}

impl From<InvoiceWithItems> for InvoiceResponse {
    fn from(record: InvoiceWithItems) -> Self {
        Self {
            id: record.invoice.id,
            number: record.invoice.number,
            supplier_id: record.invoice.supplier_id,
            warehouse_id: record.invoice.warehouse_id,
            invoiced_at: record.invoice.invoiced_at,
            items: record
                .items
                .into_iter()
                .map(|i| InvoiceItemResponse {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_cost: i.unit_cost,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceListParams {
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub end_date: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the invoices router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_invoices).post(receive_invoice))
        .route("/:id", get(get_invoice).delete(delete_invoice))
}

/// Receive a supplier invoice: warehouse stock and weighted-average costs
/// are updated in the same transaction as the ledger entry
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = InvoiceRequest,
    responses(
        (status = 201, description = "Invoice received", body = InvoiceResponse),
        (status = 404, description = "Unknown supplier, warehouse or product", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoice number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn receive_invoice(
    State(state): State<AppState>,
    Json(payload): Json<InvoiceRequest>,
) -> Result<Response, ServiceError> {
    let command = ReceiveInvoiceCommand {
        supplier_id: payload.supplier_id,
        warehouse_id: payload.warehouse_id,
        number: payload.number,
        invoiced_at: payload.invoiced_at,
        items: payload
            .items
            .iter()
            .map(|i| InvoiceLine {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_cost: i.unit_cost,
            })
            .collect(),
    };

    let record = state.services.procurement.receive_invoice(command).await?;
    Ok(created_response(ApiResponse::success(
        InvoiceResponse::from(record),
    )))
}

/// List invoices, newest first
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(InvoiceListParams),
    responses(
        (status = 200, description = "Invoice list returned", body = [InvoiceResponse])
    ),
    tag = "invoices"
)]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoiceListParams>,
) -> Result<Response, ServiceError> {
    let range = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let (invoices, total) = state
        .services
        .procurement
        .list_invoices(range, params.page, params.per_page)
        .await?;

    let items: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(items, total, params.page, params.per_page),
    )))
}

/// Fetch one invoice with its items
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice returned", body = InvoiceResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let record = state.services.procurement.get_invoice(id).await?;
    Ok(success_response(ApiResponse::success(
        InvoiceResponse::from(record),
    )))
}

/// Invoices are immutable ledger entries; deletion is always refused
#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice id")),
    responses(
        (status = 400, description = "Invoices cannot be deleted", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.procurement.delete_invoice(id).await?;
    // delete_invoice never succeeds; this is unreachable in practice
    Ok(success_response(ApiResponse::<()>::success(())))
}
