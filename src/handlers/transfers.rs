use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::commands::transfers::{CreateTransferCommand, TransferLine, UpdateTransferCommand};
use crate::errors::ServiceError;
use crate::handlers::common::{
    created_response, default_page, default_per_page, no_content_response, parse_date_range,
    success_response,
};
use crate::location::LocationRef;
use crate::services::transfers::TransferWithItems;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Body for creating or rewriting a transfer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// "warehouse" or "shop"
    pub source_type: String,
    pub source_id: Uuid,
    /// "warehouse" or "shop"
    pub destination_type: String,
    pub destination_id: Uuid,
    pub items: Vec<TransferItemRequest>,
}

impl TransferRequest {
    fn locations(&self) -> Result<(LocationRef, LocationRef), ServiceError> {
        Ok((
            LocationRef::parse(&self.source_type, self.source_id)?,
            LocationRef::parse(&self.destination_type, self.destination_id)?,
        ))
    }

    fn lines(&self) -> Vec<TransferLine> {
        self.items
            .iter()
            .map(|i| TransferLine {
                product_id: i.product_id,
                quantity: i.quantity,
            })
            .collect()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    pub id: Uuid,
    pub source_type: String,
    pub source_id: Uuid,
    pub destination_type: String,
    pub destination_id: Uuid,
    pub status: String,
    #[schema(value_type = String, format = DateTime)]
    pub transferred_at: DateTimeWithTimeZone,
    pub items: Vec<TransferItemResponse>,
}

impl From<TransferWithItems> for TransferResponse {
    fn from(record: TransferWithItems) -> Self {
        Self {
            id: record.transfer.id,
            source_type: record.transfer.source_type,
            source_id: record.transfer.source_id,
            destination_type: record.transfer.destination_type,
            destination_id: record.transfer.destination_id,
            status: record.transfer.status,
            transferred_at: record.transfer.transferred_at,
            items: record
                .items
                .into_iter()
                .map(|i| TransferItemResponse {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransferListParams {
    /// Inclusive lower bound, `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`
    pub end_date: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityParams {
    pub product_id: Uuid,
    /// "warehouse" or "shop"
    pub location_type: String,
    pub location_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub location_type: String,
    pub location_id: Uuid,
    /// Quantity the edit dialog may move out of this location, counting the
    /// transfer's own reservation as returned
    pub available: i32,
}

/// Create the transfers router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transfers).post(create_transfer))
        .route(
            "/:id",
            get(get_transfer).put(update_transfer).delete(delete_transfer),
        )
        .route("/:id/available", get(transfer_availability))
}

/// Create a transfer and apply its stock movement atomically
#[utoipa::path(
    post,
    path = "/api/v1/transfers",
    request_body = TransferRequest,
    responses(
        (status = 201, description = "Transfer applied", body = TransferResponse),
        (status = 400, description = "Malformed request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or location", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock at the source", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(payload): Json<TransferRequest>,
) -> Result<Response, ServiceError> {
    let (source, destination) = payload.locations()?;
    let command = CreateTransferCommand {
        source,
        destination,
        items: payload.lines(),
    };

    let record = state.services.transfers.create_transfer(command).await?;
    Ok(created_response(ApiResponse::success(
        TransferResponse::from(record),
    )))
}

/// List transfers, newest first
#[utoipa::path(
    get,
    path = "/api/v1/transfers",
    params(TransferListParams),
    responses(
        (status = 200, description = "Transfer list returned", body = [TransferResponse])
    ),
    tag = "transfers"
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(params): Query<TransferListParams>,
) -> Result<Response, ServiceError> {
    let range = parse_date_range(params.start_date.as_deref(), params.end_date.as_deref())?;

    let (transfers, total) = state
        .services
        .transfers
        .list_transfers(range, params.page, params.per_page)
        .await?;

    let items: Vec<TransferResponse> = transfers.into_iter().map(TransferResponse::from).collect();
    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(items, total, params.page, params.per_page),
    )))
}

/// Fetch one transfer with its items
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Transfer returned", body = TransferResponse),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let record = state.services.transfers.get_transfer(id).await?;
    Ok(success_response(ApiResponse::success(
        TransferResponse::from(record),
    )))
}

/// Rewrite a transfer: the original movement is reversed and the new one
/// applied in a single transaction
#[utoipa::path(
    put,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer id")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer rewritten", body = TransferResponse),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock for the new movement", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn update_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransferRequest>,
) -> Result<Response, ServiceError> {
    let (source, destination) = payload.locations()?;
    let command = UpdateTransferCommand {
        transfer_id: id,
        source,
        destination,
        items: payload.lines(),
    };

    let record = state.services.transfers.update_transfer(command).await?;
    Ok(success_response(ApiResponse::success(
        TransferResponse::from(record),
    )))
}

/// Delete a transfer after reversing its stock movement
#[utoipa::path(
    delete,
    path = "/api/v1/transfers/{id}",
    params(("id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 204, description = "Transfer reversed and deleted"),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Destination stock already consumed", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn delete_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.transfers.delete_transfer(id).await?;
    Ok(no_content_response())
}

/// Availability of a product at a location while editing this transfer
#[utoipa::path(
    get,
    path = "/api/v1/transfers/{id}/available",
    params(("id" = Uuid, Path, description = "Transfer id"), AvailabilityParams),
    responses(
        (status = 200, description = "Available quantity returned", body = AvailabilityResponse),
        (status = 404, description = "Transfer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn transfer_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Response, ServiceError> {
    let location = LocationRef::parse(&params.location_type, params.location_id)?;

    let available = state
        .services
        .transfers
        .available_quantity(params.product_id, location, Some(id))
        .await?;

    Ok(success_response(ApiResponse::success(AvailabilityResponse {
        product_id: params.product_id,
        location_type: params.location_type,
        location_id: params.location_id,
        available,
    })))
}
