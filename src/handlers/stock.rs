use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::stock_level;
use crate::errors::ServiceError;
use crate::handlers::common::{default_page, default_per_page, success_response};
use crate::location::LocationRef;
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct StockLevelResponse {
    pub product_id: Uuid,
    pub location_type: String,
    pub location_id: Uuid,
    pub quantity: i32,
}

impl From<stock_level::Model> for StockLevelResponse {
    fn from(row: stock_level::Model) -> Self {
        Self {
            product_id: row.product_id,
            location_type: row.location_type,
            location_id: row.location_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StockListParams {
    pub product_id: Option<Uuid>,
    /// "warehouse" or "shop"; must be paired with `location_id`
    pub location_type: Option<String>,
    pub location_id: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct QuantityParams {
    pub product_id: Uuid,
    /// "warehouse" or "shop"
    pub location_type: String,
    pub location_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuantityResponse {
    pub product_id: Uuid,
    pub location_type: String,
    pub location_id: Uuid,
    /// Quantity on hand; zero when the pair has never held stock
    pub quantity: i32,
}

fn optional_location(
    location_type: &Option<String>,
    location_id: &Option<Uuid>,
) -> Result<Option<LocationRef>, ServiceError> {
    match (location_type, location_id) {
        (Some(kind), Some(id)) => Ok(Some(LocationRef::parse(kind, *id)?)),
        (None, None) => Ok(None),
        _ => Err(ServiceError::ValidationError(
            "location_type and location_id must be provided together".to_string(),
        )),
    }
}

/// Create the stock router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stock))
        .route("/quantity", get(stock_quantity))
}

/// List per-location stock rows with optional filters
#[utoipa::path(
    get,
    path = "/api/v1/stock",
    params(StockListParams),
    responses(
        (status = 200, description = "Stock list returned", body = [StockLevelResponse])
    ),
    tag = "stock"
)]
pub async fn list_stock(
    State(state): State<AppState>,
    Query(params): Query<StockListParams>,
) -> Result<Response, ServiceError> {
    let location = optional_location(&params.location_type, &params.location_id)?;

    let (rows, total) = state
        .services
        .inventory
        .list_stock(params.product_id, location, params.page, params.per_page)
        .await?;

    let items: Vec<StockLevelResponse> = rows.into_iter().map(StockLevelResponse::from).collect();
    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(items, total, params.page, params.per_page),
    )))
}

/// Quantity on hand for one product at one location
#[utoipa::path(
    get,
    path = "/api/v1/stock/quantity",
    params(QuantityParams),
    responses(
        (status = 200, description = "Quantity returned", body = QuantityResponse)
    ),
    tag = "stock"
)]
pub async fn stock_quantity(
    State(state): State<AppState>,
    Query(params): Query<QuantityParams>,
) -> Result<Response, ServiceError> {
    let location = LocationRef::parse(&params.location_type, params.location_id)?;

    let quantity = state
        .services
        .inventory
        .quantity(params.product_id, location)
        .await?;

    Ok(success_response(ApiResponse::success(QuantityResponse {
        product_id: params.product_id,
        location_type: params.location_type,
        location_id: params.location_id,
        quantity,
    })))
}
