use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{product, shop, supplier, warehouse};
use crate::errors::ServiceError;
use crate::handlers::common::{default_page, default_per_page, success_response};
use crate::{ApiResponse, AppState, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
}

impl From<product::Model> for ProductResponse {
    fn from(p: product::Model) -> Self {
        Self {
            id: p.id,
            sku: p.sku,
            name: p.name,
            unit_cost: p.unit_cost,
            unit_price: p.unit_price,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LocationResponse {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
}

impl From<warehouse::Model> for LocationResponse {
    fn from(w: warehouse::Model) -> Self {
        Self {
            id: w.id,
            name: w.name,
            address: w.address,
        }
    }
}

impl From<shop::Model> for LocationResponse {
    fn from(s: shop::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            address: s.address,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SupplierResponse {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(s: supplier::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            contact: s.contact,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProductListParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

/// Create the catalog router: dashboard read surfaces for products,
/// locations and suppliers
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/warehouses", get(list_warehouses))
        .route("/shops", get(list_shops))
        .route("/suppliers", get(list_suppliers))
}

/// List products ordered by SKU
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductListParams),
    responses(
        (status = 200, description = "Product list returned", body = [ProductResponse])
    ),
    tag = "catalog"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> Result<Response, ServiceError> {
    let (products, total) = state
        .services
        .catalog
        .list_products(params.page, params.per_page)
        .await?;

    let items: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(ApiResponse::success(
        PaginatedResponse::new(items, total, params.page, params.per_page),
    )))
}

/// Fetch one product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product returned", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(ApiResponse::success(
        ProductResponse::from(product),
    )))
}

/// List warehouses
#[utoipa::path(
    get,
    path = "/api/v1/warehouses",
    responses(
        (status = 200, description = "Warehouse list returned", body = [LocationResponse])
    ),
    tag = "catalog"
)]
pub async fn list_warehouses(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let warehouses = state.services.catalog.list_warehouses().await?;
    let items: Vec<LocationResponse> =
        warehouses.into_iter().map(LocationResponse::from).collect();
    Ok(success_response(ApiResponse::success(items)))
}

/// List shops
#[utoipa::path(
    get,
    path = "/api/v1/shops",
    responses(
        (status = 200, description = "Shop list returned", body = [LocationResponse])
    ),
    tag = "catalog"
)]
pub async fn list_shops(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let shops = state.services.catalog.list_shops().await?;
    let items: Vec<LocationResponse> = shops.into_iter().map(LocationResponse::from).collect();
    Ok(success_response(ApiResponse::success(items)))
}

/// List suppliers
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses(
        (status = 200, description = "Supplier list returned", body = [SupplierResponse])
    ),
    tag = "catalog"
)]
pub async fn list_suppliers(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let suppliers = state.services.catalog.list_suppliers().await?;
    let items: Vec<SupplierResponse> =
        suppliers.into_iter().map(SupplierResponse::from).collect();
    Ok(success_response(ApiResponse::success(items)))
}
