// src/handlers/product.rs
use axum::{extract::State, Extension};
use tracing::instrument;

use crate::dtos::product::{
    AddStockRequest, BulkDeleteRequest, BulkDeleteResponse, CreateProductRequest, ProductListQuery,
    TotalStockResponse,
};
use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::AuthContext;
use crate::models::product::{Product, ProductPage};
use crate::response::ApiResponse;
use crate::services::product as products;
use crate::state::AppState;

// POST /products
#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = products::create(state.store.as_ref(), payload, auth.user_id).await?;
    Ok(ApiResponse::created("Product created successfully", product))
}

// GET /products
#[instrument(skip(state, auth, query), fields(user_id = auth.user_id))]
pub async fn get_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(query): AppQuery<ProductListQuery>,
) -> Result<ApiResponse<ProductPage>, AppError> {
    let page = products::read_all(state.store.as_ref(), query, auth.user_id).await?;
    Ok(ApiResponse::ok("Products retrieved successfully", page))
}

// GET /products/total
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_total_stock(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<TotalStockResponse>, AppError> {
    let total_quantity = products::count_total_product(state.store.as_ref(), auth.user_id).await?;
    Ok(ApiResponse::ok(
        "Total stock counted successfully",
        TotalStockResponse { total_quantity },
    ))
}

// GET /products/{id}
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_product(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Option<Product>>, AppError> {
    let product = products::read(state.store.as_ref(), id, auth.user_id).await?;
    Ok(ApiResponse::ok("Product retrieved successfully", product))
}

// POST /products/bulk-delete
#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn bulk_delete_products(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<BulkDeleteRequest>,
) -> Result<ApiResponse<BulkDeleteResponse>, AppError> {
    let deleted_count = products::bulk_delete(state.store.as_ref(), &payload.ids).await?;
    Ok(ApiResponse::ok(
        "Products deleted successfully",
        BulkDeleteResponse { deleted_count },
    ))
}

// PATCH /products/{id}/add
#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn add_to_stock(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<AddStockRequest>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = products::add_to_stock(state.store.as_ref(), id, payload, auth.user_id).await?;
    Ok(ApiResponse::ok("Product stock updated successfully", product))
}
