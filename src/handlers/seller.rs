use axum::{extract::State, Extension};
use tracing::{info, instrument};

use crate::dtos::seller::CreateSellerRequest;
use crate::error::AppError;
use crate::extract::{AppJson, AppPath};
use crate::middleware::auth::AuthContext;
use crate::models::seller::Seller;
use crate::response::ApiResponse;
use crate::state::AppState;

#[instrument(skip(state, auth, payload), fields(user_id = auth.user_id))]
pub async fn create_seller(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<CreateSellerRequest>,
) -> Result<ApiResponse<Seller>, AppError> {
    let new_seller = payload.validate(auth.user_id)?;
    let seller = state.store.insert_seller(new_seller).await?;
    info!(seller_id = seller.id, "Created seller");
    Ok(ApiResponse::created("Seller created successfully", seller))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_sellers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Vec<Seller>>, AppError> {
    let sellers = state.store.list_sellers(auth.user_id).await?;
    Ok(ApiResponse::ok("Sellers retrieved successfully", sellers))
}

#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_seller(
    AppPath(id): AppPath<i64>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Seller>, AppError> {
    let seller = state
        .store
        .find_owned_seller(id, auth.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Seller not found"))?;
    Ok(ApiResponse::ok("Seller retrieved successfully", seller))
}
