// Categories and brands: named labels a product can point at.
use axum::{extract::State, Extension};
use tracing::info;

use crate::dtos::catalog::CreateCatalogEntryRequest;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::auth::AuthContext;
use crate::models::catalog::{CatalogEntry, CatalogKind};
use crate::response::ApiResponse;
use crate::state::AppState;

async fn create_entry(
    state: AppState,
    kind: CatalogKind,
    user_id: i64,
    payload: CreateCatalogEntryRequest,
) -> Result<ApiResponse<CatalogEntry>, AppError> {
    let name = payload.validate(kind)?;
    let entry = state.store.insert_catalog_entry(kind, user_id, name).await?;
    info!(kind = kind.label(), id = entry.id, "Created catalog entry");
    Ok(ApiResponse::created(format!("{} created successfully", kind.label()), entry))
}

async fn list_entries(
    state: AppState,
    kind: CatalogKind,
    user_id: i64,
) -> Result<ApiResponse<Vec<CatalogEntry>>, AppError> {
    let entries = state.store.list_catalog_entries(kind, user_id).await?;
    Ok(ApiResponse::ok(format!("{} list retrieved successfully", kind.label()), entries))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<CreateCatalogEntryRequest>,
) -> Result<ApiResponse<CatalogEntry>, AppError> {
    create_entry(state, CatalogKind::Category, auth.user_id, payload).await
}

pub async fn get_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Vec<CatalogEntry>>, AppError> {
    list_entries(state, CatalogKind::Category, auth.user_id).await
}

pub async fn create_brand(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(payload): AppJson<CreateCatalogEntryRequest>,
) -> Result<ApiResponse<CatalogEntry>, AppError> {
    create_entry(state, CatalogKind::Brand, auth.user_id, payload).await
}

pub async fn get_brands(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Vec<CatalogEntry>>, AppError> {
    list_entries(state, CatalogKind::Brand, auth.user_id).await
}
