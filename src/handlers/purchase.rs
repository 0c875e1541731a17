use axum::{extract::State, Extension};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::purchase::Purchase;
use crate::response::ApiResponse;
use crate::state::AppState;

// GET /purchases - ledger entries, newest first
#[instrument(skip(state, auth), fields(user_id = auth.user_id))]
pub async fn get_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<ApiResponse<Vec<Purchase>>, AppError> {
    let purchases = state.store.list_purchases(auth.user_id).await?;
    Ok(ApiResponse::ok("Purchases retrieved successfully", purchases))
}
