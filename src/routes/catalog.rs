use axum::{routing::get, Router};
use crate::handlers::catalog::{create_brand, create_category, get_brands, get_categories};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(get_categories).post(create_category))
        .route("/brands", get(get_brands).post(create_brand))
}
