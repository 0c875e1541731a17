use axum::{routing::get, Router};
use crate::handlers::seller::{create_seller, get_seller, get_sellers};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sellers", get(get_sellers).post(create_seller))
        .route("/sellers/{id}", get(get_seller))
}
