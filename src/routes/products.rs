use axum::{
    routing::{get, patch, post},
    Router,
};
use crate::handlers::product::{
    add_to_stock, bulk_delete_products, create_product, get_product, get_products, get_total_stock,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(get_products).post(create_product))
        .route("/products/total", get(get_total_stock))
        .route("/products/bulk-delete", post(bulk_delete_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/add", patch(add_to_stock))
}
