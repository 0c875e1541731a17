pub mod catalog;
pub mod products;
pub mod purchases;
pub mod sellers;

use axum::{http::HeaderValue, middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub const API_BASE: &str = "/api/v1";

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .merge(products::routes())
        .merge(sellers::routes())
        .merge(catalog::routes())
        .merge(purchases::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health_check))
        .nest(API_BASE, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Permissive CORS unless a single allowed origin is configured.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer, ConfigError> {
    match origin {
        None => Ok(CorsLayer::permissive()),
        Some(origin) => {
            let value = origin.parse::<HeaderValue>().map_err(|_| ConfigError::Invalid {
                key: "CORS_ORIGIN",
                value: origin.to_string(),
            })?;
            Ok(CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
