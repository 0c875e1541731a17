use axum::{routing::get, Router};
use crate::handlers::purchase::get_purchases;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/purchases", get(get_purchases))
}
