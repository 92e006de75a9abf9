use axum::{middleware, routing::get, Router};
use crate::handlers::inventory;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/inventory", get(inventory::list_lots))
        // Static segment wins over the capture below
        .route("/inventory/stock", get(inventory::stock_levels))
        .route("/inventory/{id}", get(inventory::get_lot))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
