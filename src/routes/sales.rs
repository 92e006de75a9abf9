use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use crate::state::AppState;
use crate::handlers::sale;
use crate::middleware::auth::require_auth;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route("/sales/{id}", get(sale::get_sale))
        .route("/sales/{id}/cancel", post(sale::cancel_sale))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
