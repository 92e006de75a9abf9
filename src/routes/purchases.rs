use axum::{middleware, routing::{get, post}, Router};
use crate::handlers::purchase;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/purchases", get(purchase::list_purchases).post(purchase::create_purchase))
        .route("/purchases/{id}", get(purchase::get_purchase))
        .route("/purchases/{id}/complete", post(purchase::complete_purchase))
        .route("/purchases/{id}/cancel", post(purchase::cancel_purchase))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
