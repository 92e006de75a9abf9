use axum::{middleware, routing::{get, patch, post}, Router};
use crate::handlers::quote;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/quotations", get(quote::list_quotations).post(quote::create_quotation))
        .route("/quotations/{id}", get(quote::get_quotation))
        .route("/quotations/{id}/status", patch(quote::update_quotation_status))
        .route("/quotations/{id}/purchase", post(quote::convert_to_purchase))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
