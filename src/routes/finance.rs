use axum::{middleware, routing::get, Router};
use crate::handlers::finance::get_statement;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/finance/statement", get(get_statement))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
