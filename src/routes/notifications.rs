use axum::{middleware, routing::{get, patch}, Router};
use crate::handlers::notification::{list_notifications, mark_read};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", patch(mark_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
