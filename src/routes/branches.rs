use axum::{middleware, routing::get, Router};
use crate::handlers::branch;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/branches", get(branch::list_branches).post(branch::create_branch))
        .route(
            "/branches/{id}",
            get(branch::get_branch).put(branch::update_branch).delete(branch::delete_branch),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
