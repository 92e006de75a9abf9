use axum::{middleware, routing::get, Router};
use crate::handlers::fixed_asset;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/fixed-assets", get(fixed_asset::list_assets).post(fixed_asset::create_asset))
        .route(
            "/fixed-assets/{id}",
            get(fixed_asset::get_asset).put(fixed_asset::update_asset).delete(fixed_asset::delete_asset),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
