use axum::{middleware, routing::{delete, get, patch}, Router};
use crate::handlers::logistics;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(logistics::list_vehicles).post(logistics::create_vehicle))
        .route(
            "/vehicles/{id}",
            get(logistics::get_vehicle).put(logistics::update_vehicle).delete(logistics::delete_vehicle),
        )
        .route("/deliveries", get(logistics::list_deliveries).post(logistics::create_delivery))
        .route("/deliveries/{id}", get(logistics::get_delivery))
        .route("/deliveries/{id}/status", patch(logistics::update_delivery_status))
        .route("/pickups", get(logistics::list_pickups).post(logistics::create_pickup))
        .route("/pickups/{id}", get(logistics::get_pickup))
        .route("/pickups/{id}/status", patch(logistics::update_pickup_status))
        .route("/logistics-expenses", get(logistics::list_expenses).post(logistics::create_expense))
        .route("/logistics-expenses/{id}", delete(logistics::delete_expense))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
