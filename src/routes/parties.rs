use axum::{middleware, routing::{get, post}, Router};
use crate::handlers::party;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/clients", get(party::list_clients).post(party::create_client))
        .route(
            "/clients/{id}",
            get(party::get_client).put(party::update_client).delete(party::delete_client),
        )
        .route("/clients/{id}/payments", post(party::record_client_payment))
        .route("/suppliers", get(party::list_suppliers).post(party::create_supplier))
        .route(
            "/suppliers/{id}",
            get(party::get_supplier).put(party::update_supplier).delete(party::delete_supplier),
        )
        .route("/suppliers/{id}/payments", post(party::record_supplier_payment))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
