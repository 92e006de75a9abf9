pub mod users;
pub mod branches;
pub mod products;
pub mod inventory;
pub mod parties;
pub mod purchases;
pub mod sales;
pub mod quotations;
pub mod fixed_assets;
pub mod logistics;
pub mod finance;
pub mod notifications;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(users::routes(state))
        .merge(branches::routes(state))
        .merge(products::routes(state))
        .merge(inventory::routes(state))
        .merge(parties::routes(state))
        .merge(purchases::routes(state))
        .merge(sales::routes(state))
        .merge(quotations::routes(state))
        .merge(fixed_assets::routes(state))
        .merge(logistics::routes(state))
        .merge(finance::routes(state))
        .merge(notifications::routes(state))
}
