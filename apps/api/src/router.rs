use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use billing_cell::router::billing_routes;
use shared_database::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital billing API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/billing", billing_routes(state))
}
