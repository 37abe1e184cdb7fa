// libs/billing-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn billing_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_billing_records))
        .route("/{billing_id}", get(handlers::get_billing_record))
        .route("/appointments/{appointment_id}", post(handlers::generate_billing))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
