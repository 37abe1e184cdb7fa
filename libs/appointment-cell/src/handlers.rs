// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{ApiJson, ApiPath};

use crate::models::{AppointmentError, UpdateAppointmentStatusRequest};
use crate::services::AppointmentStatusService;

/// Billing failures on this path are reported generically; the cause is
/// already logged by the service.
fn appointment_error_response(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::InvalidStatus(msg) => AppError::BadRequest(msg),
        AppointmentError::BillingGeneration(_) => {
            AppError::Internal("Failed to generate billing for appointment".to_string())
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    ApiPath(appointment_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentStatusService::new(state.store.clone());
    let appointment = service
        .get_appointment(appointment_id)
        .await
        .map_err(appointment_error_response)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(appointment_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateAppointmentStatusRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "User {} setting appointment {} status to {}",
        user.id, appointment_id, request.status
    );

    let service = AppointmentStatusService::new(state.store.clone());
    let outcome = service
        .update_status(appointment_id, request, Utc::now())
        .await
        .map_err(appointment_error_response)?;

    let message = if outcome.billing_record.is_some() {
        "Appointment completed and billing record generated"
    } else {
        "Appointment status updated"
    };

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "billing_record": outcome.billing_record,
        "message": message
    })))
}
