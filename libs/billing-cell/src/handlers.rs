// libs/billing-cell/src/handlers.rs
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{ApiPath, ApiQuery};

use crate::models::{BillingError, BillingQueryParams};
use crate::services::BillingGenerationService;

/// Maps each missing entity to its own 404.
fn billing_error_response(error: BillingError) -> AppError {
    match error {
        BillingError::AppointmentNotFound(_) => AppError::NotFound("Appointment not found".to_string()),
        BillingError::PatientNotFound(_) => AppError::NotFound("Patient not found".to_string()),
        BillingError::InsuranceProviderNotFound(_) => {
            AppError::NotFound("Insurance provider not found".to_string())
        }
        BillingError::DoctorNotFound(_) => AppError::NotFound("Doctor not found".to_string()),
        BillingError::SpecialtyPriceNotFound(_) => {
            AppError::NotFound("Specialty price not found".to_string())
        }
        BillingError::BillingRecordNotFound(_) => {
            AppError::NotFound("Billing record not found".to_string())
        }
        BillingError::Store(e) => AppError::Database(e.to_string()),
    }
}

#[axum::debug_handler]
pub async fn generate_billing(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    ApiPath(appointment_id): ApiPath<i64>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    info!("User {} requested billing for appointment {}", user.id, appointment_id);

    let service = BillingGenerationService::new(state.store.clone());
    let billing_record = service
        .generate_for_appointment(appointment_id, Utc::now().date_naive())
        .await
        .map_err(billing_error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "billing_record": billing_record,
            "message": "Billing record generated"
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_billing_record(
    State(state): State<AppState>,
    ApiPath(billing_id): ApiPath<i64>,
) -> Result<Json<Value>, AppError> {
    let service = BillingGenerationService::new(state.store.clone());
    let billing_record = service
        .get_billing_record(billing_id)
        .await
        .map_err(billing_error_response)?;

    Ok(Json(json!(billing_record)))
}

#[axum::debug_handler]
pub async fn list_billing_records(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BillingQueryParams>,
) -> Result<Json<Value>, AppError> {
    let service = BillingGenerationService::new(state.store.clone());
    let billing_records = service
        .list_billing_records(&params.into())
        .await
        .map_err(billing_error_response)?;

    Ok(Json(json!({
        "billing_records": billing_records,
        "total": billing_records.len()
    })))
}
