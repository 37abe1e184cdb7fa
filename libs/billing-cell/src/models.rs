// libs/billing-cell/src/models.rs
use serde::{Deserialize, Serialize};

use shared_database::{BillingRecordFilter, StoreError};
use shared_models::entities::BillingStatus;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingQueryParams {
    pub appointment_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<BillingStatus>,
}

impl From<BillingQueryParams> for BillingRecordFilter {
    fn from(params: BillingQueryParams) -> Self {
        BillingRecordFilter {
            appointment_id: params.appointment_id,
            patient_id: params.patient_id,
            status: params.status,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Failures of the billing lookup chain. Each missing entity has its own
/// variant so callers can choose how much to reveal.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("Appointment {0} not found")]
    AppointmentNotFound(i64),

    #[error("Patient {0} not found")]
    PatientNotFound(i64),

    #[error("Insurance provider {0} not found")]
    InsuranceProviderNotFound(i64),

    #[error("Doctor {0} not found")]
    DoctorNotFound(i64),

    #[error("No specialty price for {0}")]
    SpecialtyPriceNotFound(String),

    #[error("Billing record {0} not found")]
    BillingRecordNotFound(i64),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),
}

impl BillingError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, BillingError::Store(_))
    }
}
