// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billing_cell::BillingError;
use shared_models::entities::{Appointment, BillingRecord};

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Body of a status update. `status` stays a raw string here so an unknown
/// value becomes a 400 from the service instead of an extractor rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentStatusRequest {
    pub status: String,
    #[serde(default, alias = "completionTimestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "cancellationReason")]
    pub cancellation_reason: Option<String>,
    #[serde(default, alias = "finalizedMarker")]
    pub finalized: Option<bool>,
}

impl UpdateAppointmentStatusRequest {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            completed_at: None,
            cancellation_reason: None,
            finalized: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusUpdateOutcome {
    pub appointment: Appointment,
    pub billing_record: Option<BillingRecord>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid appointment status: {0}")]
    InvalidStatus(String),

    #[error("Billing generation failed: {0}")]
    BillingGeneration(#[source] BillingError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
