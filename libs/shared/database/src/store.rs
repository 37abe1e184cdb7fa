use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::entities::{
    Appointment, AppointmentStatusChange, BillingRecord, BillingStatus, Doctor,
    InsuranceProvider, NewBillingRecord, Patient, SpecialtyPrice,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Authentication error: {0}")]
    Unauthorized(String),

    #[error("Store request failed: {0}")]
    Request(String),

    #[error("Failed to decode {entity}: {message}")]
    Decode { entity: &'static str, message: String },

    #[error("Seed data error: {0}")]
    Seed(String),
}

/// Filters for listing billing records. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillingRecordFilter {
    pub appointment_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub status: Option<BillingStatus>,
}

impl BillingRecordFilter {
    pub fn for_appointment(appointment_id: i64) -> Self {
        Self {
            appointment_id: Some(appointment_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &BillingRecord) -> bool {
        self.appointment_id.map_or(true, |id| record.appointment_id == id)
            && self.patient_id.map_or(true, |id| record.patient_id == id)
            && self.status.as_ref().map_or(true, |status| &record.status == status)
    }
}

/// Writes staged for one atomic commit. Nothing reaches the store until the
/// transaction is handed to [`ClinicStore::commit`]; dropping it discards
/// every staged write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreTransaction {
    appointment_update: Option<(i64, AppointmentStatusChange)>,
    billing_insert: Option<NewBillingRecord>,
}

impl StoreTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_appointment_status(
        &mut self,
        appointment_id: i64,
        change: AppointmentStatusChange,
    ) -> &mut Self {
        self.appointment_update = Some((appointment_id, change));
        self
    }

    pub fn insert_billing_record(&mut self, record: NewBillingRecord) -> &mut Self {
        self.billing_insert = Some(record);
        self
    }

    pub fn appointment_update(&self) -> Option<(i64, &AppointmentStatusChange)> {
        self.appointment_update.as_ref().map(|(id, change)| (*id, change))
    }

    pub fn billing_insert(&self) -> Option<&NewBillingRecord> {
        self.billing_insert.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.appointment_update.is_none() && self.billing_insert.is_none()
    }
}

/// What a successful commit wrote.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommitReceipt {
    pub appointment: Option<Appointment>,
    pub billing_record: Option<BillingRecord>,
}

/// The relational store behind the clinic API.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError>;

    async fn find_patient(&self, id: i64) -> Result<Option<Patient>, StoreError>;

    async fn find_insurance_provider(&self, id: i64) -> Result<Option<InsuranceProvider>, StoreError>;

    async fn find_doctor(&self, id: i64) -> Result<Option<Doctor>, StoreError>;

    /// Exact, case-sensitive match on the specialty name.
    async fn find_specialty_price(&self, specialty: &str) -> Result<Option<SpecialtyPrice>, StoreError>;

    async fn find_billing_record(&self, id: i64) -> Result<Option<BillingRecord>, StoreError>;

    async fn list_billing_records(
        &self,
        filter: &BillingRecordFilter,
    ) -> Result<Vec<BillingRecord>, StoreError>;

    /// Applies every staged write or none of them. A staged status update on
    /// a missing appointment fails with [`StoreError::NotFound`].
    async fn commit(&self, transaction: StoreTransaction) -> Result<CommitReceipt, StoreError>;
}
