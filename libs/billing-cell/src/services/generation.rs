// libs/billing-cell/src/services/generation.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use shared_database::{BillingRecordFilter, ClinicStore, StoreError, StoreTransaction};
use shared_models::entities::{Appointment, BillingRecord, BillingStatus, NewBillingRecord};

use crate::models::BillingError;

/// Days between the processing date and the billing due date.
pub const BILLING_DUE_DAYS: i64 = 30;

pub fn due_date_for(processing_date: NaiveDate) -> NaiveDate {
    processing_date + Duration::days(BILLING_DUE_DAYS)
}

pub struct BillingGenerationService {
    store: Arc<dyn ClinicStore>,
}

impl BillingGenerationService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Walks patient → insurance → doctor → specialty price for `appointment`
    /// and builds the record to insert. Writes nothing.
    ///
    /// Patients without an insurance reference are billed as public-system
    /// patients: the record carries no insurance id and no tax id.
    pub async fn compute_billing_record(
        &self,
        appointment: &Appointment,
        processing_date: NaiveDate,
    ) -> Result<NewBillingRecord, BillingError> {
        debug!("Computing billing record for appointment {}", appointment.id);

        let patient = self
            .store
            .find_patient(appointment.patient_id)
            .await?
            .ok_or(BillingError::PatientNotFound(appointment.patient_id))?;

        let insurance = match patient.insurance_id {
            Some(insurance_id) => Some(
                self.store
                    .find_insurance_provider(insurance_id)
                    .await?
                    .ok_or(BillingError::InsuranceProviderNotFound(insurance_id))?,
            ),
            None => {
                debug!("Patient {} has no insurance, billing as public system", patient.id);
                None
            }
        };

        let doctor = self
            .store
            .find_doctor(appointment.doctor_id)
            .await?
            .ok_or(BillingError::DoctorNotFound(appointment.doctor_id))?;

        let price = self
            .store
            .find_specialty_price(&doctor.specialty)
            .await?
            .ok_or_else(|| BillingError::SpecialtyPriceNotFound(doctor.specialty.clone()))?;

        Ok(NewBillingRecord {
            patient_id: patient.id,
            doctor_id: doctor.id,
            insurance_id: insurance.as_ref().map(|provider| provider.id),
            insurance_tax_id: insurance.map(|provider| provider.tax_id),
            due_date: due_date_for(processing_date),
            amount: price.base_cost,
            appointment_id: appointment.id,
            status: BillingStatus::Pending,
        })
    }

    /// Generates a billing record directly from an appointment id, without
    /// touching the appointment itself. Repeated calls insert repeated records.
    pub async fn generate_for_appointment(
        &self,
        appointment_id: i64,
        processing_date: NaiveDate,
    ) -> Result<BillingRecord, BillingError> {
        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(BillingError::AppointmentNotFound(appointment_id))?;

        let record = self.compute_billing_record(&appointment, processing_date).await?;

        let mut transaction = StoreTransaction::new();
        transaction.insert_billing_record(record);
        let receipt = self.store.commit(transaction).await?;

        let billing_record = receipt.billing_record.ok_or_else(|| {
            warn!("Store returned no billing record for appointment {}", appointment_id);
            BillingError::Store(StoreError::Decode {
                entity: "billing record",
                message: "commit receipt has no billing record".to_string(),
            })
        })?;

        info!(
            "Billing record {} generated for appointment {} (amount {:.2}, due {})",
            billing_record.id, appointment_id, billing_record.amount, billing_record.due_date
        );

        Ok(billing_record)
    }

    pub async fn get_billing_record(&self, id: i64) -> Result<BillingRecord, BillingError> {
        self.store
            .find_billing_record(id)
            .await?
            .ok_or(BillingError::BillingRecordNotFound(id))
    }

    pub async fn list_billing_records(
        &self,
        filter: &BillingRecordFilter,
    ) -> Result<Vec<BillingRecord>, BillingError> {
        Ok(self.store.list_billing_records(filter).await?)
    }
}
