// libs/appointment-cell/src/services/status.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use billing_cell::BillingGenerationService;
use shared_database::{ClinicStore, StoreError, StoreTransaction};
use shared_models::entities::{Appointment, AppointmentStatus, AppointmentStatusChange};

use crate::models::{AppointmentError, StatusUpdateOutcome, UpdateAppointmentStatusRequest};

pub struct AppointmentStatusService {
    store: Arc<dyn ClinicStore>,
    billing: BillingGenerationService,
}

impl AppointmentStatusService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        let billing = BillingGenerationService::new(store.clone());
        Self { store, billing }
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        self.store
            .find_appointment(appointment_id)
            .await
            .map_err(store_error)?
            .ok_or(AppointmentError::NotFound)
    }

    /// Applies a status update. Completing an appointment also generates its
    /// billing record, and both writes are committed together: if billing
    /// cannot be computed the appointment keeps its previous status.
    ///
    /// `now` is the processing time. It fills in a missing completion
    /// timestamp and anchors the billing due date.
    pub async fn update_status(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentStatusRequest,
        now: DateTime<Utc>,
    ) -> Result<StatusUpdateOutcome, AppointmentError> {
        let status: AppointmentStatus = request
            .status
            .parse()
            .map_err(AppointmentError::InvalidStatus)?;

        let current = self.get_appointment(appointment_id).await?;
        debug!(
            "Updating appointment {} status: {} -> {}",
            appointment_id, current.status, status
        );

        let completed_at = match request.completed_at {
            Some(timestamp) => Some(timestamp),
            None if status.triggers_billing() && current.completed_at.is_none() => Some(now),
            None => None,
        };

        let change = AppointmentStatusChange {
            status: status.clone(),
            completed_at,
            cancellation_reason: request.cancellation_reason,
            finalized: request.finalized,
        };
        let updated = current.with_status_change(&change);

        let mut transaction = StoreTransaction::new();
        transaction.update_appointment_status(appointment_id, change);

        if status.triggers_billing() {
            let record = self
                .billing
                .compute_billing_record(&updated, now.date_naive())
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        warn!("Cannot bill appointment {}: {}", appointment_id, e);
                    } else {
                        error!("Billing generation failed for appointment {}: {}", appointment_id, e);
                    }
                    AppointmentError::BillingGeneration(e)
                })?;
            transaction.insert_billing_record(record);
        }

        let receipt = self.store.commit(transaction).await.map_err(store_error)?;

        let billing_record = receipt.billing_record;
        if let Some(record) = &billing_record {
            info!(
                "Appointment {} completed, billing record {} created",
                appointment_id, record.id
            );
        } else {
            info!("Appointment {} status set to {}", appointment_id, status);
        }

        Ok(StatusUpdateOutcome {
            appointment: receipt.appointment.unwrap_or(updated),
            billing_record,
        })
    }
}

fn store_error(error: StoreError) -> AppointmentError {
    match error {
        StoreError::NotFound { .. } => AppointmentError::NotFound,
        other => AppointmentError::DatabaseError(other.to_string()),
    }
}
