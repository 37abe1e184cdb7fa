use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use shared_models::entities::{
    Appointment, BillingRecord, Doctor, InsuranceProvider, Patient, SpecialtyPrice,
};

use crate::store::{
    BillingRecordFilter, ClinicStore, CommitReceipt, StoreError, StoreTransaction,
};

/// Table contents used to seed a [`MemoryStore`], usually loaded from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSeed {
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub insurance_providers: Vec<InsuranceProvider>,
    #[serde(default)]
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub specialty_prices: Vec<SpecialtyPrice>,
    #[serde(default)]
    pub billing_records: Vec<BillingRecord>,
}

#[derive(Debug, Default)]
struct Tables {
    appointments: BTreeMap<i64, Appointment>,
    patients: BTreeMap<i64, Patient>,
    insurance_providers: BTreeMap<i64, InsuranceProvider>,
    doctors: BTreeMap<i64, Doctor>,
    specialty_prices: BTreeMap<i64, SpecialtyPrice>,
    billing_records: BTreeMap<i64, BillingRecord>,
    next_billing_id: i64,
}

/// In-process `ClinicStore`. Every commit runs under a single write lock.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_seed(ClinicSeed::default())
    }

    pub fn from_seed(seed: ClinicSeed) -> Self {
        let next_billing_id = seed
            .billing_records
            .iter()
            .map(|record| record.id)
            .max()
            .unwrap_or(0)
            + 1;

        let tables = Tables {
            appointments: seed.appointments.into_iter().map(|a| (a.id, a)).collect(),
            patients: seed.patients.into_iter().map(|p| (p.id, p)).collect(),
            insurance_providers: seed.insurance_providers.into_iter().map(|i| (i.id, i)).collect(),
            doctors: seed.doctors.into_iter().map(|d| (d.id, d)).collect(),
            specialty_prices: seed.specialty_prices.into_iter().map(|s| (s.id, s)).collect(),
            billing_records: seed.billing_records.into_iter().map(|b| (b.id, b)).collect(),
            next_billing_id,
        };

        Self {
            tables: RwLock::new(tables),
        }
    }

    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("cannot read {}: {}", path.display(), e)))?;
        let seed: ClinicSeed = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Seed(format!("invalid seed {}: {}", path.display(), e)))?;

        info!(
            "Loaded seed from {}: {} appointments, {} patients, {} doctors",
            path.display(),
            seed.appointments.len(),
            seed.patients.len(),
            seed.doctors.len()
        );

        Ok(Self::from_seed(seed))
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn find_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        Ok(self.tables.read().await.patients.get(&id).cloned())
    }

    async fn find_insurance_provider(&self, id: i64) -> Result<Option<InsuranceProvider>, StoreError> {
        Ok(self.tables.read().await.insurance_providers.get(&id).cloned())
    }

    async fn find_doctor(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        Ok(self.tables.read().await.doctors.get(&id).cloned())
    }

    async fn find_specialty_price(&self, specialty: &str) -> Result<Option<SpecialtyPrice>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .specialty_prices
            .values()
            .find(|price| price.specialty == specialty)
            .cloned())
    }

    async fn find_billing_record(&self, id: i64) -> Result<Option<BillingRecord>, StoreError> {
        Ok(self.tables.read().await.billing_records.get(&id).cloned())
    }

    async fn list_billing_records(
        &self,
        filter: &BillingRecordFilter,
    ) -> Result<Vec<BillingRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .billing_records
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn commit(&self, transaction: StoreTransaction) -> Result<CommitReceipt, StoreError> {
        let mut tables = self.tables.write().await;

        // Validate before the first write so a failed commit leaves no trace.
        let updated_appointment = match transaction.appointment_update() {
            Some((id, change)) => {
                let current = tables.appointments.get(&id).ok_or_else(|| StoreError::NotFound {
                    entity: "appointment",
                    id: id.to_string(),
                })?;
                Some(current.with_status_change(change))
            }
            None => None,
        };

        if let Some(appointment) = &updated_appointment {
            tables.appointments.insert(appointment.id, appointment.clone());
        }

        let billing_record = transaction.billing_insert().map(|new_record| {
            let id = tables.next_billing_id;
            tables.next_billing_id += 1;
            let record = new_record.clone().into_record(id);
            tables.billing_records.insert(id, record.clone());
            record
        });

        debug!(
            "Memory commit applied (appointment: {:?}, billing record: {:?})",
            updated_appointment.as_ref().map(|a| a.id),
            billing_record.as_ref().map(|b| b.id)
        );

        Ok(CommitReceipt {
            appointment: updated_appointment,
            billing_record,
        })
    }
}
