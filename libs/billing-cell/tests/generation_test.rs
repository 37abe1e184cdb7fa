use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::mock;

use billing_cell::models::BillingError;
use billing_cell::services::BillingGenerationService;
use shared_database::{
    BillingRecordFilter, ClinicStore, CommitReceipt, MemoryStore, StoreError, StoreTransaction,
};
use shared_models::entities::{
    Appointment, BillingRecord, BillingStatus, Doctor, InsuranceProvider, Patient, SpecialtyPrice,
};
use shared_utils::test_utils::ClinicFixtures;

mock! {
    pub Store {}

    #[async_trait]
    impl ClinicStore for Store {
        async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError>;
        async fn find_patient(&self, id: i64) -> Result<Option<Patient>, StoreError>;
        async fn find_insurance_provider(&self, id: i64) -> Result<Option<InsuranceProvider>, StoreError>;
        async fn find_doctor(&self, id: i64) -> Result<Option<Doctor>, StoreError>;
        async fn find_specialty_price(&self, specialty: &str) -> Result<Option<SpecialtyPrice>, StoreError>;
        async fn find_billing_record(&self, id: i64) -> Result<Option<BillingRecord>, StoreError>;
        async fn list_billing_records(&self, filter: &BillingRecordFilter) -> Result<Vec<BillingRecord>, StoreError>;
        async fn commit(&self, transaction: StoreTransaction) -> Result<CommitReceipt, StoreError>;
    }
}

fn processing_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn fixture_service() -> (BillingGenerationService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::from_seed(ClinicFixtures::seed()));
    (BillingGenerationService::new(store.clone()), store)
}

async fn billing_count(store: &MemoryStore) -> usize {
    store
        .list_billing_records(&BillingRecordFilter::default())
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn test_generates_record_for_insured_patient() {
    let (service, store) = fixture_service();

    let record = service
        .generate_for_appointment(123, processing_date())
        .await
        .unwrap();

    assert_eq!(record.patient_id, 1);
    assert_eq!(record.doctor_id, 5);
    assert_eq!(record.insurance_id, Some(ClinicFixtures::UNIMED_ID));
    assert_eq!(record.insurance_tax_id.as_deref(), Some(ClinicFixtures::UNIMED_TAX_ID));
    assert_eq!(record.amount, 250.0);
    assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    assert_eq!(record.appointment_id, 123);
    assert_eq!(record.status, BillingStatus::Pending);

    let stored = store.find_billing_record(record.id).await.unwrap();
    assert_eq!(stored, Some(record));
}

#[tokio::test]
async fn test_uninsured_patient_is_billed_without_insurance() {
    let (service, _store) = fixture_service();

    let record = service
        .generate_for_appointment(125, processing_date())
        .await
        .unwrap();

    assert_eq!(record.patient_id, 2);
    assert_eq!(record.insurance_id, None);
    assert_eq!(record.insurance_tax_id, None);
    assert_eq!(record.amount, ClinicFixtures::CARDIOLOGY_COST);
}

#[tokio::test]
async fn test_generation_does_not_change_appointment() {
    let (service, store) = fixture_service();
    let before = store.find_appointment(123).await.unwrap();

    service.generate_for_appointment(123, processing_date()).await.unwrap();

    assert_eq!(store.find_appointment(123).await.unwrap(), before);
}

#[tokio::test]
async fn test_each_missing_entity_has_its_own_error() {
    let (service, store) = fixture_service();

    assert_matches!(
        service.generate_for_appointment(999, processing_date()).await,
        Err(BillingError::AppointmentNotFound(999))
    );
    assert_matches!(
        service.generate_for_appointment(128, processing_date()).await,
        Err(BillingError::PatientNotFound(77))
    );
    assert_matches!(
        service.generate_for_appointment(127, processing_date()).await,
        Err(BillingError::InsuranceProviderNotFound(99))
    );
    assert_matches!(
        service.generate_for_appointment(124, processing_date()).await,
        Err(BillingError::DoctorNotFound(404))
    );
    assert_matches!(
        service.generate_for_appointment(126, processing_date()).await,
        Err(BillingError::SpecialtyPriceNotFound(ref specialty)) if specialty == "Dermatologia"
    );

    assert_eq!(billing_count(&store).await, 0);
}

#[tokio::test]
async fn test_repeated_generation_inserts_duplicates() {
    let (service, store) = fixture_service();

    let first = service.generate_for_appointment(123, processing_date()).await.unwrap();
    let second = service.generate_for_appointment(123, processing_date()).await.unwrap();

    assert_ne!(first.id, second.id);
    let records = store
        .list_billing_records(&BillingRecordFilter::for_appointment(123))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_compute_writes_nothing() {
    let (service, store) = fixture_service();
    let appointment = store.find_appointment(123).await.unwrap().unwrap();

    let record = service
        .compute_billing_record(&appointment, processing_date())
        .await
        .unwrap();

    assert_eq!(record.amount, 250.0);
    assert_eq!(billing_count(&store).await, 0);
}

#[tokio::test]
async fn test_store_failure_during_lookup_aborts_before_commit() {
    let mut store = MockStore::new();
    store
        .expect_find_appointment()
        .returning(|id| Ok(Some(ClinicFixtures::appointment(id, 1, 5))));
    store
        .expect_find_patient()
        .returning(|_| Err(StoreError::Request("connection reset".to_string())));
    store.expect_commit().never();

    let service = BillingGenerationService::new(Arc::new(store));
    let result = service.generate_for_appointment(123, processing_date()).await;

    assert_matches!(result, Err(BillingError::Store(StoreError::Request(_))));
}

#[tokio::test]
async fn test_specialty_is_looked_up_by_doctor_specialty() {
    let mut store = MockStore::new();
    store
        .expect_find_appointment()
        .returning(|id| Ok(Some(ClinicFixtures::appointment(id, 2, 6))));
    store
        .expect_find_patient()
        .returning(|id| Ok(Some(ClinicFixtures::patient(id, "João Lima", "987.654.321-00", None))));
    store.expect_find_insurance_provider().never();
    store
        .expect_find_doctor()
        .returning(|id| Ok(Some(ClinicFixtures::doctor(id, "Beatriz Prado", "Dermatologia"))));
    store
        .expect_find_specialty_price()
        .withf(|specialty: &str| specialty == "Dermatologia")
        .times(1)
        .returning(|specialty: &str| {
            Ok(Some(SpecialtyPrice {
                id: 9,
                specialty: specialty.to_string(),
                base_cost: 180.0,
            }))
        });
    store.expect_commit().times(1).returning(|transaction| {
        let record = transaction.billing_insert().cloned().map(|new| new.into_record(1));
        Ok(CommitReceipt {
            appointment: None,
            billing_record: record,
        })
    });

    let service = BillingGenerationService::new(Arc::new(store));
    let record = service.generate_for_appointment(200, processing_date()).await.unwrap();

    assert_eq!(record.amount, 180.0);
    assert_eq!(record.doctor_id, 6);
}

#[tokio::test]
async fn test_commit_without_billing_record_is_a_store_error() {
    let mut store = MockStore::new();
    store
        .expect_find_appointment()
        .returning(|id| Ok(Some(ClinicFixtures::appointment(id, 2, 5))));
    store
        .expect_find_patient()
        .returning(|id| Ok(Some(ClinicFixtures::patient(id, "João Lima", "987.654.321-00", None))));
    store
        .expect_find_doctor()
        .returning(|id| Ok(Some(ClinicFixtures::doctor(id, "Carlos Mendes", "Cardiologia"))));
    store.expect_find_specialty_price().returning(|specialty: &str| {
        Ok(Some(SpecialtyPrice {
            id: 1,
            specialty: specialty.to_string(),
            base_cost: ClinicFixtures::CARDIOLOGY_COST,
        }))
    });
    store
        .expect_commit()
        .times(1)
        .returning(|_| Ok(CommitReceipt::default()));

    let service = BillingGenerationService::new(Arc::new(store));
    let result = service.generate_for_appointment(123, processing_date()).await;

    assert_matches!(
        result,
        Err(BillingError::Store(StoreError::Decode { entity: "billing record", .. }))
    );
    assert!(!result.unwrap_err().is_not_found());
}
