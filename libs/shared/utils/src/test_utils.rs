use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use shared_config::{AppConfig, StoreBackend};
use shared_database::{AppState, ClinicSeed, MemoryStore};
use shared_models::auth::{JwtClaims, User};
use shared_models::entities::{
    Appointment, AppointmentStatus, Doctor, InsuranceProvider, Patient, SpecialtyPrice,
};

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            store_backend: StoreBackend::Memory,
            seed_file: None,
            api_port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    /// State backed by a `MemoryStore` holding `seed`. The store is returned
    /// too so tests can inspect it after a request.
    pub fn to_state(&self, seed: ClinicSeed) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::from_seed(seed));
        let state = AppState::new(self.to_app_config(), store.clone());
        (state, store)
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("reception@example.com", "receptionist")
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: format!("user-{}", email.split('@').next().unwrap_or(email)),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let claims = JwtClaims {
            sub: user.id.clone(),
            exp: exp.timestamp().max(0) as u64,
            email: Some(user.email.clone()),
            role: Some(user.role.clone()),
            user_metadata: None,
            aud: Some("authenticated".to_string()),
            iat: Some(now.timestamp() as u64),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("HS256 encoding cannot fail for an in-memory key")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }

    pub fn bearer(user: &TestUser, secret: &str) -> String {
        format!("Bearer {}", Self::create_test_token(user, secret, Some(1)))
    }
}

/// Reference data for the billing workflow. Appointment ids encode the case
/// they exercise:
///
/// * 123: insured patient 1 (Unimed), doctor 5 (Cardiologia, 250.00)
/// * 124: doctor 404 does not exist
/// * 125: uninsured patient 2
/// * 126: doctor 6 whose specialty has no price
/// * 127: patient 3 references missing insurance provider 99
/// * 128: patient 77 does not exist
pub struct ClinicFixtures;

impl ClinicFixtures {
    pub const UNIMED_ID: i64 = 3;
    pub const UNIMED_TAX_ID: &'static str = "12.345.678/0001-00";
    pub const CARDIOLOGY_COST: f64 = 250.0;

    pub fn seed() -> ClinicSeed {
        ClinicSeed {
            appointments: vec![
                Self::appointment(123, 1, 5),
                Self::appointment(124, 1, 404),
                Self::appointment(125, 2, 5),
                Self::appointment(126, 1, 6),
                Self::appointment(127, 3, 5),
                Self::appointment(128, 77, 5),
            ],
            patients: vec![
                Self::patient(1, "Maria Souza", "123.456.789-00", Some(Self::UNIMED_ID)),
                Self::patient(2, "João Lima", "987.654.321-00", None),
                Self::patient(3, "Ana Ribeiro", "111.222.333-44", Some(99)),
            ],
            insurance_providers: vec![InsuranceProvider {
                id: Self::UNIMED_ID,
                name: "Unimed".to_string(),
                tax_id: Self::UNIMED_TAX_ID.to_string(),
            }],
            doctors: vec![
                Self::doctor(5, "Carlos Mendes", "Cardiologia"),
                Self::doctor(6, "Beatriz Prado", "Dermatologia"),
            ],
            specialty_prices: vec![SpecialtyPrice {
                id: 1,
                specialty: "Cardiologia".to_string(),
                base_cost: Self::CARDIOLOGY_COST,
            }],
            billing_records: vec![],
        }
    }

    pub fn appointment(id: i64, patient_id: i64, doctor_id: i64) -> Appointment {
        Appointment {
            id,
            patient_id,
            doctor_id,
            scheduled_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .single()
                .expect("valid fixture timestamp"),
            status: AppointmentStatus::Confirmed,
            cancellation_reason: None,
            completed_at: None,
            notes: None,
            finalized: false,
        }
    }

    pub fn patient(id: i64, name: &str, national_id: &str, insurance_id: Option<i64>) -> Patient {
        Patient {
            id,
            full_name: name.to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 12).expect("valid fixture date"),
            national_id: national_id.to_string(),
            insurance_id,
        }
    }

    pub fn doctor(id: i64, name: &str, specialty: &str) -> Doctor {
        Doctor {
            id,
            full_name: name.to_string(),
            license_id: format!("CRM-SP {}", 100000 + id),
            specialty: specialty.to_string(),
            phone: None,
            email: None,
            shift: Some("manhã".to_string()),
        }
    }
}
