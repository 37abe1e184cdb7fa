use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_models::entities::{
    Appointment, BillingRecord, Doctor, InsuranceProvider, Patient, SpecialtyPrice,
};

use crate::store::{
    BillingRecordFilter, ClinicStore, CommitReceipt, StoreError, StoreTransaction,
};

const COMMIT_FUNCTION_PATH: &str = "/rest/v1/rpc/commit_appointment_billing";

/// Code `commit_appointment_billing` raises, with HTTP status 404, when the
/// status change targets a missing appointment. Other 404s (an unknown
/// function, for one) carry PostgREST's own `PGRST*` codes.
const MISSING_APPOINTMENT_CODE: &str = "P0002";

/// `code` field of a PostgREST error body.
fn error_code(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("code")?
        .as_str()
        .map(str::to_string)
}

#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<SupabaseError> for StoreError {
    fn from(err: SupabaseError) -> Self {
        match err {
            SupabaseError::Auth(msg) => StoreError::Unauthorized(msg),
            other => StoreError::Request(other.to_string()),
        }
    }
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, SupabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, SupabaseError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => SupabaseError::Auth(error_text),
                404 => SupabaseError::NotFound(error_text),
                _ => SupabaseError::Api {
                    status,
                    message: error_text,
                },
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }
}

/// `ClinicStore` over Supabase's PostgREST interface.
pub struct SupabaseStore {
    client: SupabaseClient,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    appointment: Option<Appointment>,
    billing_record: Option<BillingRecord>,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: SupabaseClient::new(config),
            api_key: config.store_api_key().to_string(),
        }
    }

    async fn fetch_first<T>(&self, entity: &'static str, path: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, path, Some(&self.api_key), None)
            .await?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    entity,
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn billing_query(filter: &BillingRecordFilter) -> String {
        let mut query_parts = vec![];

        if let Some(appointment_id) = filter.appointment_id {
            query_parts.push(format!("appointment_id=eq.{}", appointment_id));
        }
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = &filter.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        query_parts.push("order=id.asc".to_string());

        format!("/rest/v1/billing_records?{}", query_parts.join("&"))
    }
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        self.fetch_first("appointment", &format!("/rest/v1/appointments?id=eq.{}", id))
            .await
    }

    async fn find_patient(&self, id: i64) -> Result<Option<Patient>, StoreError> {
        self.fetch_first("patient", &format!("/rest/v1/patients?id=eq.{}", id))
            .await
    }

    async fn find_insurance_provider(&self, id: i64) -> Result<Option<InsuranceProvider>, StoreError> {
        self.fetch_first(
            "insurance provider",
            &format!("/rest/v1/insurance_providers?id=eq.{}", id),
        )
        .await
    }

    async fn find_doctor(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        self.fetch_first("doctor", &format!("/rest/v1/doctors?id=eq.{}", id))
            .await
    }

    async fn find_specialty_price(&self, specialty: &str) -> Result<Option<SpecialtyPrice>, StoreError> {
        let path = format!(
            "/rest/v1/specialty_prices?specialty=eq.{}&order=id.asc&limit=1",
            urlencoding::encode(specialty)
        );
        self.fetch_first("specialty price", &path).await
    }

    async fn find_billing_record(&self, id: i64) -> Result<Option<BillingRecord>, StoreError> {
        self.fetch_first("billing record", &format!("/rest/v1/billing_records?id=eq.{}", id))
            .await
    }

    async fn list_billing_records(
        &self,
        filter: &BillingRecordFilter,
    ) -> Result<Vec<BillingRecord>, StoreError> {
        let rows: Vec<Value> = self
            .client
            .request(Method::GET, &Self::billing_query(filter), Some(&self.api_key), None)
            .await?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BillingRecord>, _>>()
            .map_err(|e| StoreError::Decode {
                entity: "billing record",
                message: e.to_string(),
            })
    }

    async fn commit(&self, transaction: StoreTransaction) -> Result<CommitReceipt, StoreError> {
        if transaction.is_empty() {
            return Ok(CommitReceipt::default());
        }

        let (appointment_id, status_change) = match transaction.appointment_update() {
            Some((id, change)) => (Some(id), Some(change)),
            None => (transaction.billing_insert().map(|record| record.appointment_id), None),
        };

        let body = json!({
            "p_appointment_id": appointment_id,
            "p_status_change": status_change,
            "p_billing_record": transaction.billing_insert(),
        });

        let response: CommitResponse = self
            .client
            .request(Method::POST, COMMIT_FUNCTION_PATH, Some(&self.api_key), Some(body))
            .await
            .map_err(|e| match e {
                SupabaseError::NotFound(body)
                    if error_code(&body).as_deref() == Some(MISSING_APPOINTMENT_CODE) =>
                {
                    StoreError::NotFound {
                        entity: "appointment",
                        id: appointment_id.map(|id| id.to_string()).unwrap_or_default(),
                    }
                }
                other => other.into(),
            })?;

        info!(
            "Committed transaction for appointment {:?} (billing record: {:?})",
            appointment_id,
            response.billing_record.as_ref().map(|record| record.id)
        );

        Ok(CommitReceipt {
            appointment: response.appointment,
            billing_record: response.billing_record,
        })
    }
}
