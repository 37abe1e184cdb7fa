use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    #[serde(default)]
    pub finalized: bool,
}

impl Appointment {
    /// Returns the row as it looks once `change` has been written.
    pub fn with_status_change(&self, change: &AppointmentStatusChange) -> Appointment {
        let mut updated = self.clone();
        updated.status = change.status.clone();

        if let Some(completed_at) = change.completed_at {
            updated.completed_at = Some(completed_at);
        }
        if let Some(reason) = &change.cancellation_reason {
            updated.cancellation_reason = Some(reason.clone());
        }
        if let Some(finalized) = change.finalized {
            updated.finalized = finalized;
        }

        updated
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rescheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    /// Completion is the only transition that produces a billing record.
    pub fn triggers_billing(&self) -> bool {
        matches!(self, AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        AppointmentStatus::ALL
            .iter()
            .find(|status| status.as_str() == normalized)
            .cloned()
            .ok_or_else(|| format!("Unknown appointment status: {}", value))
    }
}

/// Fields written to an appointment row on a status update. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentStatusChange {
    pub status: AppointmentStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub finalized: Option<bool>,
}

// ==============================================================================
// REFERENCE DATA
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub national_id: String,
    /// `None` for public-system (SUS) patients.
    pub insurance_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsuranceProvider {
    pub id: i64,
    pub name: String,
    pub tax_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: i64,
    pub full_name: String,
    pub license_id: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub shift: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecialtyPrice {
    pub id: i64,
    pub specialty: String,
    pub base_cost: f64,
}

// ==============================================================================
// BILLING
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingStatus::Pending => write!(f, "Pending"),
            BillingStatus::Paid => write!(f, "Paid"),
            BillingStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub insurance_id: Option<i64>,
    pub insurance_tax_id: Option<String>,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub appointment_id: i64,
    #[serde(default)]
    pub status: BillingStatus,
}

/// A billing record that has not been assigned an identifier yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBillingRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub insurance_id: Option<i64>,
    pub insurance_tax_id: Option<String>,
    pub due_date: NaiveDate,
    pub amount: f64,
    pub appointment_id: i64,
    pub status: BillingStatus,
}

impl NewBillingRecord {
    pub fn into_record(self, id: i64) -> BillingRecord {
        BillingRecord {
            id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            insurance_id: self.insurance_id,
            insurance_tax_id: self.insurance_tax_id,
            due_date: self.due_date,
            amount: self.amount,
            appointment_id: self.appointment_id,
            status: self.status,
        }
    }
}
