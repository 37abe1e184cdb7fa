pub mod generation;

pub use generation::{due_date_for, BillingGenerationService, BILLING_DUE_DAYS};
