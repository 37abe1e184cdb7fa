pub mod memory;
pub mod state;
pub mod store;
pub mod supabase;

pub use memory::{ClinicSeed, MemoryStore};
pub use state::AppState;
pub use store::{BillingRecordFilter, ClinicStore, CommitReceipt, StoreError, StoreTransaction};
pub use supabase::{SupabaseClient, SupabaseStore};
