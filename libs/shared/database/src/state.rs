use std::sync::Arc;

use tracing::info;

use shared_config::{AppConfig, StoreBackend};

use crate::memory::MemoryStore;
use crate::store::{ClinicStore, StoreError};
use crate::supabase::SupabaseStore;

/// Shared handler state: configuration plus the injected store handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ClinicStore>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }

    /// Builds the store selected by `config.store_backend`.
    pub fn from_config(config: AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn ClinicStore> = match config.store_backend {
            StoreBackend::Supabase => Arc::new(SupabaseStore::new(&config)),
            StoreBackend::Memory => match &config.seed_file {
                Some(path) => Arc::new(MemoryStore::from_seed_file(path)?),
                None => Arc::new(MemoryStore::new()),
            },
        };

        info!("Using {} store backend", config.store_backend);
        Ok(Self::new(config, store))
    }
}
