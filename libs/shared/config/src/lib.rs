use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Which `ClinicStore` implementation the API runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Supabase => write!(f, "supabase"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub seed_file: Option<String>,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, falling back to anon key");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend: env::var("STORE_BACKEND")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, using supabase", e);
                        None
                    }
                })
                .unwrap_or(StoreBackend::Supabase),
            seed_file: env::var("SEED_FILE").ok(),
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or_else(|| {
                    warn!("API_PORT not set or invalid, using default");
                    3000
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
            StoreBackend::Memory => true,
        };

        store_ready && !self.supabase_jwt_secret.is_empty()
    }

    /// Key sent as bearer on server-side store calls.
    pub fn store_api_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: StoreBackend) -> AppConfig {
        AppConfig {
            supabase_url: String::new(),
            supabase_anon_key: "anon".to_string(),
            supabase_service_role_key: String::new(),
            supabase_jwt_secret: "secret".to_string(),
            store_backend: backend,
            seed_file: None,
            api_port: 3000,
        }
    }

    #[test]
    fn test_store_backend_parsing() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(" Supabase ".parse::<StoreBackend>(), Ok(StoreBackend::Supabase));
        assert!("mysql".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_memory_backend_does_not_need_supabase_url() {
        assert!(config(StoreBackend::Memory).is_configured());
        assert!(!config(StoreBackend::Supabase).is_configured());
    }

    #[test]
    fn test_store_api_key_prefers_service_role() {
        let mut config = config(StoreBackend::Supabase);
        assert_eq!(config.store_api_key(), "anon");

        config.supabase_service_role_key = "service".to_string();
        assert_eq!(config.store_api_key(), "service");
    }
}
