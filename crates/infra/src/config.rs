//! Configuration loading and representation.
//!
//! Everything comes from environment variables. `from_lookup` takes the
//! lookup function explicitly so tests never touch the process environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9090";
pub const DEFAULT_COMPUTATION_URL: &str = "http://backend-astra:8000/get_orbit";
pub const DEFAULT_COMPUTATION_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Where comet aggregates are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub computation_url: String,
    pub computation_timeout: Duration,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            key: "BIND_ADDR",
            reason: format!("{bind_raw:?}: {e}"),
        })?;

        let computation_url =
            get("ORBIT_COMPUTATION_URL").unwrap_or_else(|| DEFAULT_COMPUTATION_URL.to_string());
        if !computation_url.starts_with("http://") && !computation_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "ORBIT_COMPUTATION_URL",
                reason: format!("{computation_url:?} is not an http(s) URL"),
            });
        }

        let timeout_secs = match get("ORBIT_COMPUTATION_TIMEOUT_SECS") {
            None => DEFAULT_COMPUTATION_TIMEOUT_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ORBIT_COMPUTATION_TIMEOUT_SECS",
                        reason: format!("{raw:?} is not a positive number of seconds"),
                    });
                }
            },
        };

        let persistent = get("USE_PERSISTENT_STORES")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let storage = if persistent {
            let database_url = get("DATABASE_URL").unwrap_or_else(|| {
                // Same discrete variables (and defaults) the compose setup uses.
                let host = get("DB_HOST").unwrap_or_else(|| "localhost".to_string());
                let user = get("DB_USER").unwrap_or_else(|| "postgres".to_string());
                let password = get("DB_PASSWORD").unwrap_or_default();
                let name = get("DB_NAME").unwrap_or_else(|| "postgres".to_string());
                let port = get("DB_PORT").unwrap_or_else(|| "5432".to_string());
                let sslmode = get("DB_SSLMODE").unwrap_or_else(|| "disable".to_string());
                format!("postgres://{user}:{password}@{host}:{port}/{name}?sslmode={sslmode}")
            });
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self {
            bind_addr,
            computation_url,
            computation_timeout: Duration::from_secs(timeout_secs),
            storage,
        })
    }
}
