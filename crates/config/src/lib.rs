//! Process-level configuration for the scheduling service.
//!
//! Most of the tunables in §6's configuration table are hot-swappable and
//! live in `weights_config` (read through `WeightsConfigRepository`), not
//! here. `AppConfig` only carries what genuinely requires a restart to
//! change: where to listen, where the database is, and the two knobs the
//! spec calls out as process-level (`deadline.*`, `cache.cell_m`) — these
//! seed the `Tunables` row on first migration but are not re-read after
//! startup.

use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingVar(String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// Base URL used when building absolute links in responses.
    pub base_url: String,
    /// Shared admin key gating `/recommendations/recalculate`'s force-run
    /// path. Empty disables the privileged variant.
    pub admin_api_key: String,
    /// Overall per-request budget for `POST /recommendations` (§6
    /// `deadline.recommend_ms`). Restart required to change.
    pub deadline_recommend_ms: u64,
    /// Per-batch routing-provider timeout (§6 `deadline.routing_ms`).
    /// Restart required to change.
    pub deadline_routing_ms: u64,
    /// Per-contractor lock acquisition timeout (§5 C9). Restart required.
    pub lock_wait_ms: u64,
    /// Distance-cache quantization cell size in meters (§6 `cache.cell_m`).
    /// Restart required: changing it mid-run would make the in-process
    /// cache and the durable backstop disagree on key shape.
    pub cache_cell_m: f64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_var("DATABASE_URL")?,
            bind_address: env_var_or("BIND_ADDRESS", "0.0.0.0:8080"),
            base_url: env_var_or("BASE_URL", "http://localhost:8080"),
            admin_api_key: env_var_or("ADMIN_API_KEY", ""),
            deadline_recommend_ms: parsed_env_var_or("DEADLINE_RECOMMEND_MS", 500)?,
            deadline_routing_ms: parsed_env_var_or("DEADLINE_ROUTING_MS", 1500)?,
            lock_wait_ms: parsed_env_var_or("LOCK_WAIT_MS", 750)?,
            cache_cell_m: parsed_env_var_or("CACHE_CELL_M", 250.0)?,
        })
    }
}

fn env_var(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed_env_var_or<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_or_uses_default() {
        let val = env_var_or("NON_EXISTENT_VAR_12345", "default_value");
        assert_eq!(val, "default_value");
    }

    #[test]
    fn parsed_env_var_or_uses_default_when_unset() {
        let val: u64 = parsed_env_var_or("NON_EXISTENT_VAR_67890", 500).unwrap();
        assert_eq!(val, 500);
    }

    #[test]
    fn parsed_env_var_or_rejects_unparseable_value() {
        // SAFETY: test-local, no other thread reads this var concurrently.
        unsafe { env::set_var("CONFIG_TEST_BAD_INT", "not-a-number") };
        let result: Result<u64, ConfigError> = parsed_env_var_or("CONFIG_TEST_BAD_INT", 500);
        unsafe { env::remove_var("CONFIG_TEST_BAD_INT") };
        assert!(result.is_err());
    }
}
