use salon_core::slot_key::DEFAULT_CLAIM_TTL_SECS;
use salon_events::breaker::{DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Per-location booking rules (granularity, lead time, notification
/// switches) live in the `locations` table, not here.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to drain on shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Lifetime of a checkout slot claim in seconds (default: `120`).
    pub slot_claim_ttl_secs: i64,
    /// Consecutive mail failures before the breaker opens (default: `5`).
    pub mail_breaker_threshold: u32,
    /// Seconds the mail breaker stays open (default: `60`).
    pub mail_breaker_cooldown_secs: u64,
    /// Staff session token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                 |
    /// |------------------------------|-------------------------|
    /// | `HOST`                       | `0.0.0.0`               |
    /// | `PORT`                       | `3000`                  |
    /// | `CORS_ORIGINS`               | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `10`                    |
    /// | `SLOT_CLAIM_TTL_SECS`        | `120`                   |
    /// | `MAIL_BREAKER_THRESHOLD`     | `5`                     |
    /// | `MAIL_BREAKER_COOLDOWN_SECS` | `60`                    |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 10),
            slot_claim_ttl_secs: env_or("SLOT_CLAIM_TTL_SECS", DEFAULT_CLAIM_TTL_SECS),
            mail_breaker_threshold: env_or("MAIL_BREAKER_THRESHOLD", DEFAULT_FAILURE_THRESHOLD),
            mail_breaker_cooldown_secs: env_or(
                "MAIL_BREAKER_COOLDOWN_SECS",
                DEFAULT_COOLDOWN.as_secs(),
            ),
            jwt: JwtConfig::from_env(),
        }
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}
