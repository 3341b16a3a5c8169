//! Runtime configuration for the MyCricMate server.

use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub database_url: String,
    pub redis_url: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    /// HS256 signing secret for access and refresh tokens.
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    /// Lifetime of a team invitation before the sweeper expires it.
    pub invitation_expire_days: i64,

    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,

    pub frontend_url: String,
    pub backend_url: String,

    /// Redis presence-key TTL (seconds).
    pub presence_ttl: u64,
    /// Admin statistics cache TTL (seconds).
    pub stats_cache_ttl: u64,
    /// Seconds between housekeeping sweeps.
    pub sweep_interval: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Settings {
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "MyCricMate".into()),
            database_url: required("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into()),
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5),
            jwt_secret: required("JWT_SECRET")?,
            access_token_expire_minutes: parsed("ACCESS_TOKEN_EXPIRE_MINUTES", 30),
            refresh_token_expire_days: parsed("REFRESH_TOKEN_EXPIRE_DAYS", 7),
            invitation_expire_days: parsed("INVITATION_EXPIRE_DAYS", 7),
            google_client_id: optional("GOOGLE_CLIENT_ID"),
            google_client_secret: optional("GOOGLE_CLIENT_SECRET"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            backend_url: env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:8000".into()),
            presence_ttl: parsed("PRESENCE_TTL", 120),
            stats_cache_ttl: parsed("STATS_CACHE_TTL", 30),
            sweep_interval: parsed("SWEEP_INTERVAL", 300),
        })
    }

    /// Settings suitable for tests: no external services, fixed secret.
    pub fn for_tests() -> Self {
        Settings {
            app_name: "MyCricMate".into(),
            database_url: "postgres://localhost/mycricmate_test".into(),
            redis_url: "redis://127.0.0.1/".into(),
            server_addr: "127.0.0.1:0".into(),
            db_max_connections: 1,
            jwt_secret: "test-secret".into(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
            invitation_expire_days: 7,
            google_client_id: None,
            google_client_secret: None,
            frontend_url: "http://localhost:8080".into(),
            backend_url: "http://localhost:8000".into(),
            presence_ttl: 120,
            stats_cache_ttl: 30,
            sweep_interval: 300,
        }
    }

    /// Origins the SPA may call us from.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            self.frontend_url.clone(),
            "http://localhost:8080".to_string(),
            "http://localhost:5173".to_string(),
        ];
        origins.sort();
        origins.dedup();
        origins
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("invalid {key} value {raw:?}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}
