//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct,
//! after `dotenvy` has had a chance to populate the process environment from a `.env` file.

use std::net::IpAddr;

use serde::Deserialize;
use url::Url;

use crate::middleware::rate_limit::RateLimit;

/// Prefix every versioned route is nested under.
pub const API_V1_STR: &str = "/api/v1";

/// Secret shipped for local development. Refused when running in production.
const DEV_SECRET_KEY: &str = "dev-secret-key-CHANGE-IN-PRODUCTION";

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid database url: {0}")]
    DatabaseUrl(String),

    #[error("SECRET_KEY must be set to a non-default value in production")]
    InsecureSecretKey,

    #[error("invalid rate limit {value:?} for {name}: expected \"<count>/<second|minute|hour|day>\"")]
    RateLimit { name: &'static str, value: String },

    #[error("invalid TRUSTED_PROXIES entry {0:?}: expected an IP address")]
    TrustedProxy(String),
}

/// Deployment environment. Drives CORS defaults, trusted hosts and log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// Every field maps to the upper-cased environment variable of the same name,
/// e.g. `secret_key` -> `SECRET_KEY`. List values (`CORS_ORIGINS`,
/// `ALLOWED_HOSTS`, `TRUSTED_PROXIES`) are comma separated.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default)]
    pub environment: Environment,

    #[serde(default = "default_postgres_user")]
    pub postgres_user: String,
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,
    #[serde(default = "default_postgres_server")]
    pub postgres_server: String,
    #[serde(default = "default_postgres_db")]
    pub postgres_db: String,
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// Full connection string. Takes precedence over the `POSTGRES_*` parts.
    pub connection_string: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_expire_minutes: i64,
    #[serde(default = "default_refresh_token_minutes")]
    pub refresh_token_expire_minutes: i64,

    pub cors_origins: Option<Vec<String>>,
    pub allowed_hosts: Option<Vec<String>>,
    /// Peers allowed to set `X-Forwarded-For`. Empty means the header is ignored.
    pub trusted_proxies: Option<Vec<String>>,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_true")]
    pub rate_limit_enabled: bool,
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: String,
    #[serde(default = "default_register_rate_limit")]
    pub register_rate_limit: String,
    #[serde(default = "default_booking_rate_limit")]
    pub booking_rate_limit: String,
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: String,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    #[serde(default = "default_max_tour_capacity")]
    pub max_tour_capacity: i32,
    #[serde(default = "default_min_advance_booking_hours")]
    pub min_advance_booking_hours: i64,
}

fn default_project_name() -> String {
    "Genbi Admin Panel".to_string()
}

fn default_postgres_user() -> String {
    "genbi_user".to_string()
}

fn default_postgres_password() -> String {
    "genbi_pass".to_string()
}

fn default_postgres_server() -> String {
    "localhost".to_string()
}

fn default_postgres_db() -> String {
    "genbi_db".to_string()
}

fn default_postgres_port() -> u16 {
    5433
}

fn default_max_connections() -> u32 {
    20
}

fn default_secret_key() -> String {
    DEV_SECRET_KEY.to_string()
}

/// Eight days.
fn default_access_token_minutes() -> i64 {
    60 * 24 * 8
}

/// Thirty days.
fn default_refresh_token_minutes() -> i64 {
    60 * 24 * 30
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_login_rate_limit() -> String {
    "5/minute".to_string()
}

fn default_register_rate_limit() -> String {
    "3/hour".to_string()
}

fn default_booking_rate_limit() -> String {
    "20/minute".to_string()
}

fn default_api_rate_limit() -> String {
    "100/minute".to_string()
}

fn default_min_password_length() -> usize {
    8
}

fn default_max_tour_capacity() -> i32 {
    1000
}

fn default_min_advance_booking_hours() -> i64 {
    24
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Environment variable values cannot be parsed into expected types
    /// - A rate limit expression is malformed
    /// - The development secret key is used in production
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from explicit key/value pairs instead of the process environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production() && self.secret_key == DEV_SECRET_KEY {
            return Err(ConfigError::InsecureSecretKey);
        }

        for (name, value) in self.rate_limit_settings() {
            value
                .parse::<RateLimit>()
                .map_err(|_| ConfigError::RateLimit {
                    name,
                    value: value.to_string(),
                })?;
        }

        self.trusted_proxies()?;
        self.database_url()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Named rate limit expressions, used for validation and limiter construction.
    pub fn rate_limit_settings(&self) -> [(&'static str, &str); 4] {
        [
            ("LOGIN_RATE_LIMIT", self.login_rate_limit.as_str()),
            ("REGISTER_RATE_LIMIT", self.register_rate_limit.as_str()),
            ("BOOKING_RATE_LIMIT", self.booking_rate_limit.as_str()),
            ("API_RATE_LIMIT", self.api_rate_limit.as_str()),
        ]
    }

    /// PostgreSQL connection string.
    ///
    /// Hosted providers hand out URLs carrying `channel_binding=require`, which the
    /// driver does not understand; that parameter is dropped. Individual
    /// `POSTGRES_*` parts are assembled with proper percent-encoding.
    pub fn database_url(&self) -> Result<String, ConfigError> {
        if let Some(raw) = &self.connection_string {
            let mut url =
                Url::parse(raw).map_err(|e| ConfigError::DatabaseUrl(e.to_string()))?;

            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "channel_binding")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();

            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(kept);
            }

            return Ok(url.into());
        }

        let invalid = |part: &str| ConfigError::DatabaseUrl(format!("invalid {part}"));

        let mut url = Url::parse("postgres://localhost")
            .map_err(|e| ConfigError::DatabaseUrl(e.to_string()))?;
        url.set_host(Some(&self.postgres_server))
            .map_err(|e| ConfigError::DatabaseUrl(e.to_string()))?;
        url.set_port(Some(self.postgres_port))
            .map_err(|_| invalid("POSTGRES_PORT"))?;
        url.set_username(&self.postgres_user)
            .map_err(|_| invalid("POSTGRES_USER"))?;
        url.set_password(Some(&self.postgres_password))
            .map_err(|_| invalid("POSTGRES_PASSWORD"))?;
        url.set_path(&self.postgres_db);

        Ok(url.into())
    }

    /// Origins allowed by CORS. Explicit `CORS_ORIGINS` wins over the per-environment defaults.
    pub fn cors_origins(&self) -> Vec<String> {
        if let Some(origins) = self.cors_origins.as_ref().filter(|o| !o.is_empty()) {
            return origins.clone();
        }

        let defaults: &[&str] = match self.environment {
            Environment::Production => &[
                "https://genbi-backend-5.vercel.app",
                "https://yourdomain.com",
                "https://admin.yourdomain.com",
                "https://www.yourdomain.com",
            ],
            Environment::Staging => &[
                "https://staging.yourdomain.com",
                "https://genbi-staging.vercel.app",
            ],
            Environment::Development => &[
                "http://localhost:3000",
                "http://localhost:3001",
                "http://localhost:5173",
                "http://localhost:5174",
                "http://localhost:8080",
                "http://localhost:8081",
                "http://127.0.0.1:3000",
                "http://127.0.0.1:3001",
                "http://127.0.0.1:5173",
                "http://127.0.0.1:5174",
                "http://127.0.0.1:8080",
                "http://127.0.0.1:8081",
                "https://genbi-backend-5.vercel.app",
            ],
        };

        defaults.iter().map(|s| s.to_string()).collect()
    }

    /// Parsed `TRUSTED_PROXIES`; blank entries are skipped.
    pub fn trusted_proxies(&self) -> Result<Vec<IpAddr>, ConfigError> {
        self.trusted_proxies
            .iter()
            .flatten()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse()
                    .map_err(|_| ConfigError::TrustedProxy(entry.to_string()))
            })
            .collect()
    }

    /// Host names accepted in production.
    pub fn allowed_hosts(&self) -> Vec<String> {
        if let Some(hosts) = self.allowed_hosts.as_ref().filter(|h| !h.is_empty()) {
            return hosts.clone();
        }

        [
            "genbi-backend-5.vercel.app",
            "yourdomain.com",
            "www.yourdomain.com",
            "admin.yourdomain.com",
            "api.yourdomain.com",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}
