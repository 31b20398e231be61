//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Longest accepted access token lifetime: one year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Env(#[from] envy::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `JWT_SECRET` (required): HMAC secret used to sign access tokens (at least 32 bytes)
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `JWT_ALGORITHM` (optional): `HS256`, `HS384` or `HS512`, defaults to `HS256`
/// - `ACCESS_TOKEN_EXPIRE_MINUTES` (optional): token lifetime, defaults to 30 days
/// - `MEDIA_URL` (optional): prefix prepended to stored image paths in responses
/// - `REQUEST_TIMEOUT_SECS` (optional): upper bound for a single request, defaults to 30
/// - `DB_MAX_CONNECTIONS` / `DB_ACQUIRE_TIMEOUT_SECS` (optional): pool sizing
/// - `PASSWORD_MEMORY_KIB` / `PASSWORD_ITERATIONS` / `PASSWORD_PARALLELISM` (optional): Argon2 cost
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub jwt_secret: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_jwt_algorithm")]
    pub jwt_algorithm: String,

    #[serde(default = "default_token_ttl")]
    pub access_token_expire_minutes: i64,

    #[serde(default)]
    pub media_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_acquire_timeout")]
    pub db_acquire_timeout_secs: u64,

    #[serde(default = "default_password_memory")]
    pub password_memory_kib: u32,

    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,

    #[serde(default = "default_password_parallelism")]
    pub password_parallelism: u32,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

/// Thirty days.
fn default_token_ttl() -> i64 {
    60 * 24 * 30
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_password_memory() -> u32 {
    argon2::Params::DEFAULT_M_COST
}

fn default_password_iterations() -> u32 {
    argon2::Params::DEFAULT_T_COST
}

fn default_password_parallelism() -> u32 {
    argon2::Params::DEFAULT_P_COST
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
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    /// - A value is out of range (see [`Config::validate`])
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        let config = envy::from_env::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work: a token lifetime outside
    /// `1..=MAX_TOKEN_TTL_MINUTES`, a zero request timeout, an empty pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.token_ttl()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Access token lifetime as a chrono duration.
    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        let minutes = self.access_token_expire_minutes;
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
            return Err(ConfigError::Invalid(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}"
            )));
        }

        chrono::Duration::try_minutes(minutes).ok_or_else(|| {
            ConfigError::Invalid("ACCESS_TOKEN_EXPIRE_MINUTES is out of range".to_string())
        })
    }
}
