//! Configuration loading and representation.
//!
//! Everything comes from the environment (optionally seeded from `.env`).
//! [`AppConfig::from_lookup`] takes the lookup as a closure so tests never touch
//! the process environment.

use std::str::FromStr;

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use marketplace_auth::AuthConfig;
use marketplace_core::PaginationConfig;
use marketplace_products::BusinessRules;
use marketplace_users::ValidationConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `None` selects the in-memory stores.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

// The URL usually embeds credentials.
impl core::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Whole-process configuration, built once in `main` and handed out by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pagination: PaginationConfig,
    pub validation: ValidationConfig,
    pub rules: BusinessRules,
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "failed to read .env file");
            }
        }

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        info!(
            bind = %config.server.bind_addr(),
            persistent = config.database.url.is_some(),
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or(defaults.server.host),
            port: parse(&get, "SERVER_PORT", defaults.server.port)?,
            timeout_secs: parse(&get, "SERVER_TIMEOUT_SECS", defaults.server.timeout_secs)?,
        };

        let database = DatabaseConfig {
            url: get("DATABASE_URL"),
            max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", defaults.database.max_connections)?,
        };

        let pagination = PaginationConfig {
            default_page_size: parse(&get, "PAGINATION_DEFAULT_PAGE_SIZE", defaults.pagination.default_page_size)?,
            max_page_size: parse(&get, "PAGINATION_MAX_PAGE_SIZE", defaults.pagination.max_page_size)?,
        };
        if pagination.default_page_size == 0 {
            return Err(invalid("PAGINATION_DEFAULT_PAGE_SIZE", "must be at least 1"));
        }
        if pagination.default_page_size > pagination.max_page_size {
            return Err(invalid(
                "PAGINATION_DEFAULT_PAGE_SIZE",
                format!(
                    "{} exceeds PAGINATION_MAX_PAGE_SIZE ({})",
                    pagination.default_page_size, pagination.max_page_size
                ),
            ));
        }

        let validation = ValidationConfig {
            min_password_length: parse(&get, "MIN_PASSWORD_LENGTH", defaults.validation.min_password_length)?,
            max_name_length: parse(&get, "MAX_NAME_LENGTH", defaults.validation.max_name_length)?,
        };

        let rules = BusinessRules {
            max_products_per_user: parse(&get, "MAX_PRODUCTS_PER_USER", defaults.rules.max_products_per_user)?,
            default_product_status: get("DEFAULT_PRODUCT_STATUS").unwrap_or(defaults.rules.default_product_status),
        };

        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET").unwrap_or_default(),
            token_expiration_hours: parse(&get, "TOKEN_EXPIRATION_HOURS", defaults.auth.token_expiration_hours)?,
            password_cost: parse(&get, "PASSWORD_COST", defaults.auth.password_cost)?,
            password_memory_kib: parse(&get, "PASSWORD_MEMORY_KIB", defaults.auth.password_memory_kib)?,
        };
        if auth.token_expiration_hours <= 0 {
            return Err(invalid("TOKEN_EXPIRATION_HOURS", "must be positive"));
        }
        let expiry = Duration::try_hours(auth.token_expiration_hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if expiry.is_none() {
            return Err(invalid(
                "TOKEN_EXPIRATION_HOURS",
                format!("{} hours is out of range", auth.token_expiration_hours),
            ));
        }

        Ok(Self {
            server,
            database,
            pagination,
            validation,
            rules,
            auth,
        })
    }
}

fn parse<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| invalid(var, format!("{raw:?}: {e}"))),
    }
}

fn invalid(var: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        reason: reason.into(),
    }
}
