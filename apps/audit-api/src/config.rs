//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing required variable or an unparseable
//! value stops startup with a message naming the variable.

use pipeaudit_reconciliation::ReconciliationConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub run_migrations: bool,
    pub reconciliation: ReconciliationConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `DATABASE_URL` - PostgreSQL connection string
    ///
    /// # Optional Variables
    ///
    /// - `HOST` (default `0.0.0.0`), `PORT` (default `8080`)
    /// - `RUST_LOG` (default `info,pipeaudit=debug`)
    /// - `DB_MAX_CONNECTIONS` (default 10), `DB_ACQUIRE_TIMEOUT_SECS` (default 5)
    /// - `PROCESSING_TIMEOUT_MINUTES` (default 60)
    /// - `MAX_FAILURE_RATE` (default 0.5, within `0.0..=1.0`)
    /// - `RUN_MIGRATIONS` (default `true`)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url =
            var("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = var("PORT").unwrap_or_else(|| "8080".to_string()).parse()?;
        let rust_log = var("RUST_LOG").unwrap_or_else(|| "info,pipeaudit=debug".to_string());

        let db_max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", 10u32)?;
        if db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "must be at least 1"));
        }
        let db_acquire_timeout =
            Duration::from_secs(parse_or(&var, "DB_ACQUIRE_TIMEOUT_SECS", 5u64)?);

        let defaults = ReconciliationConfig::default();
        let processing_timeout_minutes = parse_or(
            &var,
            "PROCESSING_TIMEOUT_MINUTES",
            defaults.processing_timeout_minutes,
        )?;
        if processing_timeout_minutes <= 0 {
            return Err(invalid("PROCESSING_TIMEOUT_MINUTES", "must be positive"));
        }
        let max_failure_rate: f64 = parse_or(&var, "MAX_FAILURE_RATE", defaults.max_failure_rate)?;
        if !(0.0..=1.0).contains(&max_failure_rate) {
            return Err(invalid("MAX_FAILURE_RATE", "must be between 0.0 and 1.0"));
        }

        let run_migrations = match var("RUN_MIGRATIONS") {
            None => true,
            Some(value) => parse_bool(&value)
                .ok_or_else(|| invalid("RUN_MIGRATIONS", "must be true or false"))?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            rust_log,
            db_max_connections,
            db_acquire_timeout,
            run_migrations,
            reconciliation: ReconciliationConfig {
                processing_timeout_minutes,
                max_failure_rate,
            },
        })
    }

    /// Get the server bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses [`Self::bind_addr`] into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr()
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("HOST", e.to_string()))
    }
}

fn parse_or<T, F>(var: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(name, e.to_string())),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn invalid(var: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        message: message.into(),
    }
}
