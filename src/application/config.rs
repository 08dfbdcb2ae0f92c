use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_DATABASE_TIMEOUT: u64 = 1000;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// PostgreSQL URL. Persons are kept in memory when unset.
    pub database_url: Option<String>,
    /// Milliseconds.
    pub database_timeout: u64,
    pub log_level: String,
}

impl Config {
    /// Reads the process environment (after `.env`, when loaded by the caller).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or(DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_address
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                name: "BIND_ADDRESS",
                value: bind_address.clone(),
                reason: e.to_string(),
            })?;
        let database_timeout = match lookup("DATABASE_TIMEOUT") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|timeout| *timeout > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "DATABASE_TIMEOUT",
                    value: raw.clone(),
                    reason: "must be a positive number of milliseconds".to_owned(),
                })?,
            None => DEFAULT_DATABASE_TIMEOUT,
        };
        // Same directive syntax as `RUST_LOG`, e.g. `info,person_api=debug`.
        let log_level = lookup("LOG_LEVEL").unwrap_or(DEFAULT_LOG_LEVEL.to_string());
        EnvFilter::try_new(&log_level).map_err(|e| ConfigError::InvalidValue {
            name: "LOG_LEVEL",
            value: log_level.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            bind_address,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_timeout,
            log_level,
        })
    }
}
