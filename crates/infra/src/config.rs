//! Configuration loading from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Postgres connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .password(&self.password)
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `None` runs on in-memory adapters.
    pub database: Option<DatabaseConfig>,
    /// Directory holding materialized report artifacts
    pub reports_dir: PathBuf,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Reports computed at once
    pub report_concurrency: usize,
}

impl AppConfig {
    pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
    pub const DEFAULT_REPORTS_DIR: &'static str = "reports";
    pub const DEFAULT_REPORT_CONCURRENCY: usize = 2;

    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    /// - `SM_POSTGRESQL_HOST` (optional): Postgres host; unset selects in-memory adapters
    /// - `SM_POSTGRESQL_PORT` (optional, default: 5432)
    /// - `SM_POSTGRESQL_DBNAME` (optional, default: `postgres`)
    /// - `SM_POSTGRESQL_USER` (optional, default: `postgres`)
    /// - `SM_POSTGRESQL_PASSWORD` (optional, default: empty)
    /// - `SM_REPORTS_DIR` (optional, default: `reports`)
    /// - `SM_BIND_ADDR` (optional, default: `0.0.0.0:8080`)
    /// - `SM_REPORT_CONCURRENCY` (optional, default: 2): reports computed at once, at least 1
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = match var("SM_POSTGRESQL_HOST") {
            None => None,
            Some(host) => {
                let port = match var("SM_POSTGRESQL_PORT") {
                    None => 5432,
                    Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                        name: "SM_POSTGRESQL_PORT",
                        expected: "port number",
                        value: raw,
                    })?,
                };
                Some(DatabaseConfig {
                    host,
                    port,
                    dbname: var("SM_POSTGRESQL_DBNAME").unwrap_or_else(|| "postgres".to_string()),
                    user: var("SM_POSTGRESQL_USER").unwrap_or_else(|| "postgres".to_string()),
                    password: lookup("SM_POSTGRESQL_PASSWORD").unwrap_or_default(),
                })
            }
        };

        let reports_dir = var("SM_REPORTS_DIR")
            .unwrap_or_else(|| Self::DEFAULT_REPORTS_DIR.to_string())
            .into();

        let raw_addr = var("SM_BIND_ADDR").unwrap_or_else(|| Self::DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "SM_BIND_ADDR",
            expected: "socket address",
            value: raw_addr.clone(),
        })?;

        let report_concurrency = match var("SM_REPORT_CONCURRENCY") {
            None => Self::DEFAULT_REPORT_CONCURRENCY,
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SM_REPORT_CONCURRENCY",
                        expected: "positive integer",
                        value: raw,
                    });
                }
            },
        };

        Ok(Self {
            database,
            reports_dir,
            bind_addr,
            report_concurrency,
        })
    }
}
