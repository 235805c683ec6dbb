//! Reconciler configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `GOPHERMART_*` environment variables, or a
//! configuration file. Every field is optional; accessors supply defaults.

use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use url::Url;
use serde::Deserialize;

use crate::domain::{
    DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL, DEFAULT_RATE_LIMIT_COOLDOWN, ReconciliationConfig,
};
use crate::outbound::persistence::PoolConfig;

const DEFAULT_ACCRUAL_SYSTEM_ADDRESS: &str = "localhost:5000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HEALTH_BIND_ADDR: &str = "0.0.0.0:8081";

/// Errors raised while turning raw settings into runtime configuration.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    /// No database connection string was configured.
    #[error("database URI is required (set GOPHERMART_DATABASE_URI or --database-uri)")]
    MissingDatabaseUri,
    /// The accrual service address is not a usable URL.
    #[error("invalid accrual system address `{address}`: {message}")]
    InvalidAccrualAddress { address: String, message: String },
    /// The probe bind address did not parse.
    #[error("invalid health bind address `{address}`")]
    InvalidHealthBindAddr { address: String },
}

/// Configuration values for the accrual reconciliation worker.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GOPHERMART")]
pub struct ReconcilerSettings {
    /// PostgreSQL connection string.
    pub database_uri: Option<String>,
    /// Accrual service base address; a bare `host:port` gets `http://`.
    pub accrual_system_address: Option<String>,
    /// Idle pause between cycles, in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Orders looked up per cycle before any throttling.
    pub batch_size: Option<u32>,
    /// Suspension after a 429 without `Retry-After`, in seconds.
    pub rate_limit_cooldown_secs: Option<u64>,
    /// Per-request timeout for accrual lookups, in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Listen address for the health probes.
    pub health_bind_addr: Option<String>,
    /// Maximum pooled database connections.
    pub db_max_connections: Option<u32>,
}

impl ReconcilerSettings {
    /// Return the database URI.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUri`] when unset or blank.
    pub fn database_uri(&self) -> Result<&str, SettingsError> {
        self.database_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty())
            .ok_or(SettingsError::MissingDatabaseUri)
    }

    /// Return the accrual service base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidAccrualAddress`] when the address does
    /// not parse as an absolute URL.
    pub fn accrual_base_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .accrual_system_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .unwrap_or(DEFAULT_ACCRUAL_SYSTEM_ADDRESS);
        let address = if raw.contains("://") {
            raw.to_owned()
        } else {
            format!("http://{raw}")
        };
        Url::parse(&address).map_err(|error| SettingsError::InvalidAccrualAddress {
            address: raw.to_owned(),
            message: error.to_string(),
        })
    }

    /// Return the idle pause between cycles.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }

    /// Return the initial batch size.
    pub fn batch_size(&self) -> u32 {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Return the default rate-limit cooldown.
    pub fn rate_limit_cooldown(&self) -> Duration {
        self.rate_limit_cooldown_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN)
    }

    /// Return the accrual request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Return the probe listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidHealthBindAddr`] when the address is
    /// not an `ip:port` pair.
    pub fn health_bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self
            .health_bind_addr
            .as_deref()
            .unwrap_or(DEFAULT_HEALTH_BIND_ADDR);
        raw.trim()
            .parse()
            .map_err(|_| SettingsError::InvalidHealthBindAddr {
                address: raw.to_owned(),
            })
    }

    /// Build the engine configuration.
    pub fn reconciliation_config(&self) -> ReconciliationConfig {
        ReconciliationConfig {
            poll_interval: self.poll_interval(),
            initial_batch_size: self.batch_size(),
            rate_limit_cooldown: self.rate_limit_cooldown(),
        }
    }

    /// Build the connection pool configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUri`] when no URI is set.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let config = PoolConfig::new(self.database_uri()?);
        Ok(match self.db_max_connections {
            Some(max_size) => config.with_max_size(max_size),
            None => config,
        })
    }
}
