use std::path::Path;
use std::time::Duration;

use tracing::trace;

use crate::storage::{StorageError, StorageResult};

/// Environment variable consulted when the password is absent from the file
pub const PASSWORD_ENV: &str = "CAPTURE_SINK_DB_PASSWORD";

/// Supported database drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Mysql,
    #[serde(alias = "postgresql")]
    Postgres,
}

impl Driver {
    /// Upper bound on bind parameters in a single statement
    pub fn max_bind_parameters(&self) -> usize {
        match self {
            Driver::Mysql => 65_535,
            Driver::Postgres => 65_535,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,

    /// Capacity of the bounded input queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DatabaseConfig {
    pub driver: Driver,

    /// Database address, must be `host:port`
    pub address: String,

    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(alias = "name")]
    pub database_name: String,

    /// Rows per SIP bulk insert
    #[serde(default = "default_bulk_size")]
    pub bulk_size: usize,

    /// Max open (and idle) connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Flush partially filled buffers after this many seconds (off when absent)
    #[serde(default)]
    pub flush_interval_secs: Option<u64>,
}

impl DatabaseConfig {
    /// Rows per SIP bulk insert
    pub fn sip_bulk_size(&self) -> usize {
        self.bulk_size
    }

    /// Rows per RTC bulk insert
    pub fn rtc_bulk_size(&self) -> usize {
        rtc_bulk_size(self.bulk_size)
    }

    pub fn flush_interval(&self) -> Option<Duration> {
        self.flush_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Split the address into host and port
    pub fn host_port(&self) -> StorageResult<(String, u16)> {
        split_address(&self.address)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.bulk_size == 0 {
            return Err(StorageError::InvalidConfig(
                "bulk size must be at least 1".to_string(),
            ));
        }

        if self.pool_size == 0 {
            return Err(StorageError::InvalidConfig(
                "pool size must be at least 1".to_string(),
            ));
        }

        self.host_port().map(|_| ())
    }
}

/// RTC categories see far less traffic, so they flush at 1/20th of the SIP size
pub fn rtc_bulk_size(bulk_size: usize) -> usize {
    (bulk_size / 20).max(1)
}

/// Split a `host:port` address
pub fn split_address(address: &str) -> StorageResult<(String, u16)> {
    let parts: Vec<&str> = address.split(':').collect();

    let [host, port] = parts.as_slice() else {
        return Err(StorageError::InvalidConfig(format!(
            "faulty database address: {address}, format should be localhost:3306"
        )));
    };

    if host.is_empty() {
        return Err(StorageError::InvalidConfig(format!(
            "faulty database address: {address}, host is empty"
        )));
    }

    let port = port.parse::<u16>().map_err(|_| {
        StorageError::InvalidConfig(format!(
            "faulty database address: {address}, port is not a number"
        ))
    })?;

    Ok((host.to_string(), port))
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_bulk_size() -> usize {
    200
}

fn default_pool_size() -> u32 {
    10
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let mut config: Config = serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))?;

    if config.database.password.is_none() {
        config.database.password = std::env::var(PASSWORD_ENV).ok();
    }

    config.database.validate()?;
    trace!(
        "loaded config: driver={:?} address={} bulk_size={}",
        config.database.driver, config.database.address, config.database.bulk_size
    );

    Ok(config)
}
