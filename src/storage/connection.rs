//! Opening a validated database handle from configuration

use tracing::{error, info, instrument};

use super::StorageBackend;
use super::error::StorageResult;
use super::mysql::MySqlBackend;
use super::postgres::PostgresBackend;
use crate::config::{DatabaseConfig, Driver};

/// Validate the configuration, open a pool for the configured driver and ping it
///
/// No retry is attempted; the caller decides whether to run setup again.
#[instrument(skip_all, fields(driver = ?config.driver))]
pub async fn connect(config: &DatabaseConfig) -> StorageResult<Box<dyn StorageBackend>> {
    config.validate().inspect_err(|e| error!("{e}"))?;

    let backend: Box<dyn StorageBackend> = match config.driver {
        Driver::Mysql => Box::new(
            MySqlBackend::connect(config)
                .await
                .inspect_err(|e| error!("{e}"))?,
        ),
        Driver::Postgres => Box::new(
            PostgresBackend::connect(config)
                .await
                .inspect_err(|e| error!("{e}"))?,
        ),
    };

    info!(
        "{:?} output address: {}, bulk size: {}",
        config.driver, config.address, config.bulk_size
    );
    Ok(backend)
}
