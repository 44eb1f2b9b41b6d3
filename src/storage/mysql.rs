//! MySQL storage backend implementation
//!
//! Statements are sent as prepared statements; sqlx keeps them in its
//! per-connection statement cache, so the full-capacity insert for each table
//! is only parsed once per connection and day.

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::{Connection, MySql};
use tracing::{debug, info, instrument};

use super::backend::{BulkInsert, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::Value;
use crate::config::DatabaseConfig;

/// MySQL / MariaDB backend
pub struct MySqlBackend {
    pool: MySqlPool,
}

impl MySqlBackend {
    /// Verify the server with a single connection and ping, then open the pool
    ///
    /// The check dials exactly once, so a refused connection or bad login is
    /// returned as the driver reported it.
    #[instrument(skip_all, fields(address = %config.address))]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let (host, port) = config.host_port()?;

        let mut options = MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&config.user)
            .database(&config.database_name)
            .charset("utf8mb4");
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        verify(&options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        // max idle == max open: idle connections are never reaped
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .idle_timeout(None)
            .connect_lazy_with(options);

        info!("mysql connection pool ready ({} connections)", config.pool_size);
        Ok(Self { pool })
    }
}

async fn verify(options: &MySqlConnectOptions) -> Result<(), sqlx::Error> {
    let mut conn = MySqlConnection::connect_with(options).await?;
    let pinged = conn.ping().await;
    if let Err(e) = conn.close().await {
        debug!("error closing setup connection: {e}");
    }
    pinged
}

async fn ping(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

#[async_trait]
impl StorageBackend for MySqlBackend {
    #[instrument(skip_all, fields(table = %statement.table, rows = statement.rows))]
    async fn execute_bulk(&self, statement: &BulkInsert) -> StorageResult<u64> {
        let mut query = sqlx::query::<MySql>(&statement.sql);
        for value in &statement.values {
            query = match value {
                Value::Text(text) => query.bind(text.as_str()),
                Value::Int(int) => query.bind(*int),
                Value::Timestamp(ts) => query.bind(*ts),
            };
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        debug!("inserted {} rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        ping(&self.pool)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;
        Ok(HealthStatus {
            healthy: true,
            message: format!(
                "MySQL: {} connections ({} idle)",
                self.pool.size(),
                self.pool.num_idle()
            ),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
