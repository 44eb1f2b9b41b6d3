//! PostgreSQL storage backend implementation

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, Postgres};
use tracing::{debug, info, instrument};

use super::backend::{BulkInsert, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::Value;
use crate::config::DatabaseConfig;

/// PostgreSQL backend
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Dial once and ping before the pool is built
    #[instrument(skip_all, fields(address = %config.address))]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let (host, port) = config.host_port()?;

        let mut options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&config.user)
            .database(&config.database_name);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        verify(&options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .idle_timeout(None)
            .connect_lazy_with(options);

        info!(
            "postgres connection pool ready ({} connections)",
            config.pool_size
        );
        Ok(Self { pool })
    }
}

async fn verify(options: &PgConnectOptions) -> Result<(), sqlx::Error> {
    let mut conn = PgConnection::connect_with(options).await?;
    let pinged = conn.ping().await;
    if let Err(e) = conn.close().await {
        debug!("error closing setup connection: {e}");
    }
    pinged
}

async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut conn = pool.acquire().await?;
    conn.ping().await
}

#[async_trait]
impl StorageBackend for PostgresBackend {
    #[instrument(skip_all, fields(table = %statement.table, rows = statement.rows))]
    async fn execute_bulk(&self, statement: &BulkInsert) -> StorageResult<u64> {
        let mut query = sqlx::query::<Postgres>(&statement.sql);
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
                "PostgreSQL: {} connections ({} idle)",
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
