//! In-memory storage backend (no persistence)
//!
//! This backend keeps every executed statement in memory. It's useful for:
//! - Testing the sink without a database server
//! - Dry runs that show what would be written
//!
//! Failures can be injected to exercise the flush error path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::backend::{BulkInsert, HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};

/// In-memory backend recording executed statements
///
/// Clones share the same statement log, so a test can keep one clone and
/// hand another to the sink.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    statements: Arc<Mutex<Vec<BulkInsert>>>,
    failures_left: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    unhealthy: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` executions with a query error
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Make health checks report the backend as down
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::SeqCst);
    }

    /// Statements executed successfully so far
    pub async fn statements(&self) -> Vec<BulkInsert> {
        self.statements.lock().await.clone()
    }

    /// Number of times `close` was called
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn execute_bulk(&self, statement: &BulkInsert) -> StorageResult<u64> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StorageError::QueryFailed(format!(
                "injected failure for {}",
                statement.table
            )));
        }

        debug!(
            "recording {} rows for {} in memory",
            statement.rows, statement.table
        );
        self.statements.lock().await.push(statement.clone());
        Ok(statement.rows as u64)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let count = self.statements.lock().await.len();
        Ok(HealthStatus {
            healthy: !self.unhealthy.load(Ordering::SeqCst),
            message: format!("In-memory storage: {count} statements recorded"),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
