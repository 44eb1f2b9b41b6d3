//! Storage backend trait definition
//!
//! This module defines the `StorageBackend` trait that the MySQL, PostgreSQL
//! and in-memory backends implement.

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{Category, Value};

/// A fully rendered multi-row insert, ready to execute
#[derive(Debug, Clone)]
pub struct BulkInsert {
    /// Category the rows belong to
    pub category: Category,

    /// Day-partitioned destination table
    pub table: String,

    /// Statement text with one placeholder per value
    pub sql: String,

    /// Number of rows in `values`
    pub rows: usize,

    /// Flattened row values, `rows * width` long
    pub values: Vec<Value>,
}

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,
}

/// Trait for bulk-insert capable backends
///
/// ## Error Handling
///
/// `execute_bulk` either writes the whole statement or fails as a unit. The
/// sink never retries, so implementations must not retry internally either.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Execute one multi-row insert
    ///
    /// Returns the number of rows the database reports as affected.
    async fn execute_bulk(&self, statement: &BulkInsert) -> StorageResult<u64>;

    /// Check backend health with a lightweight round trip
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release pooled connections
    async fn close(&self) -> StorageResult<()>;
}
