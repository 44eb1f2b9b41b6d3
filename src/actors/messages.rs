//! Message types for sink communication
//!
//! 1. **Commands**: request/response messages sent to the sink via mpsc
//! 2. **Events**: flush reports broadcast to any number of subscribers

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::storage::schema::Category;

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Buffer reached its bulk size
    Capacity,
    /// Oldest buffered row exceeded the flush interval
    Interval,
    /// Explicit `Flush` command
    Manual,
}

/// Outcome of one bulk insert
///
/// Broadcast after every flush attempt. A failed flush is not retried; its
/// rows are gone once the report is published.
#[derive(Debug, Clone)]
pub struct FlushReport {
    pub category: Category,

    /// Table the rows were written to (or would have been)
    pub table: String,

    /// Rows in the batch
    pub rows: usize,

    pub trigger: FlushTrigger,

    /// Rows affected on success, error text on failure
    pub result: Result<u64, String>,

    pub flushed_at: DateTime<Utc>,
}

impl FlushReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Commands that can be sent to the SinkActor
#[derive(Debug)]
pub enum SinkCommand {
    /// Flush every non-empty buffer now, regardless of fill level
    Flush {
        respond_to: oneshot::Sender<Vec<FlushReport>>,
    },

    /// Get sink statistics
    GetStats {
        respond_to: oneshot::Sender<SinkStats>,
    },

    /// Ping the backend
    HealthCheck {
        respond_to: oneshot::Sender<anyhow::Result<String>>,
    },

    /// Stop consuming; buffered rows are discarded
    Shutdown,
}

/// Sink statistics
#[derive(Debug, Clone, Default)]
pub struct SinkStats {
    /// Records pulled from the input queue
    pub records_received: u64,

    /// Records that matched no category
    pub records_unrouted: u64,

    /// Successful bulk inserts
    pub flush_count: u64,

    /// Bulk inserts that failed (rows dropped)
    pub failed_flushes: u64,

    /// Rows written by successful bulk inserts
    pub rows_written: u64,

    /// Rows currently waiting in each category's buffer
    pub buffered: Vec<(Category, usize)>,
}

impl SinkStats {
    /// Buffered rows for one category
    pub fn buffered_rows(&self, category: Category) -> usize {
        self.buffered
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, rows)| *rows)
            .unwrap_or(0)
    }
}
