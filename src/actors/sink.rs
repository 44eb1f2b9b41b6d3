//! SinkActor - batches capture records into bulk inserts
//!
//! ## Flow
//!
//! ```text
//! record ──► classify ──► map to row ──► category buffer ──► (full?) flush
//! ```
//!
//! ## Flush Triggers
//!
//! - **Size trigger** (always on): a buffer is flushed as soon as it holds
//!   its bulk size. SIP categories use the configured bulk size, RTC
//!   categories `max(1, bulk_size / 20)`.
//! - **Time trigger** (optional): with a flush interval configured, the actor
//!   sleeps until the oldest buffered row turns one interval old and flushes
//!   that buffer even if it is not full. No row waits longer than one
//!   interval.
//!
//! Flushes run inline. While one is executing no further records are read,
//! so the bounded input queue pushes back on the producer.
//!
//! ## Shutdown
//!
//! When the input queue closes (or `Shutdown` is received) the actor stops
//! without flushing. Rows still buffered are discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, instrument, trace, warn};

use super::messages::{FlushReport, FlushTrigger, SinkCommand, SinkStats};
use crate::batch::BatchBuffer;
use crate::mapping::map_record;
use crate::record::CaptureRecord;
use crate::storage::schema::{Category, table_name};
use crate::storage::{BulkInsert, QueryTemplates, StorageBackend};

#[cfg(feature = "storage-sql")]
use crate::config::DatabaseConfig;
#[cfg(feature = "storage-sql")]
use crate::storage::StorageResult;

/// Source of the calendar date used for table partitioning
pub type DateSource = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Flush reports kept for slow subscribers
const FLUSH_EVENT_CAPACITY: usize = 64;

const COMMAND_CAPACITY: usize = 32;

/// Today's date in the local time zone
pub fn local_date() -> DateSource {
    Arc::new(|| Local::now().date_naive())
}

/// Everything the sink needs besides its channels and backend
#[derive(Clone)]
pub struct SinkSettings {
    pub templates: QueryTemplates,
    pub flush_interval: Option<Duration>,
    pub date_source: DateSource,
}

impl SinkSettings {
    pub fn new(templates: QueryTemplates) -> Self {
        Self {
            templates,
            flush_interval: None,
            date_source: local_date(),
        }
    }

    /// A zero interval disables the time trigger
    pub fn with_flush_interval(mut self, flush_interval: Option<Duration>) -> Self {
        self.flush_interval = flush_interval.filter(|period| !period.is_zero());
        self
    }

    pub fn with_date_source(mut self, date_source: DateSource) -> Self {
        self.date_source = date_source;
        self
    }
}

/// Single consumer of the capture queue
pub struct SinkActor {
    templates: QueryTemplates,

    /// One buffer per category, indexed by `Category::index`
    buffers: Vec<BatchBuffer>,

    backend: Box<dyn StorageBackend>,

    record_rx: mpsc::Receiver<CaptureRecord>,

    command_rx: mpsc::Receiver<SinkCommand>,

    flush_tx: broadcast::Sender<FlushReport>,

    /// Rows lost to failed flushes, shared with the caller
    error_count: Arc<AtomicU64>,

    flush_interval: Option<Duration>,

    date_source: DateSource,

    stats: SinkStats,
}

impl SinkActor {
    pub fn new(
        record_rx: mpsc::Receiver<CaptureRecord>,
        command_rx: mpsc::Receiver<SinkCommand>,
        flush_tx: broadcast::Sender<FlushReport>,
        backend: Box<dyn StorageBackend>,
        settings: SinkSettings,
        error_count: Arc<AtomicU64>,
    ) -> Self {
        let buffers = Category::ALL
            .iter()
            .map(|category| {
                let capacity = settings.templates.for_category(*category).capacity();
                BatchBuffer::new(*category, capacity)
            })
            .collect();

        Self {
            templates: settings.templates,
            buffers,
            backend,
            record_rx,
            command_rx,
            flush_tx,
            error_count,
            flush_interval: settings.flush_interval,
            date_source: settings.date_source,
            stats: SinkStats::default(),
        }
    }

    /// Run the actor's main loop until the input queue closes
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!(
            "starting sink actor (sip bulk: {}, rtc bulk: {}, flush interval: {:?})",
            self.buffers[Category::Call.index()].capacity(),
            self.buffers[Category::Rtcp.index()].capacity(),
            self.flush_interval
        );

        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                record = self.record_rx.recv() => {
                    match record {
                        Some(record) => self.ingest(record).await,
                        None => {
                            debug!("input queue closed, stopping");
                            break;
                        }
                    }
                }

                // Time-based flush trigger
                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.flush_expired().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    if let SinkCommand::Shutdown = cmd {
                        debug!("received shutdown command");
                        break;
                    }
                    self.handle_command(cmd).await;
                }
            }
        }

        self.discard_pending();

        debug!("closing backend");
        if let Err(e) = self.backend.close().await {
            error!("error closing backend: {}", e);
        }

        debug!("sink actor stopped");
    }

    /// Classify one record and append it to its category's buffer
    async fn ingest(&mut self, record: CaptureRecord) {
        self.stats.records_received += 1;

        let Some((category, row)) = map_record(&record) else {
            trace!(
                "ignoring record with protocol type {} (correlation id: {:?})",
                record.proto_type, record.correlation_id
            );
            self.stats.records_unrouted += 1;
            return;
        };

        trace!("buffering {} row from {}", category, record.src_ip);
        if self.buffers[category.index()].push(row) {
            self.flush(category, FlushTrigger::Capacity).await;
        }
    }

    /// Write one category's buffer as a single multi-row insert
    ///
    /// The table date is taken now, not when the rows were buffered.
    async fn flush(&mut self, category: Category, trigger: FlushTrigger) -> Option<FlushReport> {
        let buffer = &mut self.buffers[category.index()];
        if buffer.is_empty() {
            return None;
        }

        let (rows, values) = buffer.take();
        let table = table_name(category, (self.date_source)());
        let sql = self.templates.for_category(category).render(&table, rows);
        let statement = BulkInsert {
            category,
            table,
            sql,
            rows,
            values,
        };

        debug!(
            "flushing {} {} rows into {} ({:?})",
            rows, category, statement.table, trigger
        );

        let result = match self.backend.execute_bulk(&statement).await {
            Ok(affected) => {
                self.stats.flush_count += 1;
                self.stats.rows_written += rows as u64;
                trace!(
                    "flush #{} complete ({} rows affected)",
                    self.stats.flush_count, affected
                );
                Ok(affected)
            }
            Err(e) => {
                error!(
                    "failed to flush {} {} rows into {}: {}",
                    rows, category, statement.table, e
                );
                self.stats.failed_flushes += 1;
                self.error_count.fetch_add(rows as u64, Ordering::Relaxed);
                Err(e.to_string())
            }
        };

        let report = FlushReport {
            category,
            table: statement.table,
            rows,
            trigger,
            result,
            flushed_at: Utc::now(),
        };
        // No subscribers is fine
        let _ = self.flush_tx.send(report.clone());

        Some(report)
    }

    /// When the oldest buffered row across all categories turns one interval old
    fn next_deadline(&self) -> Option<Instant> {
        let period = self.flush_interval?;
        self.buffers
            .iter()
            .filter_map(BatchBuffer::oldest)
            .min()
            .map(|oldest| oldest + period)
    }

    /// Flush buffers whose oldest row has waited a full interval
    async fn flush_expired(&mut self) {
        let Some(period) = self.flush_interval else {
            return;
        };

        for category in Category::ALL {
            let due = self.buffers[category.index()]
                .oldest()
                .is_some_and(|since| since.elapsed() >= period);

            if due {
                trace!("time-based flush triggered for {}", category);
                self.flush(category, FlushTrigger::Interval).await;
            }
        }
    }

    async fn flush_all(&mut self, trigger: FlushTrigger) -> Vec<FlushReport> {
        let mut reports = Vec::new();
        for category in Category::ALL {
            if let Some(report) = self.flush(category, trigger).await {
                reports.push(report);
            }
        }
        reports
    }

    fn discard_pending(&self) {
        for buffer in &self.buffers {
            if !buffer.is_empty() {
                warn!(
                    "discarding {} unflushed {} rows",
                    buffer.len(),
                    buffer.category()
                );
            }
        }
    }

    /// Handle a command
    async fn handle_command(&mut self, cmd: SinkCommand) {
        match cmd {
            SinkCommand::Flush { respond_to } => {
                debug!("manual flush requested");
                let reports = self.flush_all(FlushTrigger::Manual).await;
                let _ = respond_to.send(reports);
            }

            SinkCommand::GetStats { respond_to } => {
                let _ = respond_to.send(self.get_stats());
            }

            SinkCommand::HealthCheck { respond_to } => {
                let result = match self.backend.health_check().await {
                    Ok(health) if health.healthy => Ok(health.message),
                    Ok(health) => Err(anyhow::anyhow!("backend unhealthy: {}", health.message)),
                    Err(e) => Err(e.into()),
                };
                let _ = respond_to.send(result);
            }

            SinkCommand::Shutdown => {
                // handled by the main loop
            }
        }
    }

    fn get_stats(&self) -> SinkStats {
        SinkStats {
            buffered: self
                .buffers
                .iter()
                .map(|buffer| (buffer.category(), buffer.len()))
                .collect(),
            ..self.stats.clone()
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Handle for controlling the SinkActor
#[derive(Clone)]
pub struct SinkHandle {
    sender: mpsc::Sender<SinkCommand>,
    flush_tx: broadcast::Sender<FlushReport>,
}

impl SinkHandle {
    /// Spawn a sink consuming `record_rx`
    ///
    /// The returned task finishes once the input queue is closed and drained.
    pub fn spawn(
        record_rx: mpsc::Receiver<CaptureRecord>,
        backend: Box<dyn StorageBackend>,
        settings: SinkSettings,
        error_count: Arc<AtomicU64>,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (flush_tx, _) = broadcast::channel(FLUSH_EVENT_CAPACITY);

        let actor = SinkActor::new(
            record_rx,
            cmd_rx,
            flush_tx.clone(),
            backend,
            settings,
            error_count,
        );

        let task = tokio::spawn(actor.run());

        (
            Self {
                sender: cmd_tx,
                flush_tx,
            },
            task,
        )
    }

    /// Subscribe to flush reports
    pub fn subscribe(&self) -> broadcast::Receiver<FlushReport> {
        self.flush_tx.subscribe()
    }

    /// Flush all partially filled buffers
    pub async fn flush(&self) -> anyhow::Result<Vec<FlushReport>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SinkCommand::Flush { respond_to: tx })
            .await?;

        Ok(rx.await?)
    }

    /// Get sink statistics
    pub async fn get_stats(&self) -> Option<SinkStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SinkCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    /// Check backend health
    pub async fn health_check(&self) -> anyhow::Result<String> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SinkCommand::HealthCheck { respond_to: tx })
            .await?;

        rx.await?
    }

    /// Stop the sink without flushing
    pub async fn shutdown(&self) {
        let _ = self.sender.send(SinkCommand::Shutdown).await;
    }
}

/// Connect, build the statement templates and spawn the sink
///
/// Setup errors stop the sink before it starts. The backend is closed again
/// if the templates cannot be built.
#[cfg(feature = "storage-sql")]
#[instrument(skip_all)]
pub async fn start(
    config: &DatabaseConfig,
    record_rx: mpsc::Receiver<CaptureRecord>,
    error_count: Arc<AtomicU64>,
) -> StorageResult<(SinkHandle, JoinHandle<()>)> {
    let backend = crate::storage::connection::connect(config).await?;

    let templates = match QueryTemplates::build(
        config.driver,
        config.sip_bulk_size(),
        config.rtc_bulk_size(),
    ) {
        Ok(templates) => templates,
        Err(e) => {
            error!("{e}");
            if let Err(close_err) = backend.close().await {
                warn!("error closing backend: {}", close_err);
            }
            return Err(e);
        }
    };

    let settings = SinkSettings::new(templates).with_flush_interval(config.flush_interval());
    Ok(SinkHandle::spawn(record_rx, backend, settings, error_count))
}
