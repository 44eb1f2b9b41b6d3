use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use capture_sink::{
    CaptureRecord,
    actors::sink::{SinkHandle, SinkSettings, start},
    config::read_config_file,
    storage::{QueryTemplates, memory::MemoryBackend},
};
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,

    /// Keep statements in memory instead of writing to the database
    #[arg(long)]
    dry_run: bool,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("capture_sink", LevelFilter::DEBUG),
        ("sink", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;
    let error_count = Arc::new(AtomicU64::new(0));
    let (record_tx, record_rx) = mpsc::channel(config.queue_capacity);

    let (handle, sink) = if args.dry_run {
        let templates = QueryTemplates::build(
            config.database.driver,
            config.database.sip_bulk_size(),
            config.database.rtc_bulk_size(),
        )?;
        let settings =
            SinkSettings::new(templates).with_flush_interval(config.database.flush_interval());
        info!("dry run, statements are kept in memory");
        SinkHandle::spawn(
            record_rx,
            Box::new(MemoryBackend::new()),
            settings,
            error_count.clone(),
        )
    } else {
        start(&config.database, record_rx, error_count.clone()).await?
    };

    let (done_tx, done_rx) = oneshot::channel();
    let reader_errors = error_count.clone();
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            read_records(std::io::stdin().lock(), record_tx, reader_errors);
            let _ = done_tx.send(());
        })?;

    tokio::select! {
        _ = done_rx => {
            // the reader dropped its sender, so the queue is closed
            debug!("input exhausted");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, stopping");
            handle.shutdown().await;
        }
    }

    sink.await?;

    info!(
        "sink stopped, {} records/rows lost",
        error_count.load(Ordering::Relaxed)
    );
    Ok(())
}

/// Feed newline-delimited JSON records into the queue
///
/// Reads block, so this runs on a dedicated thread that is left behind when
/// the process exits on Ctrl-C.
#[instrument(skip_all)]
fn read_records(
    input: impl BufRead,
    record_tx: mpsc::Sender<CaptureRecord>,
    error_count: Arc<AtomicU64>,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("error reading input: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let record = match serde_json::from_str::<CaptureRecord>(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed record: {e}");
                error_count.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        if record_tx.blocking_send(record).is_err() {
            warn!("sink stopped, no longer reading input");
            break;
        }
    }
}
