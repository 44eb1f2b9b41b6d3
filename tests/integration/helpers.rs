//! Helper functions for integration tests

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use capture_sink::actors::sink::{SinkHandle, SinkSettings};
use capture_sink::config::{Driver, rtc_bulk_size};
use capture_sink::record::{CSeq, CaptureRecord, PROTO_SIP, SipMessage, SipUri, StartLine, Via};
use capture_sink::storage::QueryTemplates;
use capture_sink::storage::memory::MemoryBackend;
use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A running sink wired to an in-memory backend
pub struct TestSink {
    pub record_tx: mpsc::Sender<CaptureRecord>,
    pub handle: SinkHandle,
    pub task: JoinHandle<()>,
    pub backend: MemoryBackend,
    pub error_count: Arc<AtomicU64>,
}

impl TestSink {
    pub async fn send(&self, record: CaptureRecord) {
        self.record_tx.send(record).await.unwrap();
    }

    /// Wait until the sink has pulled `count` records off the queue
    pub async fn wait_for_received(&self, count: u64) {
        loop {
            let stats = self.handle.get_stats().await.expect("sink stopped");
            if stats.records_received >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Close the input queue and wait for the sink to stop
    pub async fn close(self) -> MemoryBackend {
        drop(self.record_tx);
        self.task.await.unwrap();
        self.backend
    }
}

pub fn create_settings(driver: Driver, bulk_size: usize) -> SinkSettings {
    let templates = QueryTemplates::build(driver, bulk_size, rtc_bulk_size(bulk_size)).unwrap();
    SinkSettings::new(templates)
}

pub fn spawn_test_sink(settings: SinkSettings) -> TestSink {
    let backend = MemoryBackend::new();
    let error_count = Arc::new(AtomicU64::new(0));
    let (record_tx, record_rx) = mpsc::channel(64);

    let (handle, task) = SinkHandle::spawn(
        record_rx,
        Box::new(backend.clone()),
        settings,
        error_count.clone(),
    );

    TestSink {
        record_tx,
        handle,
        task,
        backend,
        error_count,
    }
}

fn base_record(proto_type: u32) -> CaptureRecord {
    CaptureRecord {
        timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        proto_type,
        correlation_id: String::new(),
        src_ip: "192.168.0.10".to_string(),
        src_port: 5060,
        dst_ip: "192.168.0.20".to_string(),
        dst_port: 5060,
        protocol: 17,
        version: 2,
        node_id: 2001,
        payload: String::new(),
        sip: None,
    }
}

/// A SIP request whose CSeq method is `method`
pub fn create_sip_record(method: &str, call_id: &str) -> CaptureRecord {
    let mut record = base_record(PROTO_SIP);
    record.payload = format!("{method} sip:alice@example.com SIP/2.0\r\nCall-ID: {call_id}\r\n");
    record.sip = Some(SipMessage {
        start_line: StartLine {
            method: method.to_string(),
            resp_text: String::new(),
            uri: SipUri {
                raw: "sip:alice@example.com".to_string(),
                user: "alice".to_string(),
                host: "example.com".to_string(),
                port: 0,
            },
        },
        call_id: call_id.to_string(),
        cseq: CSeq {
            method: method.to_string(),
            value: format!("1 {method}"),
        },
        via: vec![Via {
            value: "SIP/2.0/UDP 192.168.0.10:5060;branch=z9hG4bK77".to_string(),
            branch: "z9hG4bK77".to_string(),
        }],
        ..Default::default()
    });
    record
}

/// A side-channel record with a correlation id
pub fn create_rtc_record(proto_type: u32, correlation_id: &str) -> CaptureRecord {
    let mut record = base_record(proto_type);
    record.correlation_id = correlation_id.to_string();
    record.payload = "{\"type\":200}".to_string();
    record
}
