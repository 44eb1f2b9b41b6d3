//! Failure tests for the sink
//!
//! These tests verify that:
//! - A failed bulk insert drops its batch without stopping ingestion
//! - Lost rows are surfaced through the shared error counter
//! - Setup errors are reported before the sink starts

use std::sync::atomic::Ordering;

use capture_sink::actors::messages::FlushTrigger;
use capture_sink::config::Driver;
use capture_sink::storage::Category;

use crate::helpers::*;

#[tokio::test]
async fn test_failed_flush_is_dropped_and_counted() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 2));
    let mut reports = sink.handle.subscribe();
    sink.backend.fail_next(1);

    for i in 0..4 {
        sink.send(create_sip_record("REGISTER", &format!("reg-{i}")))
            .await;
    }

    let first = reports.recv().await.unwrap();
    assert!(!first.is_ok());
    assert_eq!(first.rows, 2);
    assert_eq!(first.trigger, FlushTrigger::Capacity);

    let second = reports.recv().await.unwrap();
    assert!(second.is_ok());

    let stats = sink.handle.get_stats().await.unwrap();
    assert_eq!(stats.failed_flushes, 1);
    assert_eq!(stats.flush_count, 1);
    assert_eq!(stats.rows_written, 2);

    let error_count = sink.error_count.clone();
    let backend = sink.close().await;

    // only the second batch made it, nothing was retried
    let statements = backend.statements().await;
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].category, Category::Registration);
    assert_eq!(error_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ingestion_continues_after_repeated_failures() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 1));
    sink.backend.fail_next(3);

    for i in 0..5 {
        sink.send(create_sip_record("INVITE", &format!("call-{i}")))
            .await;
    }

    let error_count = sink.error_count.clone();
    let backend = sink.close().await;

    assert_eq!(backend.statements().await.len(), 2);
    assert_eq!(error_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_shutdown_discards_buffered_rows() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 10));

    sink.send(create_sip_record("INVITE", "call-1")).await;
    sink.wait_for_received(1).await;

    sink.handle.shutdown().await;
    let backend = sink.close().await;

    assert!(backend.statements().await.is_empty());
}

#[tokio::test]
async fn test_handle_reports_backend_health() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 10));

    let health = sink.handle.health_check().await.unwrap();
    assert!(health.contains("In-memory"));

    sink.close().await;
}

#[tokio::test]
async fn test_handle_reports_unhealthy_backend_as_error() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 10));
    sink.backend.set_healthy(false);

    let err = sink.handle.health_check().await.unwrap_err();
    assert!(err.to_string().contains("unhealthy"));

    sink.backend.set_healthy(true);
    assert!(sink.handle.health_check().await.is_ok());

    sink.close().await;
}

#[cfg(feature = "storage-sql")]
#[tokio::test]
async fn test_start_rejects_malformed_address() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    use capture_sink::actors::sink::start;
    use capture_sink::config::DatabaseConfig;
    use capture_sink::storage::StorageError;

    let config = DatabaseConfig {
        driver: Driver::Mysql,
        address: "localhost:3306:extra".to_string(),
        user: "root".to_string(),
        password: None,
        database_name: "homer_data".to_string(),
        bulk_size: 100,
        pool_size: 10,
        flush_interval_secs: None,
    };
    let (_record_tx, record_rx) = tokio::sync::mpsc::channel(1);

    let result = start(&config, record_rx, Arc::new(AtomicU64::new(0))).await;
    assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
}

#[cfg(feature = "storage-sql")]
#[tokio::test]
async fn test_start_surfaces_refused_connection() {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    use capture_sink::actors::sink::start;
    use capture_sink::config::DatabaseConfig;
    use capture_sink::storage::StorageError;

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = DatabaseConfig {
        driver: Driver::Mysql,
        address: format!("127.0.0.1:{port}"),
        user: "root".to_string(),
        password: None,
        database_name: "homer_data".to_string(),
        bulk_size: 100,
        pool_size: 10,
        flush_interval_secs: None,
    };
    let (_record_tx, record_rx) = tokio::sync::mpsc::channel(1);

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        start(&config, record_rx, Arc::new(AtomicU64::new(0))),
    )
    .await
    .expect("setup should fail without retrying");

    match result.err() {
        Some(StorageError::ConnectionFailed(msg)) => assert!(!msg.contains("pool timed out")),
        other => panic!("expected a connection failure, got {other:?}"),
    }
}
