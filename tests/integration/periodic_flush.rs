//! Tests for the optional time-based flush
//!
//! These run on a paused tokio clock, so intervals elapse instantly once the
//! runtime is idle.

use std::time::Duration;

use tokio::time::Instant;

use capture_sink::actors::messages::FlushTrigger;
use capture_sink::config::Driver;
use capture_sink::record::PROTO_RTCP;
use capture_sink::storage::Category;

use crate::helpers::*;

/// Timers resolve to the millisecond, so allow less than a second of slack
fn assert_waited(since: Instant, secs: u64) {
    let waited = since.elapsed();
    assert!(
        waited >= Duration::from_secs(secs) && waited < Duration::from_secs(secs + 1),
        "waited {waited:?}, expected about {secs}s"
    );
}

#[tokio::test(start_paused = true)]
async fn test_interval_flushes_partial_buffer() {
    let settings =
        create_settings(Driver::Mysql, 10).with_flush_interval(Some(Duration::from_secs(5)));
    let sink = spawn_test_sink(settings);
    let mut reports = sink.handle.subscribe();

    sink.send(create_sip_record("INVITE", "call-1")).await;

    let report = reports.recv().await.unwrap();
    assert_eq!(report.trigger, FlushTrigger::Interval);
    assert_eq!(report.category, Category::Call);
    assert_eq!(report.rows, 1);

    let backend = sink.close().await;
    let statements = backend.statements().await;
    assert_eq!(statements.len(), 1);
    // exact-size statement for the partial batch
    assert_eq!(statements[0].sql.matches('?').count(), 41);
}

#[tokio::test(start_paused = true)]
async fn test_no_interval_means_no_time_based_flush() {
    let sink = spawn_test_sink(create_settings(Driver::Mysql, 10));

    sink.send(create_sip_record("INVITE", "call-1")).await;
    sink.wait_for_received(1).await;

    tokio::time::sleep(Duration::from_secs(3600)).await;

    let stats = sink.handle.get_stats().await.unwrap();
    assert_eq!(stats.buffered_rows(Category::Call), 1);

    let backend = sink.close().await;
    assert!(backend.statements().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_capacity_flush_still_wins_with_interval() {
    let settings =
        create_settings(Driver::Mysql, 2).with_flush_interval(Some(Duration::from_secs(60)));
    let sink = spawn_test_sink(settings);
    let mut reports = sink.handle.subscribe();

    sink.send(create_sip_record("REGISTER", "reg-1")).await;
    sink.send(create_sip_record("REGISTER", "reg-2")).await;

    let report = reports.recv().await.unwrap();
    assert_eq!(report.trigger, FlushTrigger::Capacity);
    assert_eq!(report.rows, 2);

    sink.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_interval_only_flushes_expired_categories() {
    let settings =
        create_settings(Driver::Mysql, 200).with_flush_interval(Some(Duration::from_secs(10)));
    let sink = spawn_test_sink(settings);
    let mut reports = sink.handle.subscribe();
    let started = Instant::now();

    sink.send(create_sip_record("INVITE", "call-1")).await;
    sink.wait_for_received(1).await;

    tokio::time::sleep(Duration::from_secs(6)).await;
    sink.send(create_rtc_record(PROTO_RTCP, "corr-1")).await;
    sink.wait_for_received(2).await;

    // at t=10 only the call row is old enough
    let first = reports.recv().await.unwrap();
    assert_eq!(first.category, Category::Call);
    assert_waited(started, 10);

    let stats = sink.handle.get_stats().await.unwrap();
    assert_eq!(stats.buffered_rows(Category::Rtcp), 1);

    // the RTCP row follows exactly one interval after it arrived
    let second = reports.recv().await.unwrap();
    assert_eq!(second.category, Category::Rtcp);
    assert_eq!(second.trigger, FlushTrigger::Interval);
    assert_waited(started, 16);

    sink.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_row_never_waits_longer_than_one_interval() {
    let settings =
        create_settings(Driver::Mysql, 200).with_flush_interval(Some(Duration::from_secs(10)));
    let sink = spawn_test_sink(settings);
    let mut reports = sink.handle.subscribe();

    // arrive just after a would-be tick boundary
    tokio::time::sleep(Duration::from_millis(10_001)).await;
    let arrived = Instant::now();
    sink.send(create_sip_record("INVITE", "call-1")).await;

    let report = reports.recv().await.unwrap();
    assert_eq!(report.trigger, FlushTrigger::Interval);
    assert_waited(arrived, 10);

    sink.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_disables_time_trigger() {
    let settings = create_settings(Driver::Mysql, 10).with_flush_interval(Some(Duration::ZERO));
    assert_eq!(settings.flush_interval, None);

    let sink = spawn_test_sink(settings);
    sink.send(create_sip_record("INVITE", "call-1")).await;
    sink.wait_for_received(1).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    let stats = sink.handle.get_stats().await.unwrap();
    assert_eq!(stats.buffered_rows(Category::Call), 1);

    let backend = sink.close().await;
    assert!(backend.statements().await.is_empty());
}
