mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{RecordingConnection, make_event};
use varsel_reporter::buffer::{Buffer, MemoryBuffer};
use varsel_reporter::connection::buffered::{BufferConfig, BufferedConnection};
use varsel_reporter::connection::Connection;

fn buffer_config(flush_interval: Duration) -> BufferConfig {
    BufferConfig {
        flush_interval,
        shutdown_timeout: Duration::from_secs(1),
        capacity: 10,
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_is_buffered_and_the_error_propagates() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(1));
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(3600)));

    let event = make_event("will fail");
    let id = event.id();
    assert!(connection.send(event).await.is_err());

    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.events()[0].id(), id);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_failures_are_not_buffered() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(1).with_terminal_failures());
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(3600)));

    assert!(connection.send(make_event("unsendable")).await.is_err());
    assert!(buffer.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flush_cycle_redelivers_buffered_events() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(1));
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(60)));

    let event = make_event("retry me");
    let id = event.id();
    assert!(connection.send(event).await.is_err());
    assert_eq!(buffer.len(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(buffer.is_empty(), "flushed event is discarded");
    assert_eq!(inner.delivered(), vec![id]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_stops_at_the_first_failure_and_keeps_the_rest() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(5));
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(10)));

    assert!(connection.send(make_event("one")).await.is_err());
    assert!(connection.send(make_event("two")).await.is_err());
    assert_eq!(buffer.len(), 2);

    // The first flush attempt fails too; the cycle stops there and nothing
    // is discarded.
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(buffer.len(), 2);

    // Two cycles later the script allows deliveries through and the buffer
    // empties in order.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(buffer.is_empty());
    assert_eq!(inner.delivered_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_successful_send_triggers_an_early_flush() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(1));
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(3600)));

    assert!(connection.send(make_event("stuck")).await.is_err());
    assert_eq!(buffer.len(), 1);

    // A later success signals that the collector is reachable again; the
    // flusher runs long before the next scheduled tick.
    connection.send(make_event("fresh")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(buffer.is_empty());
    assert_eq!(inner.delivered_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_the_flusher_and_closes_inner() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::new());
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(60)));

    connection.close().await.unwrap();
    assert_eq!(inner.close_calls(), 1);

    connection.close().await.unwrap();
    assert_eq!(inner.close_calls(), 1, "close is idempotent");
}

#[tokio::test(start_paused = true)]
async fn test_buffered_events_survive_until_the_collector_recovers() {
    let buffer = Arc::new(MemoryBuffer::new(10));
    let inner = Arc::new(RecordingConnection::failing_first(3));
    let connection =
        BufferedConnection::new(inner.clone(), buffer.clone(), &buffer_config(Duration::from_secs(10)));

    let event = make_event("persistent");
    let id = event.id();
    assert!(connection.send(event).await.is_err());

    // Two more flush cycles fail; the event stays buffered throughout.
    tokio::time::sleep(Duration::from_secs(21)).await;
    assert_eq!(buffer.len(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(buffer.is_empty());
    assert_eq!(inner.delivered(), vec![id]);
}
