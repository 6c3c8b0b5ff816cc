mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{CollectingCallback, ScriptedTransport, make_event, test_credentials};
use varsel_reporter::buffer::{Buffer, MemoryBuffer};
use varsel_reporter::connection::asynchronous::{AsyncConfig, AsyncConnection};
use varsel_reporter::connection::buffered::{BufferConfig, BufferHook, BufferedConnection};
use varsel_reporter::connection::retrying::{LockdownConfig, RetryingConnection};
use varsel_reporter::connection::{Connection, with_sdk_internal};
use varsel_reporter::domain::Level;
use varsel_reporter::{Captured, Client, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The full stock chain over a scripted transport: the collector is down for
/// two attempts, then recovers. The event must come out exactly once, the
/// callbacks must see both failures, and the buffer must end up empty.
#[tokio::test(start_paused = true)]
async fn test_event_survives_an_outage_and_is_delivered_once() {
    let buffer = Arc::new(MemoryBuffer::new(32));
    let transport = Arc::new(ScriptedTransport::failing_first(2));
    let retrying = Arc::new(RetryingConnection::new(
        transport.clone(),
        &test_credentials(),
        LockdownConfig::default(),
    ));
    let callback = Arc::new(CollectingCallback::default());
    retrying.add_send_callback(Arc::new(BufferHook::new(buffer.clone())));
    retrying.add_send_callback(callback.clone());

    let queued = Arc::new(AsyncConnection::new(
        retrying.clone(),
        AsyncConfig {
            workers: 1,
            queue_size: 16,
            graceful_shutdown: true,
            shutdown_timeout: Duration::from_secs(1),
        },
    ));
    let connection = BufferedConnection::new(
        queued,
        buffer.clone(),
        &BufferConfig {
            flush_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(1),
            capacity: 32,
        },
    );

    let event = make_event("critical failure in worker");
    let id = event.id();
    connection.send(event).await.unwrap();

    // Attempt one fails and the event lands in the buffer.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(buffer.len(), 1);
    assert_eq!(callback.failure_count(), 1);

    // The first flush replays it; the collector is still down.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(callback.failure_count(), 2);
    assert_eq!(buffer.len(), 1);

    // The second flush goes through: delivered exactly once, buffer empty.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.delivered(), vec![id]);
    assert_eq!(callback.success_count(), 1);
    assert_eq!(callback.failure_count(), 2);
    assert!(buffer.is_empty());

    connection.close().await.unwrap();
    assert_eq!(transport.close_calls(), 1);
}

#[tokio::test]
async fn test_client_delivers_through_a_real_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/7/store/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = Config::new(format!("{}/api/7/store/", server.uri()), "public");
    config.transport.secret_key = Some("secret".to_string());
    config.release = Some("1.2.3".to_string());
    config.tags.insert("service".to_string(), "checkout".to_string());
    config.attach_shutdown_hook = false;

    let client = Client::init(config).await.unwrap();

    let mut builder = client
        .event_builder()
        .with_level(Level::Warning)
        .with_message("latency spike");
    let event = builder.build().unwrap();
    assert_eq!(event.release(), Some("1.2.3"));
    assert_eq!(
        event.tags().get("service").map(String::as_str),
        Some("checkout")
    );

    let captured = client.capture_event(event).await.unwrap();
    assert_eq!(captured, Captured::Accepted);

    // Give the delivery worker a moment, then verify and shut down.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let stats = client.stats();
    assert_eq!(stats.sent, 1);
    assert_eq!(stats.failed, 0);

    client.close().await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_captures_from_sdk_delivery_work_are_dropped() {
    let mut config = Config::new("http://127.0.0.1:1/api/7/store/", "public");
    config.attach_shutdown_hook = false;

    let client = Client::init(config).await.unwrap();

    let mut builder = client.event_builder();
    let event = builder.build().unwrap();
    let captured = with_sdk_internal(client.capture_event(event)).await.unwrap();
    assert_eq!(captured, Captured::SdkInternal);

    client.close().await.unwrap();

    let mut builder = client.event_builder();
    let late = builder.build().unwrap();
    assert_eq!(
        client.capture_event(late).await.unwrap(),
        Captured::Closed
    );
}

#[tokio::test]
async fn test_sampler_gates_captures_before_the_chain() {
    let mut config = Config::new("http://127.0.0.1:1/api/7/store/", "public");
    config.attach_shutdown_hook = false;
    config.sample_rate = Some(0.0);

    let client = Client::init(config).await.unwrap();

    let mut builder = client.event_builder();
    let event = builder.build().unwrap();
    assert_eq!(
        client.capture_event(event).await.unwrap(),
        Captured::Sampled
    );
    assert_eq!(client.stats().sent, 0);

    client.close().await.unwrap();
}
