//! Buffering layer: failed events are kept and retried on a schedule.

use super::guard::with_sdk_internal;
use super::{Connection, ConnectionError, ConnectionFuture, EventSendCallback};
use crate::buffer::Buffer;
use crate::domain::Event;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Period between flush cycles.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub flush_interval: Duration,
    /// Cap on waiting for the flush task to stop during close.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub shutdown_timeout: Duration,
    /// Capacity of the in-memory buffer built by the client.
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(1),
            capacity: 100,
        }
    }
}

/// Decorates a [`Connection`] with persistence of failed events.
///
/// Sends that fail transiently park the event in the buffer; a background
/// task periodically replays buffered events and discards the ones that get
/// through. Successful sends discard their event in case it is a resident
/// from an earlier failure.
pub struct BufferedConnection {
    inner: Arc<dyn Connection>,
    buffer: Arc<dyn Buffer>,
    nudge: Arc<Notify>,
    flusher: parking_lot::Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    shutdown_timeout: Duration,
    closed: AtomicBool,
}

impl BufferedConnection {
    /// Spawn the flush task. Must be called within a tokio runtime.
    #[must_use]
    pub fn new(inner: Arc<dyn Connection>, buffer: Arc<dyn Buffer>, config: &BufferConfig) -> Self {
        let nudge = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let flusher = tokio::spawn(flush_loop(
            Arc::clone(&inner),
            Arc::clone(&buffer),
            Arc::clone(&nudge),
            config.flush_interval,
            cancel.clone(),
        ));

        Self {
            inner,
            buffer,
            nudge,
            flusher: parking_lot::Mutex::new(Some(flusher)),
            cancel,
            shutdown_timeout: config.shutdown_timeout,
            closed: AtomicBool::new(false),
        }
    }
}

impl Connection for BufferedConnection {
    fn send(&self, event: Event) -> ConnectionFuture<'_> {
        Box::pin(async move {
            match self.inner.send(event.clone()).await {
                Ok(()) => {
                    // The event may be a resident from an earlier failure.
                    self.buffer.discard(&event);
                    self.nudge.notify_one();
                    Ok(())
                }
                Err(error) => {
                    if error.is_transient() {
                        debug!(event_id = %event.id(), "buffering event after failed send");
                        self.buffer.add(event);
                    }
                    Err(error)
                }
            }
        })
    }

    fn close(&self) -> ConnectionFuture<'_> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            self.cancel.cancel();
            let flusher = self.flusher.lock().take();
            if let Some(handle) = flusher {
                let abort = handle.abort_handle();
                if timeout(self.shutdown_timeout, handle).await.is_err() {
                    warn!("flush task did not stop in time, aborting it");
                    abort.abort();
                }
            }
            self.inner.close().await
        })
    }
}

async fn flush_loop(
    inner: Arc<dyn Connection>,
    buffer: Arc<dyn Buffer>,
    nudge: Arc<Notify>,
    flush_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // `interval` fires immediately; swallow that tick so the first flush
    // happens one full period after startup.
    ticker.tick().await;

    debug!(interval = ?flush_interval, "buffer flush task started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => flush(&inner, &buffer).await,
            () = nudge.notified() => flush(&inner, &buffer).await,
        }
    }
    debug!("buffer flush task stopped");
}

/// One replay pass: oldest first, discard on success, stop at the first
/// failure and leave the rest for the next cycle.
async fn flush(inner: &Arc<dyn Connection>, buffer: &Arc<dyn Buffer>) {
    let events = buffer.events();
    if events.is_empty() {
        return;
    }
    debug!(count = events.len(), "replaying buffered events");
    for event in events {
        let event_id = event.id();
        match with_sdk_internal(inner.send(event.clone())).await {
            Ok(()) => buffer.discard(&event),
            Err(error) => {
                debug!(event_id = %event_id, error = %error, "buffered event still undeliverable");
                break;
            }
        }
    }
}

/// Send-outcome observer that keeps the buffer in step with real delivery
/// results.
///
/// When the buffered layer sits above the asynchronous layer its own send
/// path only observes queue handoffs. Registering this hook on the retrying
/// layer records the eventual outcome of every attempt instead: transient
/// failures are buffered, successes are discarded.
pub struct BufferHook {
    buffer: Arc<dyn Buffer>,
}

impl BufferHook {
    #[must_use]
    pub fn new(buffer: Arc<dyn Buffer>) -> Self {
        Self { buffer }
    }
}

impl EventSendCallback for BufferHook {
    fn on_failure(&self, event: &Event, error: &ConnectionError) {
        if error.is_transient() {
            self.buffer.add(event.clone());
        }
    }

    fn on_success(&self, event: &Event) {
        self.buffer.discard(event);
    }
}
