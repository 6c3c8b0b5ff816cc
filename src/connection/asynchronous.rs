//! Non-blocking dispatch layer.
//!
//! `send` hands the event to a bounded queue and returns; a small worker pool
//! drains the queue and performs the wrapped sends under the SDK-internal
//! marker. `close` drains cooperatively within a timeout, aborts stragglers,
//! and always closes the wrapped connection.

use super::guard::with_sdk_internal;
use super::{Connection, ConnectionFuture};
use crate::domain::Event;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncConfig {
    /// Number of delivery workers.
    pub workers: usize,
    /// Bounded queue capacity; overflow sheds events.
    pub queue_size: usize,
    /// Whether close drains queued events before stopping.
    pub graceful_shutdown: bool,
    /// Cap on the drain during close.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub shutdown_timeout: Duration,
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_size: 50,
            graceful_shutdown: true,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Event>>>;

/// Decorates a [`Connection`] with queue-and-return semantics.
///
/// A full queue sheds the event with a warning rather than blocking the
/// caller; delivery failures below this layer are reported through the
/// retrying layer's callbacks, not through `send`'s return value.
pub struct AsyncConnection {
    inner: Arc<dyn Connection>,
    queue: mpsc::Sender<Event>,
    receiver: SharedReceiver,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    cancel: CancellationToken,
    closed: AtomicBool,
    dropped: AtomicU64,
    graceful_shutdown: bool,
    shutdown_timeout: Duration,
}

impl AsyncConnection {
    /// Spawn the worker pool. Must be called within a tokio runtime.
    #[must_use]
    pub fn new(inner: Arc<dyn Connection>, config: AsyncConfig) -> Self {
        let (queue, receiver) = mpsc::channel(config.queue_size.max(1));
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancel = CancellationToken::new();

        let workers = (0..config.workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&inner),
                    Arc::clone(&receiver),
                    cancel.clone(),
                ))
            })
            .collect();

        Self {
            inner,
            queue,
            receiver,
            workers: parking_lot::Mutex::new(workers),
            cancel,
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            graceful_shutdown: config.graceful_shutdown,
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Events shed because the queue was full or close cut the drain short.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    async fn drain_remaining(&self) -> u64 {
        let mut receiver = self.receiver.lock().await;
        let mut count = 0;
        while receiver.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

impl Connection for AsyncConnection {
    fn send(&self, event: Event) -> ConnectionFuture<'_> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                debug!(event_id = %event.id(), "connection closed, discarding event");
                return Ok(());
            }
            match self.queue.try_send(event) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(event)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(event_id = %event.id(), "event queue full, shedding event");
                    Ok(())
                }
                Err(TrySendError::Closed(event)) => {
                    debug!(event_id = %event.id(), "event queue gone, discarding event");
                    Ok(())
                }
            }
        })
    }

    fn close(&self) -> ConnectionFuture<'_> {
        Box::pin(async move {
            if self.closed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }

            let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
            let abort_handles: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();

            self.cancel.cancel();
            if self.graceful_shutdown {
                debug!(timeout = ?self.shutdown_timeout, "draining event queue before close");
                if timeout(self.shutdown_timeout, join_all(workers)).await.is_err() {
                    warn!("queue drain timed out, aborting delivery workers");
                    for handle in &abort_handles {
                        handle.abort();
                    }
                }
            } else {
                debug!("graceful shutdown disabled, aborting delivery workers");
                for handle in &abort_handles {
                    handle.abort();
                }
            }

            let undelivered = self.drain_remaining().await;
            if undelivered > 0 {
                self.dropped.fetch_add(undelivered, Ordering::Relaxed);
                warn!(count = undelivered, "events still queued at close were dropped");
            }

            self.inner.close().await
        })
    }
}

async fn worker_loop(
    id: usize,
    inner: Arc<dyn Connection>,
    receiver: SharedReceiver,
    cancel: CancellationToken,
) {
    debug!(worker = id, "delivery worker started");
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                drain(id, &inner, &receiver).await;
                break;
            }
            event = next_event(&receiver) => {
                let Some(event) = event else { break };
                deliver(id, &inner, event).await;
            }
        }
    }
    debug!(worker = id, "delivery worker stopped");
}

async fn next_event(receiver: &SharedReceiver) -> Option<Event> {
    receiver.lock().await.recv().await
}

/// Failures stay inside the worker; a failed send must never kill it.
async fn deliver(id: usize, inner: &Arc<dyn Connection>, event: Event) {
    let event_id = event.id();
    if let Err(error) = with_sdk_internal(inner.send(event)).await {
        debug!(worker = id, event_id = %event_id, error = %error, "queued delivery failed");
    }
}

/// Cooperative drain after cancellation: deliver what is already queued,
/// then stop.
async fn drain(id: usize, inner: &Arc<dyn Connection>, receiver: &SharedReceiver) {
    loop {
        let next = receiver.lock().await.try_recv();
        match next {
            Ok(event) => deliver(id, inner, event).await,
            Err(_) => break,
        }
    }
}
