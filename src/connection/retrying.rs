//! Backoff/lockdown layer over the transport.
//!
//! All concurrent senders share one lockdown state machine: after a transient
//! failure exactly one task sleeps out the backoff while the rest park until
//! it releases, so a downed collector costs one sleep per cycle no matter how
//! many producers are reporting.

use super::transport::Transport;
use super::{Connection, ConnectionError, ConnectionFuture, Credentials, EventSendCallback};
use crate::domain::Event;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Collector protocol version reported in the auth header.
pub const PROTOCOL_VERSION: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockdownConfig {
    /// Waiting time served after the first failure.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub base_delay: Duration,
    /// Cap on the doubling waiting time and on any single sleep.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub max_delay: Duration,
}

impl Default for LockdownConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

/// Shared failure state machine.
///
/// `locked` flips through a compare-and-swap so exactly one task serves each
/// cycle; `waiting_time` carries the doubling backoff across cycles.
struct Lockdown {
    config: LockdownConfig,
    locked: AtomicBool,
    waiting_time: Mutex<Duration>,
    released: Notify,
    cycles: AtomicU64,
}

impl Lockdown {
    fn new(config: LockdownConfig) -> Self {
        let base_delay = config.base_delay;
        Self {
            config,
            locked: AtomicBool::new(false),
            waiting_time: Mutex::new(base_delay),
            released: Notify::new(),
            cycles: AtomicU64::new(0),
        }
    }

    /// Park until no lockdown cycle is active.
    async fn wait_until_unlocked(&self) {
        while self.locked.load(Ordering::Acquire) {
            let released = self.released.notified();
            tokio::pin!(released);
            // Register interest before re-checking so a release between the
            // check and the await cannot be missed.
            released.as_mut().enable();
            if !self.locked.load(Ordering::Acquire) {
                break;
            }
            released.await;
        }
    }

    /// Try to become the task that serves the next lockdown cycle.
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Serve one lockdown cycle: sleep out the backoff, then double the
    /// waiting time for the next cycle. A recommended duration replaces this
    /// cycle's sleep without touching the doubling sequence. The lock is
    /// released and waiters are woken even if the sleep is cancelled.
    async fn back_off(&self, recommended: Option<Duration>) {
        struct Release<'a>(&'a Lockdown);
        impl Drop for Release<'_> {
            fn drop(&mut self) {
                self.0.locked.store(false, Ordering::Release);
                self.0.released.notify_waiters();
            }
        }
        let _release = Release(self);

        self.cycles.fetch_add(1, Ordering::Relaxed);
        let current = *self.waiting_time.lock();
        let sleep_for = recommended.unwrap_or(current).min(self.config.max_delay);
        debug!(
            sleep_ms = sleep_for.as_millis() as u64,
            recommended = recommended.is_some(),
            "entering lockdown"
        );
        tokio::time::sleep(sleep_for).await;

        let mut waiting_time = self.waiting_time.lock();
        *waiting_time = (*waiting_time * 2).min(self.config.max_delay);
    }

    fn reset(&self) {
        *self.waiting_time.lock() = self.config.base_delay;
    }

    fn waiting_time(&self) -> Duration {
        *self.waiting_time.lock()
    }

    fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct StatsInner {
    sent: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time delivery counters from the retrying layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u64,
    pub failed: u64,
    /// Lockdown cycles served since startup.
    pub lockdowns: u64,
}

/// Decorates a [`Transport`] with the shared lockdown state machine, the
/// collector auth header and outcome observers.
pub struct RetryingConnection<T: Transport> {
    transport: T,
    auth_header: String,
    lockdown: Lockdown,
    callbacks: RwLock<Vec<Arc<dyn EventSendCallback>>>,
    closed: AtomicBool,
    stats: StatsInner,
}

impl<T: Transport> RetryingConnection<T> {
    #[must_use]
    pub fn new(transport: T, credentials: &Credentials, config: LockdownConfig) -> Self {
        Self {
            transport,
            auth_header: auth_header(credentials),
            lockdown: Lockdown::new(config),
            callbacks: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            stats: StatsInner::default(),
        }
    }

    /// Register an observer for send outcomes.
    pub fn add_send_callback(&self, callback: Arc<dyn EventSendCallback>) {
        self.callbacks.write().push(callback);
    }

    /// Auth header value presented to the transport on every attempt.
    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    /// Waiting time the next lockdown cycle would serve.
    pub fn waiting_time(&self) -> Duration {
        self.lockdown.waiting_time()
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            sent: self.stats.sent.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            lockdowns: self.lockdown.cycles(),
        }
    }

    // Snapshot before invoking so a callback may register further callbacks
    // without deadlocking on the write lock.
    fn callbacks_snapshot(&self) -> Vec<Arc<dyn EventSendCallback>> {
        self.callbacks.read().clone()
    }

    fn notify_failure(&self, event: &Event, error: &ConnectionError) {
        for callback in self.callbacks_snapshot() {
            let invoke = AssertUnwindSafe(|| callback.on_failure(event, error));
            if panic::catch_unwind(invoke).is_err() {
                warn!(event_id = %event.id(), "send failure callback panicked");
            }
        }
    }

    fn notify_success(&self, event: &Event) {
        for callback in self.callbacks_snapshot() {
            let invoke = AssertUnwindSafe(|| callback.on_success(event));
            if panic::catch_unwind(invoke).is_err() {
                warn!(event_id = %event.id(), "send success callback panicked");
            }
        }
    }
}

impl<T: Transport> Connection for RetryingConnection<T> {
    fn send(&self, event: Event) -> ConnectionFuture<'_> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(ConnectionError::Closed);
            }

            self.lockdown.wait_until_unlocked().await;
            match self.transport.send_event(&event, &self.auth_header).await {
                Ok(()) => {
                    self.stats.sent.fetch_add(1, Ordering::Relaxed);
                    self.lockdown.reset();
                    self.notify_success(&event);
                    Ok(())
                }
                Err(error) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    if error.is_transient() && self.lockdown.try_lock() {
                        self.lockdown.back_off(error.recommended_lockdown()).await;
                    }
                    self.notify_failure(&event, &error);
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
            debug!("closing retrying connection");
            self.transport.close().await
        })
    }
}

/// Assemble the auth header value:
/// `Sentry sentry_version=<N>,sentry_client=<id>,sentry_key=<public>[,sentry_secret=<secret>]`.
fn auth_header(credentials: &Credentials) -> String {
    let mut header = format!(
        "Sentry sentry_version={PROTOCOL_VERSION},sentry_client={},sentry_key={}",
        crate::CLIENT_IDENTIFIER,
        credentials.public_key
    );
    if let Some(secret) = &credentials.secret_key {
        header.push_str(",sentry_secret=");
        header.push_str(secret);
    }
    header
}
