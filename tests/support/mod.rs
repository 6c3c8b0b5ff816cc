// Shared test doubles for the connection-chain tests. Each integration
// binary pulls in the subset it needs.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use uuid::Uuid;
use varsel_reporter::connection::transport::Transport;
use varsel_reporter::connection::{
    Connection, ConnectionError, ConnectionFuture, Credentials, EventSendCallback,
};
use varsel_reporter::domain::{Event, EventBuilder, HostnameCache, HostnameConfig};

pub fn test_hostname_cache() -> HostnameCache {
    HostnameCache::new(HostnameConfig::default())
}

pub fn make_event(message: &str) -> Event {
    EventBuilder::new(test_hostname_cache())
        .with_message(message)
        .build()
        .unwrap()
}

pub fn test_credentials() -> Credentials {
    Credentials {
        public_key: "public".to_string(),
        secret_key: Some("secret".to_string()),
    }
}

/// Rendezvous point: `wait` parks callers until `expected` of them have
/// arrived, then releases them all at once.
pub struct ArrivalGate {
    expected: usize,
    arrived: AtomicUsize,
    release: Notify,
}

impl ArrivalGate {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            arrived: AtomicUsize::new(0),
            release: Notify::new(),
        }
    }

    pub async fn wait(&self) {
        let notified = self.release.notified();
        tokio::pin!(notified);
        // Register before counting so the releasing arrival cannot slip in
        // between.
        notified.as_mut().enable();
        if self.arrived.fetch_add(1, Ordering::AcqRel) + 1 >= self.expected {
            self.release.notify_waiters();
            return;
        }
        notified.await;
    }
}

/// Transport whose outcomes follow a script: the first `fail_first` attempts
/// fail with a transient rejection, everything after succeeds. Wrap it in an
/// `Arc` so the test keeps a handle for assertions.
pub struct ScriptedTransport {
    fail_first: usize,
    attempts: AtomicUsize,
    recommended: Option<Duration>,
    gate: Option<Arc<ArrivalGate>>,
    auth_headers: Mutex<Vec<String>>,
    delivered: Mutex<Vec<Uuid>>,
    close_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn failing_first(fail_first: usize) -> Self {
        Self {
            fail_first,
            attempts: AtomicUsize::new(0),
            recommended: None,
            gate: None,
            auth_headers: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::failing_first(0)
    }

    pub fn always_failing() -> Self {
        Self::failing_first(usize::MAX)
    }

    /// Failures carry this server-recommended lockdown duration.
    pub fn with_recommended(mut self, recommended: Duration) -> Self {
        self.recommended = Some(recommended);
        self
    }

    /// Attempts rendezvous on the gate before producing their outcome.
    pub fn with_gate(mut self, gate: Arc<ArrivalGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn delivered(&self) -> Vec<Uuid> {
        self.delivered.lock().clone()
    }

    pub fn auth_headers(&self) -> Vec<String> {
        self.auth_headers.lock().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    async fn record_send(&self, event: &Event, auth_header: &str) -> Result<(), ConnectionError> {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        self.auth_headers.lock().push(auth_header.to_string());
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel);
        if attempt < self.fail_first {
            return Err(ConnectionError::Rejected {
                status: 503,
                message: "scripted failure".to_string(),
                recommended_lockdown: self.recommended,
            });
        }
        self.delivered.lock().push(event.id());
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    async fn send_event(&self, event: &Event, auth_header: &str) -> Result<(), ConnectionError> {
        self.record_send(event, auth_header).await
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

/// Whether a scripted failure engages the retry machinery.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transient,
    Terminal,
}

/// Connection stub that records deliveries and follows a failure script.
/// Stands in for a wrapped layer under the asynchronous and buffered tests.
pub struct RecordingConnection {
    fail_first: usize,
    failure_kind: FailureKind,
    attempts: AtomicUsize,
    delivered: Mutex<Vec<Uuid>>,
    close_calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    stall: bool,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    pub fn failing_first(fail_first: usize) -> Self {
        Self {
            fail_first,
            failure_kind: FailureKind::Transient,
            attempts: AtomicUsize::new(0),
            delivered: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            gate: None,
            stall: false,
        }
    }

    /// The scripted failures are terminal instead of transient.
    pub fn with_terminal_failures(mut self) -> Self {
        self.failure_kind = FailureKind::Terminal;
        self
    }

    /// Deliveries consume one permit each before completing.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        let mut connection = Self::new();
        connection.gate = Some(gate);
        connection
    }

    /// Deliveries never complete.
    pub fn stalled() -> Self {
        let mut connection = Self::new();
        connection.stall = true;
        connection
    }

    pub fn delivered(&self) -> Vec<Uuid> {
        self.delivered.lock().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Acquire)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }
}

impl Connection for RecordingConnection {
    fn send(&self, event: Event) -> ConnectionFuture<'_> {
        Box::pin(async move {
            if self.stall {
                std::future::pending::<()>().await;
            }
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let attempt = self.attempts.fetch_add(1, Ordering::AcqRel);
            if attempt < self.fail_first {
                return Err(match self.failure_kind {
                    FailureKind::Transient => ConnectionError::Rejected {
                        status: 503,
                        message: "scripted failure".to_string(),
                        recommended_lockdown: None,
                    },
                    FailureKind::Terminal => ConnectionError::Closed,
                });
            }
            self.delivered.lock().push(event.id());
            Ok(())
        })
    }

    fn close(&self) -> ConnectionFuture<'_> {
        Box::pin(async move {
            self.close_calls.fetch_add(1, Ordering::AcqRel);
            Ok(())
        })
    }
}

/// Callback recording the ids of every outcome it observes.
#[derive(Default)]
pub struct CollectingCallback {
    failures: Mutex<Vec<Uuid>>,
    successes: Mutex<Vec<Uuid>>,
}

impl CollectingCallback {
    pub fn failed(&self) -> Vec<Uuid> {
        self.failures.lock().clone()
    }

    pub fn succeeded(&self) -> Vec<Uuid> {
        self.successes.lock().clone()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.lock().len()
    }

    pub fn success_count(&self) -> usize {
        self.successes.lock().len()
    }
}

impl EventSendCallback for CollectingCallback {
    fn on_failure(&self, event: &Event, _error: &ConnectionError) {
        self.failures.lock().push(event.id());
    }

    fn on_success(&self, event: &Event) {
        self.successes.lock().push(event.id());
    }
}

/// Callback that always panics; the retrying layer must contain it.
pub struct PanickingCallback;

impl EventSendCallback for PanickingCallback {
    fn on_failure(&self, _event: &Event, _error: &ConnectionError) {
        panic!("callback exploded");
    }

    fn on_success(&self, _event: &Event) {
        panic!("callback exploded");
    }
}
