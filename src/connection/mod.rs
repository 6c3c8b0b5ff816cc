//! The connection chain that delivers events to the collector.
//!
//! One object-safe trait, [`Connection`], is implemented by every layer.
//! Decorators own their wrapped layer as `Arc<dyn Connection>`, so chains
//! compose freely at client init; the stock chain is
//! buffered -> asynchronous -> retrying -> HTTP transport.

pub mod asynchronous;
pub mod buffered;
pub mod guard;
pub mod http;
pub mod retrying;
pub mod transport;

pub use asynchronous::{AsyncConfig, AsyncConnection};
pub use buffered::{BufferConfig, BufferHook, BufferedConnection};
pub use guard::{is_sdk_internal, with_sdk_internal};
pub use http::HttpTransport;
pub use retrying::{DeliveryStats, LockdownConfig, RetryingConnection};
pub use transport::Transport;

use crate::domain::Event;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Future returned by the object-safe [`Connection`] methods.
pub type ConnectionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), ConnectionError>> + Send + 'a>>;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("network failure: {0}")]
    Network(reqwest::Error),
    #[error("collector rejected event (status {status}): {message}")]
    Rejected {
        status: u16,
        message: String,
        recommended_lockdown: Option<Duration>,
    },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("event payload could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("connection is closed")]
    Closed,
}

impl ConnectionError {
    /// Whether a retry can be expected to succeed.
    ///
    /// Transient failures engage the lockdown machine and buffering;
    /// serialization problems and lifecycle misuse do not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Rejected { .. } | Self::Timeout(_) => true,
            Self::Payload(_) | Self::Closed => false,
        }
    }

    /// Lockdown duration the collector asked for, when it supplied one.
    pub fn recommended_lockdown(&self) -> Option<Duration> {
        match self {
            Self::Rejected {
                recommended_lockdown,
                ..
            } => *recommended_lockdown,
            _ => None,
        }
    }
}

/// A delivery path for events.
///
/// `send` fails with the typed error when delivery (or handoff, for layers
/// that queue) fails. `close` releases resources and is idempotent; layers
/// always close their wrapped connection, whatever happened before.
pub trait Connection: Send + Sync {
    fn send(&self, event: Event) -> ConnectionFuture<'_>;
    fn close(&self) -> ConnectionFuture<'_>;
}

/// Observer of delivery outcomes on the retrying layer.
///
/// `on_failure` is invoked at most once per failed send. Panics raised by an
/// implementation are caught and logged, never propagated to the sender.
pub trait EventSendCallback: Send + Sync {
    fn on_failure(&self, event: &Event, error: &ConnectionError);

    /// Successful deliveries; the default does nothing.
    fn on_success(&self, _event: &Event) {}
}

/// Key material identifying this project to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub public_key: String,
    pub secret_key: Option<String>,
}
