//! Leaf of the connection chain.

use super::ConnectionError;
use crate::domain::Event;
use std::future::Future;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

/// A single-attempt event sender with no retry logic of its own.
///
/// Implementations fail with a transient error for recoverable transport and
/// server conditions; serialization problems surface as the non-transient
/// payload error. Retry, backoff and buffering all live in the layers above.
#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync {
    /// One delivery attempt, presenting the auth header supplied by the
    /// caller.
    fn send_event(
        &self,
        event: &Event,
        auth_header: &str,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Release transport resources.
    fn close(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send;
}

/// Shared handles forward to the transport they wrap, so a caller can keep a
/// handle for inspection while the connection chain owns another.
impl<T: Transport> Transport for Arc<T> {
    fn send_event(
        &self,
        event: &Event,
        auth_header: &str,
    ) -> impl Future<Output = Result<(), ConnectionError>> + Send {
        (**self).send_event(event, auth_header)
    }

    fn close(&self) -> impl Future<Output = Result<(), ConnectionError>> + Send {
        (**self).close()
    }
}
