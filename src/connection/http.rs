//! HTTP transport POSTing JSON events to the collector's store endpoint.

use super::ConnectionError;
use super::transport::Transport;
use crate::domain::Event;
use reqwest::header::{CONTENT_TYPE, HeaderValue, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Proxy};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the auth string assembled by the retrying layer.
pub const AUTH_HEADER: &str = "X-Sentry-Auth";
/// Header through which the collector explains a rejection.
pub const ERROR_HEADER: &str = "X-Sentry-Error";

#[derive(Error, Debug)]
pub enum TransportInitError {
    #[error("invalid store endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("invalid proxy '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Endpoint, credentials and HTTP tunables for the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Store endpoint events are POSTed to.
    pub endpoint: String,
    /// Public half of the project credentials.
    pub public_key: String,
    /// Secret half; newer collectors accept the public key alone.
    pub secret_key: Option<String>,
    /// Whole-request timeout per attempt.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub timeout: Duration,
    /// TCP connect timeout.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub connect_timeout: Duration,
    /// Proxy URL for environments that cannot reach the collector directly.
    pub proxy: Option<String>,
    /// Skip TLS certificate validation. Only for collectors with self-signed
    /// certificates.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            public_key: String::new(),
            secret_key: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            proxy: None,
            accept_invalid_certs: false,
        }
    }
}

/// reqwest-based [`Transport`].
///
/// Events are serialized to JSON per attempt; the connection pool is shared
/// across attempts and shut down when the transport is dropped.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportInitError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|e| TransportInitError::InvalidEndpoint {
                url: config.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(crate::CLIENT_IDENTIFIER);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy.clone()).map_err(|e| {
                TransportInitError::InvalidProxy {
                    url: proxy.clone(),
                    reason: e.to_string(),
                }
            })?);
        }

        if config.accept_invalid_certs {
            warn!("TLS certificate validation disabled for event transport");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for HttpTransport {
    async fn send_event(&self, event: &Event, auth_header: &str) -> Result<(), ConnectionError> {
        let body = serde_json::to_vec(event)?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTH_HEADER, auth_header)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| classify_request_error(e, self.timeout))?;

        let status = response.status();
        if status.is_success() {
            debug!(event_id = %event.id(), status = status.as_u16(), "event accepted by collector");
            return Ok(());
        }

        let recommended_lockdown = parse_retry_after(response.headers().get(RETRY_AFTER));
        let message = match response
            .headers()
            .get(ERROR_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(detail) => detail.to_string(),
            None => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        };

        warn!(
            event_id = %event.id(),
            status = status.as_u16(),
            message = %message,
            "collector rejected event"
        );

        Err(ConnectionError::Rejected {
            status: status.as_u16(),
            message,
            recommended_lockdown,
        })
    }

    async fn close(&self) -> Result<(), ConnectionError> {
        // The pool is torn down when the reqwest client is dropped.
        Ok(())
    }
}

fn classify_request_error(error: reqwest::Error, timeout: Duration) -> ConnectionError {
    if error.is_timeout() {
        ConnectionError::Timeout(timeout)
    } else {
        ConnectionError::Network(error)
    }
}

/// `Retry-After` arrives as fractional seconds. Values that do not parse to a
/// finite, non-negative number are ignored.
fn parse_retry_after(value: Option<&HeaderValue>) -> Option<Duration> {
    let seconds: f64 = value?.to_str().ok()?.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| Duration::from_secs_f64(seconds))
}
