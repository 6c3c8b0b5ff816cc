//! Client composition root: builds the connection chain and hands out
//! pre-seeded event builders.

pub mod config;
pub mod logging;
mod shutdown;

pub use config::{Config, ConfigError};

use crate::buffer::{Buffer, MemoryBuffer};
use crate::connection::asynchronous::AsyncConnection;
use crate::connection::buffered::{BufferHook, BufferedConnection};
use crate::connection::guard::is_sdk_internal;
use crate::connection::http::{HttpTransport, TransportInitError};
use crate::connection::retrying::{DeliveryStats, RetryingConnection};
use crate::connection::{Connection, ConnectionError, Credentials, EventSendCallback};
use crate::domain::{Event, EventBuilder, HostnameCache};
use crate::sampling::{EventSampler, RandomSampler};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportInitError),
}

/// What happened to a captured event before any network hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Captured {
    /// Accepted into the delivery chain.
    Accepted,
    /// Dropped by the sampler.
    Sampled,
    /// Dropped because it was generated by the SDK's own delivery work.
    SdkInternal,
    /// Dropped because the client is closed.
    Closed,
}

struct ClientInner {
    connection: Arc<dyn Connection>,
    retrying: Arc<RetryingConnection<HttpTransport>>,
    hostname: HostnameCache,
    sampler: Option<Box<dyn EventSampler>>,
    release: Option<String>,
    dist: Option<String>,
    environment: Option<String>,
    server_name: Option<String>,
    tags: HashMap<String, String>,
    closed: AtomicBool,
    watcher_cancel: CancellationToken,
}

/// Handle to the delivery pipeline.
///
/// Cloning is cheap and every clone shares the same chain; the first `close`
/// on any clone shuts the pipeline down for all of them.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Build the delivery chain from configuration and start its background
    /// tasks. Must be called within a tokio runtime.
    pub async fn init(config: Config) -> Result<Self, ClientError> {
        config.validate()?;

        if config.debug {
            logging::init_debug_logging();
        }

        let credentials = Credentials {
            public_key: config.transport.public_key.clone(),
            secret_key: config.transport.secret_key.clone(),
        };

        let hostname = HostnameCache::new(config.hostname.clone());
        // Resolve once up front, bounded by the lookup timeout, so the first
        // events already carry a real server name.
        hostname.hostname().await;

        let buffer: Arc<dyn Buffer> = Arc::new(MemoryBuffer::new(config.buffer.capacity));

        let transport = HttpTransport::new(&config.transport)?;
        let retrying = Arc::new(RetryingConnection::new(
            transport,
            &credentials,
            config.lockdown.clone(),
        ));
        // The async layer reports every enqueue as a success, so the buffer
        // has to learn about real outcomes from the retrying layer directly.
        retrying.add_send_callback(Arc::new(BufferHook::new(Arc::clone(&buffer))));

        let queued = Arc::new(AsyncConnection::new(retrying.clone(), config.queue.clone()));
        let connection: Arc<dyn Connection> = Arc::new(BufferedConnection::new(
            queued,
            Arc::clone(&buffer),
            &config.buffer,
        ));

        let sampler: Option<Box<dyn EventSampler>> = config
            .sample_rate
            .map(|rate| Box::new(RandomSampler::new(rate)) as Box<dyn EventSampler>);

        let client = Self {
            inner: Arc::new(ClientInner {
                connection,
                retrying,
                hostname,
                sampler,
                release: config.release.clone(),
                dist: config.dist.clone(),
                environment: config.environment.clone(),
                server_name: config.server_name.clone(),
                tags: config.tags.clone(),
                closed: AtomicBool::new(false),
                watcher_cancel: CancellationToken::new(),
            }),
        };

        if config.attach_shutdown_hook {
            shutdown::spawn_signal_watcher(client.clone(), client.inner.watcher_cancel.clone());
        }

        info!(
            endpoint = %config.transport.endpoint,
            workers = config.queue.workers,
            "event client initialized"
        );
        Ok(client)
    }

    /// Builder pre-seeded with the configured event defaults.
    pub fn event_builder(&self) -> EventBuilder {
        let mut builder = EventBuilder::new(self.inner.hostname.clone());
        if let Some(release) = &self.inner.release {
            builder = builder.with_release(release.clone());
        }
        if let Some(dist) = &self.inner.dist {
            builder = builder.with_dist(dist.clone());
        }
        if let Some(environment) = &self.inner.environment {
            builder = builder.with_environment(environment.clone());
        }
        if let Some(server_name) = &self.inner.server_name {
            builder = builder.with_server_name(server_name.clone());
        }
        for (key, value) in &self.inner.tags {
            builder = builder.with_tag(key.clone(), value.clone());
        }
        builder
    }

    /// Hand an event to the delivery chain.
    ///
    /// The result reports what happened before the network hop; delivery
    /// itself is asynchronous and observable through callbacks and stats.
    /// Events captured from inside the SDK's own delivery work are dropped
    /// to prevent recursive self-reporting.
    pub async fn capture_event(&self, event: Event) -> Result<Captured, ConnectionError> {
        if self.inner.closed.load(Ordering::Acquire) {
            debug!(event_id = %event.id(), "client closed, dropping event");
            return Ok(Captured::Closed);
        }
        if is_sdk_internal() {
            debug!(event_id = %event.id(), "dropping event captured inside SDK delivery work");
            return Ok(Captured::SdkInternal);
        }
        if let Some(sampler) = &self.inner.sampler
            && !sampler.should_send(&event)
        {
            debug!(event_id = %event.id(), "event dropped by sampler");
            return Ok(Captured::Sampled);
        }

        self.inner.connection.send(event).await?;
        Ok(Captured::Accepted)
    }

    /// Register an observer for send outcomes on the retrying layer.
    pub fn add_send_callback(&self, callback: Arc<dyn EventSendCallback>) {
        self.inner.retrying.add_send_callback(callback);
    }

    /// Delivery counters from the retrying layer.
    pub fn stats(&self) -> DeliveryStats {
        self.inner.retrying.stats()
    }

    /// Close the chain: stop accepting events, drain what the shutdown
    /// timeouts allow, release the transport. Idempotent.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.watcher_cancel.cancel();
        info!("closing event client");
        self.inner.connection.close().await
    }
}
