use super::breadcrumb::Breadcrumb;
use super::event::{DEFAULT_PLATFORM, Event, SdkInfo};
use super::hostname::HostnameCache;
use super::interfaces::SentryInterface;
use super::level::Level;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::mem;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    #[error("an event can only be built once")]
    AlreadyBuilt,
}

/// Staging object for a single [`Event`].
///
/// The event id is assigned when the builder is created; everything else may
/// be set through the chaining methods. [`build`](Self::build) fills defaults
/// for unset fields and succeeds at most once per builder; setters invoked
/// after a successful build have no effect.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    hostname: HostnameCache,
    id: Uuid,
    timestamp: Option<DateTime<Utc>>,
    level: Option<Level>,
    message: Option<String>,
    logger: Option<String>,
    platform: Option<String>,
    sdk: Option<SdkInfo>,
    culprit: Option<String>,
    transaction: Option<String>,
    server_name: Option<String>,
    release: Option<String>,
    dist: Option<String>,
    environment: Option<String>,
    checksum: Option<String>,
    tags: HashMap<String, String>,
    extra: HashMap<String, Value>,
    breadcrumbs: Vec<Breadcrumb>,
    fingerprint: Vec<String>,
    contexts: HashMap<String, HashMap<String, Value>>,
    interfaces: HashMap<String, SentryInterface>,
    built: bool,
}

impl EventBuilder {
    /// Start a fresh event backed by the given hostname cache.
    #[must_use]
    pub fn new(hostname: HostnameCache) -> Self {
        Self {
            hostname,
            id: Uuid::new_v4(),
            timestamp: None,
            level: None,
            message: None,
            logger: None,
            platform: None,
            sdk: None,
            culprit: None,
            transaction: None,
            server_name: None,
            release: None,
            dist: None,
            environment: None,
            checksum: None,
            tags: HashMap::new(),
            extra: HashMap::new(),
            breadcrumbs: Vec::new(),
            fingerprint: Vec::new(),
            contexts: HashMap::new(),
            interfaces: HashMap::new(),
            built: false,
        }
    }

    /// Id the built event will carry.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_logger(mut self, logger: impl Into<String>) -> Self {
        self.logger = Some(logger.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_sdk(mut self, sdk: SdkInfo) -> Self {
        self.sdk = Some(sdk);
        self
    }

    pub fn with_culprit(mut self, culprit: impl Into<String>) -> Self {
        self.culprit = Some(culprit.into());
        self
    }

    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = Some(transaction.into());
        self
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_dist(mut self, dist: impl Into<String>) -> Self {
        self.dist = Some(dist.into());
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_breadcrumb(mut self, breadcrumb: Breadcrumb) -> Self {
        self.breadcrumbs.push(breadcrumb);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: Vec<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    pub fn with_context(
        mut self,
        name: impl Into<String>,
        context: HashMap<String, Value>,
    ) -> Self {
        self.contexts.insert(name.into(), context);
        self
    }

    /// Attach a structured payload under its canonical interface name,
    /// replacing any payload previously filed under the same name.
    pub fn with_interface(mut self, interface: SentryInterface) -> Self {
        self.interfaces
            .insert(interface.interface_name().to_string(), interface);
        self
    }

    /// Finalize the event, filling defaults for everything left unset.
    ///
    /// The timestamp defaults to now (at build time, not builder creation),
    /// the platform and SDK identity to fixed constants, and the server name
    /// to the cached local hostname.
    pub fn build(&mut self) -> Result<Event, BuildError> {
        if mem::replace(&mut self.built, true) {
            return Err(BuildError::AlreadyBuilt);
        }
        Ok(Event {
            id: self.id,
            timestamp: self.timestamp.take().unwrap_or_else(Utc::now),
            level: self.level.take(),
            message: self.message.take(),
            logger: self.logger.take(),
            platform: self
                .platform
                .take()
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            sdk: self.sdk.take().unwrap_or_default(),
            culprit: self.culprit.take(),
            transaction: self.transaction.take(),
            server_name: self
                .server_name
                .take()
                .unwrap_or_else(|| self.hostname.current()),
            release: self.release.take(),
            dist: self.dist.take(),
            environment: self.environment.take(),
            checksum: self.checksum.take(),
            tags: mem::take(&mut self.tags),
            extra: mem::take(&mut self.extra),
            breadcrumbs: mem::take(&mut self.breadcrumbs),
            fingerprint: mem::take(&mut self.fingerprint),
            contexts: mem::take(&mut self.contexts),
            interfaces: mem::take(&mut self.interfaces),
        })
    }
}
