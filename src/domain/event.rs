use super::breadcrumb::Breadcrumb;
use super::interfaces::SentryInterface;
use super::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Platform reported when the builder is given none.
pub const DEFAULT_PLATFORM: &str = "native";

/// SDK identity attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkInfo {
    pub name: String,
    pub version: String,
}

impl Default for SdkInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// An immutable captured diagnostic record destined for the collector.
///
/// Events are created exclusively through
/// [`EventBuilder::build`](super::EventBuilder::build), which fills defaults
/// for everything left unset. Fields are private and collections are exposed
/// only through shared references, so a built event cannot be modified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "event_id")]
    pub(crate) id: Uuid,
    pub(crate) timestamp: DateTime<Utc>,
    #[serde(default)]
    pub(crate) level: Option<Level>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) logger: Option<String>,
    pub(crate) platform: String,
    pub(crate) sdk: SdkInfo,
    #[serde(default)]
    pub(crate) culprit: Option<String>,
    #[serde(default)]
    pub(crate) transaction: Option<String>,
    pub(crate) server_name: String,
    #[serde(default)]
    pub(crate) release: Option<String>,
    #[serde(default)]
    pub(crate) dist: Option<String>,
    #[serde(default)]
    pub(crate) environment: Option<String>,
    #[serde(default)]
    pub(crate) checksum: Option<String>,
    #[serde(default)]
    pub(crate) tags: HashMap<String, String>,
    #[serde(default)]
    pub(crate) extra: HashMap<String, Value>,
    #[serde(default)]
    pub(crate) breadcrumbs: Vec<Breadcrumb>,
    #[serde(default)]
    pub(crate) fingerprint: Vec<String>,
    #[serde(default)]
    pub(crate) contexts: HashMap<String, HashMap<String, Value>>,
    #[serde(default)]
    pub(crate) interfaces: HashMap<String, SentryInterface>,
}

impl Event {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn logger(&self) -> Option<&str> {
        self.logger.as_deref()
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn sdk(&self) -> &SdkInfo {
        &self.sdk
    }

    pub fn culprit(&self) -> Option<&str> {
        self.culprit.as_deref()
    }

    pub fn transaction(&self) -> Option<&str> {
        self.transaction.as_deref()
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    pub fn dist(&self) -> Option<&str> {
        self.dist.as_deref()
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    pub fn extra(&self) -> &HashMap<String, Value> {
        &self.extra
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn fingerprint(&self) -> &[String] {
        &self.fingerprint
    }

    pub fn contexts(&self) -> &HashMap<String, HashMap<String, Value>> {
        &self.contexts
    }

    pub fn interfaces(&self) -> &HashMap<String, SentryInterface> {
        &self.interfaces
    }
}
