use super::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry in the trail of application activity recorded before an event.
///
/// Breadcrumbs are attached to an event in insertion order by the builder and
/// reported to the collector alongside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl Breadcrumb {
    /// Breadcrumb with the given message, timestamped now.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: None,
            level: None,
            message: Some(message.into()),
            category: None,
            data: HashMap::new(),
        }
    }
}
