use serde::{Deserialize, Serialize};

/// Severity of a captured event.
///
/// This is distinct from the tracing levels used for the SDK's own logging;
/// `Level` is the severity reported to the collector on the event itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}
