//! Structured payloads attached to events under well-known interface names.
//!
//! The collector recognizes a fixed set of interface names; each carries a
//! typed payload describing one aspect of the captured occurrence (the
//! exception chain, a stack trace, the HTTP request in flight, the acting
//! user).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Interface name for an exception chain.
pub const EXCEPTION_INTERFACE: &str = "sentry.interfaces.Exception";
/// Interface name for a standalone stack trace.
pub const STACKTRACE_INTERFACE: &str = "sentry.interfaces.Stacktrace";
/// Interface name for the HTTP request being handled when the event occurred.
pub const HTTP_INTERFACE: &str = "sentry.interfaces.Http";
/// Interface name for the acting user.
pub const USER_INTERFACE: &str = "sentry.interfaces.User";

/// A single exception in a chain, root cause first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionValue {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub stacktrace: Option<StacktraceInterface>,
}

/// One frame of a stack trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackFrame {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub function: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub lineno: Option<u32>,
    #[serde(default)]
    pub colno: Option<u32>,
    #[serde(default)]
    pub abs_path: Option<String>,
    #[serde(default)]
    pub in_app: Option<bool>,
}

/// Frames ordered oldest call first, matching the collector's convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StacktraceInterface {
    pub frames: Vec<StackFrame>,
}

/// The HTTP request in flight when the event was captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpInterface {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub query_string: Option<String>,
    #[serde(default)]
    pub cookies: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// The user on whose behalf the application was acting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInterface {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// A named structured payload carried on an event.
///
/// Variant order matters for deserialization: `User` is entirely optional and
/// must stay last so it cannot shadow the more specific payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SentryInterface {
    Exception { values: Vec<ExceptionValue> },
    Stacktrace(StacktraceInterface),
    Http(HttpInterface),
    User(UserInterface),
}

impl SentryInterface {
    /// The canonical name this payload is filed under on the event.
    pub fn interface_name(&self) -> &'static str {
        match self {
            Self::Exception { .. } => EXCEPTION_INTERFACE,
            Self::Stacktrace(_) => STACKTRACE_INTERFACE,
            Self::Http(_) => HTTP_INTERFACE,
            Self::User(_) => USER_INTERFACE,
        }
    }
}
