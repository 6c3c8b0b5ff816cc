//! Domain layer for varsel-reporter.
//!
//! Contains the event model shared across all modules:
//! - `Event`: the immutable captured record handed to the connection chain
//! - `EventBuilder`: single-use staging object, fills defaults at build time
//! - `HostnameCache`: bounded-time local hostname lookup backing the builder
//! - interface payloads (exception/stacktrace/http/user) attached to events

pub mod breadcrumb;
pub mod builder;
pub mod event;
pub mod hostname;
pub mod interfaces;
pub mod level;

pub use breadcrumb::Breadcrumb;
pub use builder::{BuildError, EventBuilder};
pub use event::{DEFAULT_PLATFORM, Event, SdkInfo};
pub use hostname::{
    FALLBACK_HOSTNAME, HostnameCache, HostnameConfig, HostnameLookup, SystemLookup,
};
pub use interfaces::{
    ExceptionValue, HttpInterface, SentryInterface, StackFrame, StacktraceInterface, UserInterface,
};
pub use level::Level;
