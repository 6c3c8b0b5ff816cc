//! Client-side delivery pipeline for the Varsel event collector.
//!
//! The crate captures structured diagnostic events inside a host application
//! and relays them to a remote collector without blocking the host's own
//! execution path. Delivery runs through a chain of connection layers composed
//! at init time: buffering with periodic retry, asynchronous dispatch, and a
//! backoff/lockdown layer over the HTTP transport.

#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_possible_wrap,       // Safe in non-negative contexts
    clippy::cast_precision_loss,      // Acceptable for rates/display
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ConnectionError in connection module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod buffer;
pub mod client;
pub mod connection;
pub mod domain;
pub mod sampling;

// Re-export main types for easy access
pub use client::{Captured, Client, ClientError, Config};
pub use connection::{Connection, ConnectionError, EventSendCallback};
pub use domain::{Breadcrumb, Event, EventBuilder, Level};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Identifier this SDK reports to the collector, both as the
/// `sentry_client` segment of the auth header and as the user agent.
pub const CLIENT_IDENTIFIER: &str = concat!("varsel-reporter/", env!("CARGO_PKG_VERSION"));
