//! Opt-in diagnostics for the SDK itself.

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter: this crate at debug, noisy HTTP internals quieted.
fn default_directives() -> String {
    format!(
        "{}=debug,hyper=warn,reqwest=warn,h2=warn",
        env!("CARGO_CRATE_NAME")
    )
}

/// Install a tracing subscriber for SDK diagnostics.
///
/// Runs at most once per process and yields to any subscriber the host
/// installed first. `VARSEL_LOG` overrides the default directives.
pub fn init_debug_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("VARSEL_LOG")
            .unwrap_or_else(|_| EnvFilter::new(default_directives()));
        let result = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).compact())
            .try_init();
        if result.is_err() {
            tracing::debug!("a tracing subscriber is already installed, keeping it");
        }
    });
}
