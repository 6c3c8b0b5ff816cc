//! Bounded-time cached lookup of the local hostname.
//!
//! Event builders default the server name from this cache. A successful
//! lookup stays valid for hours; a failed or timed-out lookup keeps the
//! previous value (the sentinel on first run) and is retried after a short
//! interval, so a wedged resolver slows nothing down and recovery is quick.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

/// Value reported while the real hostname has not been resolved yet.
pub const FALLBACK_HOSTNAME: &str = "unavailable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostnameConfig {
    /// How long a successful lookup stays cached.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub cache_ttl: Duration,
    /// How soon a failed lookup may be retried.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub error_retry: Duration,
    /// Hard cap on a single lookup attempt.
    #[serde(with = "crate::client::config::serde_helpers")]
    pub lookup_timeout: Duration,
}

impl Default for HostnameConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(5 * 60 * 60),
            error_retry: Duration::from_secs(1),
            lookup_timeout: Duration::from_secs(1),
        }
    }
}

/// Resolves the local hostname. Substitutable in tests.
pub trait HostnameLookup: Send + Sync {
    fn lookup(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;
}

/// Default lookup through the operating system.
#[derive(Debug, Default)]
pub struct SystemLookup;

impl HostnameLookup for SystemLookup {
    fn lookup(&self) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
        Box::pin(async {
            match tokio::task::spawn_blocking(hostname::get).await {
                Ok(Ok(name)) => Some(name.to_string_lossy().into_owned()),
                Ok(Err(e)) => {
                    debug!(error = %e, "hostname lookup failed");
                    None
                }
                Err(e) => {
                    debug!(error = %e, "hostname lookup task failed");
                    None
                }
            }
        })
    }
}

struct CacheState {
    value: String,
    valid_until: Instant,
}

struct CacheInner {
    state: RwLock<CacheState>,
    refreshing: AtomicBool,
    lookup: Arc<dyn HostnameLookup>,
    config: HostnameConfig,
}

/// Cached local hostname shared by all event builders.
///
/// Cloning yields another handle to the same state; one instance is
/// constructed per client and handed to every builder.
#[derive(Clone)]
pub struct HostnameCache {
    inner: Arc<CacheInner>,
}

// Hand-written because the lookup trait object has no Debug.
impl fmt::Debug for HostnameCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostnameCache")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl HostnameCache {
    #[must_use]
    pub fn new(config: HostnameConfig) -> Self {
        Self::with_lookup(config, Arc::new(SystemLookup))
    }

    #[must_use]
    pub fn with_lookup(config: HostnameConfig, lookup: Arc<dyn HostnameLookup>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: RwLock::new(CacheState {
                    value: FALLBACK_HOSTNAME.to_string(),
                    valid_until: Instant::now(),
                }),
                refreshing: AtomicBool::new(false),
                lookup,
                config,
            }),
        }
    }

    /// Cached hostname, refreshing inline when expired.
    ///
    /// At most one caller performs the refresh, bounded by the lookup
    /// timeout; concurrent callers get the previous value immediately.
    pub async fn hostname(&self) -> String {
        if self.expired() && self.begin_refresh() {
            refresh(&self.inner).await;
        }
        self.current_value()
    }

    /// Cached hostname without waiting.
    ///
    /// When the value has expired and a runtime is available, a background
    /// refresh is started; the stale value is returned meanwhile.
    pub fn current(&self) -> String {
        if self.expired() && self.begin_refresh() {
            match Handle::try_current() {
                Ok(handle) => {
                    let inner = Arc::clone(&self.inner);
                    handle.spawn(async move { refresh(&inner).await });
                }
                // No runtime to refresh on; let a later caller try again.
                Err(_) => self.inner.refreshing.store(false, Ordering::Release),
            }
        }
        self.current_value()
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.inner.state.read().valid_until
    }

    fn current_value(&self) -> String {
        self.inner.state.read().value.clone()
    }

    fn begin_refresh(&self) -> bool {
        self.inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

async fn refresh(inner: &CacheInner) {
    // Clear the flag even if the refresh future is dropped mid-lookup.
    struct ClearFlag<'a>(&'a AtomicBool);
    impl Drop for ClearFlag<'_> {
        fn drop(&mut self) {
            self.0.store(false, Ordering::Release);
        }
    }
    let _flag = ClearFlag(&inner.refreshing);

    let result = timeout(inner.config.lookup_timeout, inner.lookup.lookup()).await;
    let mut state = inner.state.write();
    match result {
        Ok(Some(name)) => {
            debug!(hostname = %name, "resolved local hostname");
            state.value = name;
            state.valid_until = Instant::now() + inner.config.cache_ttl;
        }
        Ok(None) => {
            warn!("hostname lookup failed, keeping previous value");
            state.valid_until = Instant::now() + inner.config.error_retry;
        }
        Err(_) => {
            warn!(
                timeout = ?inner.config.lookup_timeout,
                "hostname lookup timed out, keeping previous value"
            );
            state.valid_until = Instant::now() + inner.config.error_retry;
        }
    }
}
