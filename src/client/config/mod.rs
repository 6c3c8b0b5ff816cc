//! Layered configuration: defaults, then a TOML document, then `VARSEL_*`
//! environment variables.

pub mod serde_helpers;

use crate::connection::asynchronous::AsyncConfig;
use crate::connection::buffered::BufferConfig;
use crate::connection::http::TransportConfig;
use crate::connection::retrying::LockdownConfig;
use crate::domain::HostnameConfig;
use serde::{Deserialize, Serialize};
use serde_helpers::{load_env_millis, load_env_string, load_env_string_opt, load_env_var};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Full client configuration.
///
/// The default configuration is deliberately not valid: the store endpoint
/// and public key have no sensible defaults and must be supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Probability in [0.0, 1.0] that a captured event is sent; unset sends
    /// everything.
    pub sample_rate: Option<f64>,
    /// Release stamped on builders from this client.
    pub release: Option<String>,
    /// Distribution stamped on builders from this client.
    pub dist: Option<String>,
    /// Environment stamped on builders from this client.
    pub environment: Option<String>,
    /// Server name override; unset falls back to the hostname cache.
    pub server_name: Option<String>,
    /// Close the client when SIGINT/SIGTERM arrives. Disable when the host
    /// manages shutdown ordering itself.
    pub attach_shutdown_hook: bool,
    /// Emit the SDK's own diagnostics through tracing.
    pub debug: bool,
    /// Tags merged into every builder from this client.
    pub tags: HashMap<String, String>,
    /// Store endpoint, credentials and HTTP tunables.
    pub transport: TransportConfig,
    /// Backoff/lockdown tunables.
    pub lockdown: LockdownConfig,
    /// Asynchronous dispatch tunables.
    pub queue: AsyncConfig,
    /// Failed-event buffering tunables.
    pub buffer: BufferConfig,
    /// Hostname cache tunables.
    pub hostname: HostnameConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: None,
            release: None,
            dist: None,
            environment: None,
            server_name: None,
            attach_shutdown_hook: true,
            debug: false,
            tags: HashMap::new(),
            transport: TransportConfig::default(),
            lockdown: LockdownConfig::default(),
            queue: AsyncConfig::default(),
            buffer: BufferConfig::default(),
            hostname: HostnameConfig::default(),
        }
    }
}

impl Config {
    /// Configuration for the given store endpoint and public key, everything
    /// else at defaults.
    pub fn new(endpoint: impl Into<String>, public_key: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.transport.endpoint = endpoint.into();
        config.transport.public_key = public_key.into();
        config
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration from `VARSEL_*` environment variables layered over the
    /// defaults. `VARSEL_CONFIG` may hold a whole TOML document; individual
    /// variables override it.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = if let Ok(inline) = std::env::var("VARSEL_CONFIG") {
            toml::from_str::<Config>(&inline)?
        } else {
            Config::default()
        };
        config.load_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_env_overrides(&mut self) -> Result<(), ConfigError> {
        load_env_string("VARSEL_ENDPOINT", &mut self.transport.endpoint);
        load_env_string("VARSEL_PUBLIC_KEY", &mut self.transport.public_key);
        load_env_string_opt("VARSEL_SECRET_KEY", &mut self.transport.secret_key);
        load_env_string_opt("VARSEL_PROXY", &mut self.transport.proxy);
        load_env_millis("VARSEL_TIMEOUT_MS", &mut self.transport.timeout)?;
        load_env_millis(
            "VARSEL_CONNECT_TIMEOUT_MS",
            &mut self.transport.connect_timeout,
        )?;
        load_env_var(
            "VARSEL_ACCEPT_INVALID_CERTS",
            &mut self.transport.accept_invalid_certs,
        )?;

        load_env_millis("VARSEL_BASE_DELAY_MS", &mut self.lockdown.base_delay)?;
        load_env_millis("VARSEL_MAX_DELAY_MS", &mut self.lockdown.max_delay)?;

        load_env_var("VARSEL_WORKERS", &mut self.queue.workers)?;
        load_env_var("VARSEL_QUEUE_SIZE", &mut self.queue.queue_size)?;
        load_env_var(
            "VARSEL_GRACEFUL_SHUTDOWN",
            &mut self.queue.graceful_shutdown,
        )?;
        load_env_millis(
            "VARSEL_SHUTDOWN_TIMEOUT_MS",
            &mut self.queue.shutdown_timeout,
        )?;

        load_env_millis("VARSEL_FLUSH_INTERVAL_MS", &mut self.buffer.flush_interval)?;
        load_env_var("VARSEL_BUFFER_CAPACITY", &mut self.buffer.capacity)?;

        if let Ok(raw) = std::env::var("VARSEL_SAMPLE_RATE") {
            let rate: f64 = raw
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid VARSEL_SAMPLE_RATE: {e}")))?;
            self.sample_rate = Some(rate);
        }
        load_env_string_opt("VARSEL_RELEASE", &mut self.release);
        load_env_string_opt("VARSEL_DIST", &mut self.dist);
        load_env_string_opt("VARSEL_ENVIRONMENT", &mut self.environment);
        load_env_string_opt("VARSEL_SERVER_NAME", &mut self.server_name);
        load_env_var(
            "VARSEL_ATTACH_SHUTDOWN_HOOK",
            &mut self.attach_shutdown_hook,
        )?;
        load_env_var("VARSEL_DEBUG", &mut self.debug)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.transport.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid endpoint URL '{}': {}",
                self.transport.endpoint, e
            ))
        })?;

        if self.transport.public_key.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "Public key must not be empty".to_string(),
            ));
        }

        if let Some(rate) = self.sample_rate
            && !(0.0..=1.0).contains(&rate)
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Sample rate must be within [0.0, 1.0], got {rate}"
            )));
        }

        if self.lockdown.base_delay > self.lockdown.max_delay {
            return Err(ConfigError::InvalidConfig(format!(
                "Base delay ({:?}) must not exceed max delay ({:?})",
                self.lockdown.base_delay, self.lockdown.max_delay
            )));
        }

        if self.queue.workers == 0 {
            return Err(ConfigError::InvalidConfig(
                "Worker count must be greater than 0".to_string(),
            ));
        }

        if self.queue.queue_size == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue size must be greater than 0".to_string(),
            ));
        }

        if self.buffer.capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.buffer.flush_interval.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Flush interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
