//! Endpoint configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`defaults.rs`)
//!
//! # Example
//!
//! ```rust,ignore
//! use linkio_runtime::config::EndpointConfig;
//!
//! let config = EndpointConfig::from_env()
//!     .mtu(9000)
//!     .poll_timeout(Duration::from_millis(20));
//! config.validate()?;
//! ```

pub mod defaults;

use linkio_core::env::{env_get, env_get_list};
use linkio_core::error::LinkError;
use linkio_core::tier::TierConfig;
use std::time::Duration;

/// Per-endpoint configuration with builder pattern
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// MTU reported to the stack
    pub mtu: u32,
    /// Receive buffer tiers
    pub tiers: TierConfig,
    /// Name prefix of dispatch threads
    pub thread_name_prefix: String,
    /// Longest single poll() wait in the blocking read
    pub poll_timeout: Duration,
    /// Capacity of queue dispatchers built from this config
    pub queue_capacity: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl EndpointConfig {
    /// Library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `LINKIO_MTU` - MTU in bytes
    /// - `LINKIO_BUF_TIERS` - comma-separated tier sizes, e.g. `256,1024,65536`
    ///   (ignored if it does not validate)
    /// - `LINKIO_THREAD_PREFIX` - dispatch thread name prefix
    /// - `LINKIO_POLL_TIMEOUT_MS` - poll() bound in milliseconds
    /// - `LINKIO_QUEUE_CAPACITY` - queue dispatcher capacity
    pub fn from_env() -> Self {
        let tiers = env_get_list::<usize>("LINKIO_BUF_TIERS")
            .and_then(|sizes| TierConfig::new(sizes).ok())
            .unwrap_or_default();

        Self {
            mtu: env_get("LINKIO_MTU", defaults::MTU),
            tiers,
            thread_name_prefix: env_get(
                "LINKIO_THREAD_PREFIX",
                defaults::THREAD_NAME_PREFIX.to_string(),
            ),
            poll_timeout: Duration::from_millis(env_get(
                "LINKIO_POLL_TIMEOUT_MS",
                defaults::POLL_TIMEOUT_MS,
            )),
            queue_capacity: env_get("LINKIO_QUEUE_CAPACITY", defaults::QUEUE_CAPACITY),
        }
    }

    /// Library defaults only, no environment lookups
    pub fn new() -> Self {
        Self {
            mtu: defaults::MTU,
            tiers: TierConfig::default(),
            thread_name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
            poll_timeout: Duration::from_millis(defaults::POLL_TIMEOUT_MS),
            queue_capacity: defaults::QUEUE_CAPACITY,
        }
    }

    // Builder methods

    pub fn mtu(mut self, mtu: u32) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn tiers(mut self, tiers: TierConfig) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn poll_timeout(mut self, d: Duration) -> Self {
        self.poll_timeout = d;
        self
    }

    pub fn queue_capacity(mut self, cap: usize) -> Self {
        self.queue_capacity = cap;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mtu == 0 {
            return Err(ConfigError::InvalidValue("mtu must be > 0"));
        }
        if self.tiers.total_capacity() < self.mtu as usize {
            return Err(ConfigError::InvalidValue(
                "buffer tiers must hold at least one MTU-sized frame",
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(ConfigError::InvalidValue("thread_name_prefix must not be empty"));
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("poll_timeout must be > 0"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("queue_capacity must be > 0"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("linkio endpoint configuration:");
        eprintln!("  mtu:                {}", self.mtu);
        eprintln!("  tiers:              {:?}", self.tiers.sizes());
        eprintln!("  tier capacity:      {}", self.tiers.total_capacity());
        eprintln!("  thread_name_prefix: {}", self.thread_name_prefix);
        eprintln!("  poll_timeout:       {:?}", self.poll_timeout);
        eprintln!("  queue_capacity:     {}", self.queue_capacity);
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for LinkError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => LinkError::InvalidConfig(msg),
        }
    }
}
