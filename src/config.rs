//! Adapter Configuration
//!
//! YAML-loadable settings for building a [`CacheAdapter`]. Every field has a
//! default, so an empty document is a valid configuration:
//!
//! ```yaml
//! store:
//!   backend: redis
//!   url: redis://127.0.0.1:6379
//!   database: 0
//!   connect_timeout_ms: 2000
//!   connect_retries: 2
//! mode: exception
//! codec:
//!   compression: none
//!   min_compress_bytes: 1024
//!   level: 3
//! ```
//!
//! [`CacheAdapter`]: crate::cache::CacheAdapter

use crate::cache::FailureMode;
use crate::error::{Error, Result};
use crate::store::{CodecConfig, ConnectPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Store Configuration
// =============================================================================

/// Which store implementation to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis server over the network
    #[default]
    Redis,
    /// Process-local keyspace
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Redis => write!(f, "redis"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(Error::Configuration(format!("Unknown store backend: {}", other))),
        }
    }
}

/// Connection settings for the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Server URL (ignored by the memory backend)
    pub url: String,
    /// Database index; the adapter's namespace for `clear`
    pub database: u32,
    /// Timeout for each connection attempt, in milliseconds
    pub connect_timeout_ms: u64,
    /// Connection attempts after the first before giving up
    pub connect_retries: usize,
}

impl StoreConfig {
    /// Bootstrap bounds for network backends
    pub fn connect_policy(&self) -> ConnectPolicy {
        ConnectPolicy {
            attempt_timeout: Duration::from_millis(self.connect_timeout_ms),
            retries: self.connect_retries,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            database: 0,
            connect_timeout_ms: 2000,
            connect_retries: 2,
        }
    }
}

// =============================================================================
// Adapter Configuration
// =============================================================================

/// Full adapter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub store: StoreConfig,
    pub mode: FailureMode,
    pub codec: CodecConfig,
}

impl AdapterConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Check settings that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Redis && self.store.url.trim().is_empty() {
            return Err(Error::Configuration(
                "store.url is required for the redis backend".to_string(),
            ));
        }
        if self.store.connect_timeout_ms == 0 {
            return Err(Error::Configuration(
                "store.connect_timeout_ms must be positive".to_string(),
            ));
        }
        self.codec.validate()
    }
}
