//! Cache Entry Types
//!
//! Key sets and TTLs as accepted by the cache contract.

use crate::error::{Error, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Key Sets
// =============================================================================

/// Collapse duplicate keys, keeping the order in which each key first appears
pub fn unique_keys<K: AsRef<str>>(keys: &[K]) -> Vec<String> {
    keys.iter()
        .map(|key| key.as_ref())
        .collect::<IndexSet<&str>>()
        .into_iter()
        .map(str::to_owned)
        .collect()
}

// =============================================================================
// TTL
// =============================================================================

/// Largest expiry the store accepts (a signed 64-bit second count)
pub const MAX_TTL_SECONDS: u64 = i64::MAX as u64;

/// Time-to-live requested for a write
///
/// Only whole, positive seconds can be sent to the store. Duration objects
/// are accepted by the type so callers can pass what they have, and are
/// rejected as a usage error before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ttl {
    /// Whole seconds
    Seconds(u64),
    /// A duration object (not supported by the store's expiry primitive)
    Interval(Duration),
}

impl Ttl {
    /// Validate and return the number of seconds to send to the store
    pub fn as_seconds(&self) -> Result<u64> {
        match self {
            Ttl::Seconds(0) => Err(Error::InvalidTtl(
                "TTL must be a positive number of seconds".to_string(),
            )),
            Ttl::Seconds(secs) if *secs > MAX_TTL_SECONDS => Err(Error::InvalidTtl(format!(
                "TTL of {} seconds exceeds the maximum of {}",
                secs, MAX_TTL_SECONDS
            ))),
            Ttl::Seconds(secs) => Ok(*secs),
            Ttl::Interval(interval) => Err(Error::InvalidTtl(format!(
                "duration TTLs are not supported ({:?}); pass whole seconds",
                interval
            ))),
        }
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Seconds(secs)
    }
}

impl From<Duration> for Ttl {
    fn from(interval: Duration) -> Self {
        Ttl::Interval(interval)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Seconds(secs) => write!(f, "{}s", secs),
            Ttl::Interval(interval) => write!(f, "{:?}", interval),
        }
    }
}
