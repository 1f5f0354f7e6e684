//! Domain Ports - Remote store boundary
//!
//! The adapter talks to its backing key-value server only through
//! [`RemoteStoreClient`]. Concrete clients (Redis, in-memory) live in
//! [`crate::store`] and implement this trait.

use crate::error::StoreResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Values
// =============================================================================

/// Any value the cache accepts: null, booleans, numbers, strings and nested
/// arrays/objects.
pub type CacheValue = serde_json::Value;

/// What a store reports for a key that is not present.
///
/// A stored literal `false` reads back as exactly this value, so the two
/// cannot be told apart from a multi-get response alone.
pub const MISS_SENTINEL: CacheValue = CacheValue::Bool(false);

// =============================================================================
// Store Operations
// =============================================================================

/// Primitive operations offered by a remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOp {
    Ping,
    MultiGet,
    MultiSet,
    SetWithExpiry,
    MultiDelete,
    ExistsCount,
    FlushNamespace,
}

impl StoreOp {
    /// Every primitive, in declaration order
    pub const ALL: [StoreOp; 7] = [
        StoreOp::Ping,
        StoreOp::MultiGet,
        StoreOp::MultiSet,
        StoreOp::SetWithExpiry,
        StoreOp::MultiDelete,
        StoreOp::ExistsCount,
        StoreOp::FlushNamespace,
    ];

    /// Redis command this primitive maps to
    pub fn command(&self) -> &'static str {
        match self {
            StoreOp::Ping => "PING",
            StoreOp::MultiGet => "MGET",
            StoreOp::MultiSet => "MSET",
            StoreOp::SetWithExpiry => "SETEX",
            StoreOp::MultiDelete => "DEL",
            StoreOp::ExistsCount => "EXISTS",
            StoreOp::FlushNamespace => "FLUSHDB",
        }
    }
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}

// =============================================================================
// RemoteStoreClient Trait (Port)
// =============================================================================

/// Connection to a single key-value server, scoped to one logical namespace
///
/// Implementations encode values through their own codec; callers only ever
/// see [`CacheValue`]s. Thread safety of concurrent calls is whatever the
/// implementation provides.
#[async_trait]
pub trait RemoteStoreClient: Send + Sync {
    /// Liveness probe
    async fn ping(&self) -> StoreResult<bool>;

    /// Fetch several keys in one round trip
    ///
    /// The response is positional: entry `i` belongs to `keys[i]`. Absent
    /// keys are reported as [`MISS_SENTINEL`].
    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<CacheValue>>;

    /// Store several values without expiry in one round trip
    async fn multi_set(&self, values: &IndexMap<String, CacheValue>) -> StoreResult<bool>;

    /// Store a single value that expires after `ttl_seconds`
    async fn set_with_expiry(
        &self,
        key: &str,
        ttl_seconds: u64,
        value: &CacheValue,
    ) -> StoreResult<bool>;

    /// Remove several keys, returning how many actually existed
    async fn multi_delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Number of the given keys that exist (0 or 1 for a single key)
    async fn exists_count(&self, key: &str) -> StoreResult<u64>;

    /// Remove every key in the namespace this connection is scoped to
    ///
    /// Never touches other namespaces on the same server.
    async fn flush_current_namespace(&self) -> StoreResult<bool>;
}

/// Type alias for a shared store client
pub type RemoteStoreRef = Arc<dyn RemoteStoreClient>;
