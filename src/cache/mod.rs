//! Simple Cache Contract
//!
//! A small, stable caching interface (get/set/delete, batch variants,
//! existence checks, clear) and the adapter that implements it on top of a
//! remote key-value store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SimpleCache (contract)                           │
//! │   get ─┐        set ─┐        delete ─┐                                  │
//! │        ▼             ▼                ▼                                  │
//! │   get_many       set_many       delete_many       has       clear        │
//! ├────────┬─────────────┬────────────────┬────────────┬──────────┬──────────┤
//! │        │      CacheAdapter (FailureMode wrapper per path)     │          │
//! │        ▼             ▼                ▼            ▼          ▼          │
//! │      MGET     MSET / SETEX×n         DEL         EXISTS     FLUSHDB      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                  RemoteStoreClient (Redis / in-memory)                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use simple_cache_adapter::cache::{CacheAdapter, FailureMode, SimpleCache, Ttl};
//! use simple_cache_adapter::store::MemoryStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let cache = CacheAdapter::with_mode(Arc::new(MemoryStore::new()), FailureMode::Fail).await?;
//!
//! cache.set("user:1", json!({"name": "ada"}), Some(Ttl::Seconds(60))).await?;
//! let user = cache.get("user:1", json!(null)).await?;
//!
//! // Serve every request as a miss if the store goes away
//! cache.set_mode(FailureMode::Fail);
//! ```

pub mod adapter;
pub mod entry;
pub mod metrics;
pub mod mode;

// Re-export main types
pub use adapter::CacheAdapter;
pub use entry::{unique_keys, Ttl, MAX_TTL_SECONDS};
pub use metrics::{AdapterMetrics, AdapterStatsSnapshot};
pub use mode::FailureMode;

use crate::domain::ports::CacheValue;
use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// SimpleCache Trait (Port)
// =============================================================================

/// Generic cache contract consumed by application code
///
/// Single-key operations are provided in terms of the batch operations, so an
/// implementation only supplies the batch primitives.
#[async_trait]
pub trait SimpleCache: Send + Sync {
    /// Fetch several keys at once
    ///
    /// Duplicate keys collapse to one entry; the result holds one entry per
    /// distinct key, in first-seen order. Misses are reported as `default`.
    async fn get_many(
        &self,
        keys: &[String],
        default: CacheValue,
    ) -> Result<IndexMap<String, CacheValue>>;

    /// Store several values, optionally expiring after `ttl`
    async fn set_many(
        &self,
        values: IndexMap<String, CacheValue>,
        ttl: Option<Ttl>,
    ) -> Result<bool>;

    /// Remove several keys
    ///
    /// Returns true only if every distinct key existed and was removed.
    async fn delete_many(&self, keys: &[String]) -> Result<bool>;

    /// Check whether a key is present
    async fn has(&self, key: &str) -> Result<bool>;

    /// Remove every key in the current namespace
    async fn clear(&self) -> Result<bool>;

    /// Fetch one key, returning `default` on a miss
    async fn get(&self, key: &str, default: CacheValue) -> Result<CacheValue> {
        let mut values = self.get_many(&[key.to_owned()], default.clone()).await?;
        Ok(values.swap_remove(key).unwrap_or(default))
    }

    /// Store one value
    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Ttl>) -> Result<bool> {
        let mut values = IndexMap::with_capacity(1);
        values.insert(key.to_owned(), value);
        self.set_many(values, ttl).await
    }

    /// Remove one key
    async fn delete(&self, key: &str) -> Result<bool> {
        self.delete_many(&[key.to_owned()]).await
    }
}

/// Type alias for Arc'd SimpleCache
pub type SimpleCacheRef = Arc<dyn SimpleCache>;

// =============================================================================
// Typed Helpers
// =============================================================================

/// Typed convenience layer over any [`SimpleCache`]
#[async_trait]
pub trait SimpleCacheExt: SimpleCache {
    /// Fetch a key and deserialize it into `T`
    ///
    /// A miss, a stored `null`, or a value of the wrong shape all come back
    /// as `None`.
    async fn get_as<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let value = self.get(key, CacheValue::Null).await?;
        if value.is_null() {
            return Ok(None);
        }
        match serde_json::from_value(value) {
            Ok(typed) => Ok(Some(typed)),
            Err(e) => {
                debug!(key = %key, error = %e, "Cached value has unexpected shape, treating as miss");
                Ok(None)
            }
        }
    }

    /// Serialize `value` and store it under `key`
    async fn set_as<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Ttl>,
    ) -> Result<bool> {
        let value =
            serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))?;
        self.set(key, value, ttl).await
    }
}

impl<C: SimpleCache + ?Sized> SimpleCacheExt for C {}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SampleObject {
        id: u32,
        name: String,
        ratio: f64,
        active: bool,
    }

    async fn adapter() -> CacheAdapter {
        CacheAdapter::new(Arc::new(MemoryStore::new())).await.unwrap()
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = adapter().await;
        let object = SampleObject {
            id: 3,
            name: "three".into(),
            ratio: 2.5,
            active: true,
        };

        assert!(cache.set_as("sample", &object, None).await.unwrap());
        let loaded: Option<SampleObject> = cache.get_as("sample").await.unwrap();
        assert_eq!(loaded, Some(object));
    }

    #[tokio::test]
    async fn test_typed_miss_and_wrong_shape() {
        let cache = adapter().await;
        let missing: Option<SampleObject> = cache.get_as("absent").await.unwrap();
        assert!(missing.is_none());

        cache.set_as("number", &42u32, None).await.unwrap();
        let wrong: Option<SampleObject> = cache.get_as("number").await.unwrap();
        assert!(wrong.is_none());
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let cache: SimpleCacheRef = Arc::new(adapter().await);
        assert!(cache.set("k", serde_json::json!("v"), None).await.unwrap());
        assert_eq!(
            cache.get("k", CacheValue::Null).await.unwrap(),
            serde_json::json!("v")
        );
        assert!(cache.has("k").await.unwrap());
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.has("k").await.unwrap());
    }
}
