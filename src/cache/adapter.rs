//! Cache Adapter
//!
//! Implementation of the [`SimpleCache`] contract over a [`RemoteStoreClient`].
//! Every public operation funnels into one of four paths (batched get,
//! batched set, batched delete, single-key existence/flush), each wrapped by
//! the same failure-mode decision.
//!
//! # Known precision loss
//!
//! The store reports a missing key as [`MISS_SENTINEL`] (`false`). A key that
//! genuinely holds `false` therefore reads back as a miss whenever the caller
//! asks for a different default. Telling the two apart would take an extra
//! existence round trip on every miss, which this adapter does not do.
//!
//! # Concurrency
//!
//! The adapter adds no locking around store calls. Switching modes with
//! [`CacheAdapter::set_mode`] while other tasks are mid-call means those calls
//! may observe either mode; serialize mode flips externally if that matters.

use crate::cache::entry::{unique_keys, Ttl};
use crate::cache::metrics::{AdapterMetrics, AdapterStatsSnapshot};
use crate::cache::mode::FailureMode;
use crate::cache::SimpleCache;
use crate::config::AdapterConfig;
use crate::domain::ports::{CacheValue, RemoteStoreClient, StoreOp, MISS_SENTINEL};
use crate::error::{Error, Result, StoreError};
use crate::store::StoreFactory;
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// Cache Adapter
// =============================================================================

/// Generic cache backed by a remote key-value store
///
/// The only state that influences behaviour is the failure mode; the traffic
/// counters are diagnostics.
pub struct CacheAdapter {
    /// Connection to the backing store
    store: Arc<dyn RemoteStoreClient>,
    /// Active failure policy, read at every decision
    mode: RwLock<FailureMode>,
    /// Traffic counters; diagnostics only, never consulted by any decision
    metrics: AdapterMetrics,
}

impl CacheAdapter {
    /// Wrap a connected store, surfacing failures as errors
    pub async fn new(store: Arc<dyn RemoteStoreClient>) -> Result<Self> {
        Self::with_mode(store, FailureMode::default()).await
    }

    /// Wrap a connected store with an explicit failure mode
    ///
    /// Pings the store first. Under [`FailureMode::Exception`] a failed probe
    /// is a [`Error::Connectivity`]; under [`FailureMode::Fail`] the adapter
    /// is still returned and later calls degrade on their own.
    pub async fn with_mode(store: Arc<dyn RemoteStoreClient>, mode: FailureMode) -> Result<Self> {
        let adapter = Self {
            store,
            mode: RwLock::new(mode),
            metrics: AdapterMetrics::new(),
        };
        adapter.probe().await?;
        info!(mode = %mode, "Cache adapter initialized");
        Ok(adapter)
    }

    /// Open the configured store and wrap it
    pub async fn from_config(config: &AdapterConfig) -> Result<Self> {
        config.validate()?;
        let store = StoreFactory::connect(&config.store, &config.codec).await?;
        Self::with_mode(store, config.mode).await
    }

    /// Replace the failure mode for all subsequent calls
    pub fn set_mode(&self, mode: FailureMode) {
        let previous = std::mem::replace(&mut *self.mode.write(), mode);
        if previous != mode {
            info!(from = %previous, to = %mode, "Cache adapter failure mode changed");
        }
    }

    /// Current failure mode
    pub fn mode(&self) -> FailureMode {
        *self.mode.read()
    }

    /// Traffic counters so far
    pub fn stats(&self) -> AdapterStatsSnapshot {
        self.metrics.snapshot()
    }

    /// The underlying store client
    pub fn store(&self) -> &Arc<dyn RemoteStoreClient> {
        &self.store
    }

    /// Check that the store answers, under the active failure mode
    ///
    /// A refused or unacknowledged ping raises [`Error::RemoteUnavailable`]
    /// under `Exception` and reports `false` under `Fail`.
    pub async fn ping(&self) -> Result<bool> {
        self.metrics.record_round_trip();
        match self.store.ping().await {
            Ok(true) => Ok(true),
            Ok(false) => self.handle_failure(
                StoreOp::Ping,
                StoreError::Unavailable("ping was not acknowledged".to_string()),
                || false,
            ),
            Err(e) => self.handle_failure(StoreOp::Ping, e, || false),
        }
    }

    /// Liveness probe run at construction
    async fn probe(&self) -> Result<()> {
        self.metrics.record_round_trip();
        let failure = match self.store.ping().await {
            Ok(true) => return Ok(()),
            Ok(false) => StoreError::Unavailable("ping was not acknowledged".to_string()),
            Err(e) => e,
        };

        self.metrics.record_remote_error();
        match self.mode() {
            FailureMode::Exception => {
                warn!(error = %failure, "Remote store liveness probe failed");
                Err(Error::Connectivity { source: failure })
            }
            FailureMode::Fail => {
                warn!(error = %failure, "Remote store liveness probe failed, continuing degraded");
                Ok(())
            }
        }
    }

    /// Apply the failure mode to a transport failure
    ///
    /// Raises under `Exception`; otherwise logs and hands back the
    /// conservative fallback for the operation.
    fn handle_failure<T>(
        &self,
        operation: StoreOp,
        source: StoreError,
        fallback: impl FnOnce() -> T,
    ) -> Result<T> {
        self.metrics.record_remote_error();
        match self.mode() {
            FailureMode::Exception => {
                warn!(operation = %operation, error = %source, "Remote store call failed");
                Err(Error::RemoteUnavailable { operation, source })
            }
            FailureMode::Fail => {
                warn!(operation = %operation, error = %source, "Remote store call failed, degrading");
                self.metrics.record_degraded();
                Ok(fallback())
            }
        }
    }

    /// Resolve raw store values against the caller's default
    fn resolve(
        &self,
        keys: Vec<String>,
        raw: Vec<CacheValue>,
        default: &CacheValue,
    ) -> IndexMap<String, CacheValue> {
        let misses = raw.iter().filter(|value| **value == MISS_SENTINEL).count() as u64;
        self.metrics.record_lookups(raw.len() as u64 - misses, misses);

        // Substituting the sentinel for itself is a no-op
        if *default == MISS_SENTINEL {
            return keys.into_iter().zip(raw).collect();
        }

        keys.into_iter()
            .zip(raw)
            .map(|(key, value)| {
                if value == MISS_SENTINEL {
                    (key, default.clone())
                } else {
                    (key, value)
                }
            })
            .collect()
    }

    /// Per-key SETEX loop; no short-circuit on a `false` result
    async fn set_each_with_expiry(
        &self,
        values: &IndexMap<String, CacheValue>,
        ttl_seconds: u64,
    ) -> Result<bool> {
        let mut ok = true;
        for (key, value) in values {
            self.metrics.record_round_trip();
            let stored = match self.store.set_with_expiry(key, ttl_seconds, value).await {
                Ok(stored) => stored,
                Err(e) => self.handle_failure(StoreOp::SetWithExpiry, e, || false)?,
            };
            self.metrics.record_write(stored, 1);
            if !stored {
                debug!(key = %key, ttl = ttl_seconds, "Store rejected write");
                ok = false;
            }
        }
        Ok(ok)
    }
}

#[async_trait]
impl SimpleCache for CacheAdapter {
    async fn get_many(
        &self,
        keys: &[String],
        default: CacheValue,
    ) -> Result<IndexMap<String, CacheValue>> {
        let keys = unique_keys(keys);
        if keys.is_empty() {
            return Ok(IndexMap::new());
        }

        self.metrics.record_round_trip();
        let fetched = self.store.multi_get(&keys).await.and_then(|raw| {
            if raw.len() == keys.len() {
                Ok(raw)
            } else {
                Err(StoreError::Protocol(format!(
                    "MGET returned {} values for {} keys",
                    raw.len(),
                    keys.len()
                )))
            }
        });

        match fetched {
            Ok(raw) => {
                debug!(keys = keys.len(), "Fetched keys from remote store");
                Ok(self.resolve(keys, raw, &default))
            }
            Err(e) => self.handle_failure(StoreOp::MultiGet, e, || {
                keys.into_iter().map(|key| (key, default.clone())).collect()
            }),
        }
    }

    async fn set_many(
        &self,
        values: IndexMap<String, CacheValue>,
        ttl: Option<Ttl>,
    ) -> Result<bool> {
        // Usage errors are raised before anything else, in every mode
        let ttl_seconds = ttl.as_ref().map(Ttl::as_seconds).transpose()?;

        if values.is_empty() {
            return Ok(true);
        }

        // The store has no batched form of SETEX
        if let Some(secs) = ttl_seconds {
            return self.set_each_with_expiry(&values, secs).await;
        }

        self.metrics.record_round_trip();
        let count = values.len() as u64;
        match self.store.multi_set(&values).await {
            Ok(stored) => {
                self.metrics.record_write(stored, count);
                debug!(keys = count, stored, "Stored keys in remote store");
                Ok(stored)
            }
            Err(e) => {
                let result = self.handle_failure(StoreOp::MultiSet, e, || false);
                self.metrics.record_write(false, count);
                result
            }
        }
    }

    async fn delete_many(&self, keys: &[String]) -> Result<bool> {
        let keys = unique_keys(keys);
        if keys.is_empty() {
            return Ok(true);
        }

        self.metrics.record_round_trip();
        match self.store.multi_delete(&keys).await {
            Ok(removed) => {
                self.metrics.record_deletes(removed);
                debug!(requested = keys.len(), removed, "Deleted keys from remote store");
                Ok(removed == keys.len() as u64)
            }
            Err(e) => self.handle_failure(StoreOp::MultiDelete, e, || false),
        }
    }

    async fn has(&self, key: &str) -> Result<bool> {
        self.metrics.record_round_trip();
        match self.store.exists_count(key).await {
            Ok(count) => Ok(count > 0),
            Err(e) => self.handle_failure(StoreOp::ExistsCount, e, || false),
        }
    }

    async fn clear(&self) -> Result<bool> {
        self.metrics.record_round_trip();
        match self.store.flush_current_namespace().await {
            Ok(flushed) => {
                info!(flushed, "Cleared current cache namespace");
                Ok(flushed)
            }
            Err(e) => self.handle_failure(StoreOp::FlushNamespace, e, || false),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
