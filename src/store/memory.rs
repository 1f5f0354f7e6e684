//! In-Memory Store
//!
//! Process-local implementation of [`RemoteStoreClient`] backed by DashMap.
//! A [`MemoryServer`] holds several numbered databases, and each
//! [`MemoryStore`] is a connection scoped to one of them, the same way a
//! Redis connection is scoped by `SELECT`.
//!
//! Besides serving as a backend for tests and local runs, the store records
//! every primitive call and can be told to fail on demand.

use crate::domain::ports::{CacheValue, RemoteStoreClient, StoreOp, MISS_SENTINEL};
use crate::error::{StoreError, StoreResult};
use crate::store::codec::{CodecConfig, ValueCodec};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// Memory Server
// =============================================================================

#[derive(Debug, Clone)]
struct StoredValue {
    bytes: Bytes,
    expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| at <= now)
    }
}

/// Shared keyspace holding every database
#[derive(Debug, Default)]
pub struct MemoryServer {
    entries: DashMap<(u32, String), StoredValue>,
}

impl MemoryServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys in a database
    pub fn key_count(&self, database: u32) -> usize {
        let now = Utc::now();
        self.entries
            .iter()
            .filter(|e| e.key().0 == database && !e.value().is_expired(now))
            .count()
    }

    /// Drop every key in every database
    ///
    /// Test setup only; not reachable through [`RemoteStoreClient`].
    pub fn flush_all(&self) {
        self.entries.clear();
    }

    fn read(&self, database: u32, key: &str) -> Option<Bytes> {
        let slot = (database, key.to_owned());
        let now = Utc::now();
        let expired = match self.entries.get(&slot) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.bytes.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(&slot);
        }
        None
    }

    fn write(&self, database: u32, key: &str, bytes: Bytes, expires_at: Option<DateTime<Utc>>) {
        self.entries
            .insert((database, key.to_owned()), StoredValue { bytes, expires_at });
    }

    fn remove(&self, database: u32, key: &str) -> bool {
        let now = Utc::now();
        self.entries
            .remove(&(database, key.to_owned()))
            .map_or(false, |(_, value)| !value.is_expired(now))
    }

    fn flush_database(&self, database: u32) {
        self.entries.retain(|(db, _), _| *db != database);
    }
}

// =============================================================================
// Faults and Call Log
// =============================================================================

/// One-shot failure queued for a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with a transport error
    Error,
    /// Succeed at the transport level but report a negative result
    /// (`false`, or a count of 0), without touching data
    Reject,
    /// Answer a multi-get with one value fewer than requested
    Truncate,
}

/// A recorded primitive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub keys: Vec<String>,
}

impl StoreCall {
    pub fn new(op: StoreOp, keys: Vec<String>) -> Self {
        Self { op, keys }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// Connection to one database of a [`MemoryServer`]
pub struct MemoryStore {
    server: Arc<MemoryServer>,
    database: u32,
    codec: ValueCodec,
    available: AtomicBool,
    faults: Mutex<HashMap<StoreOp, VecDeque<Fault>>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    /// Create a store on a private server, database 0
    pub fn new() -> Self {
        Self::connect(Arc::new(MemoryServer::new()), 0)
    }

    /// Connect to a database of a shared server
    pub fn connect(server: Arc<MemoryServer>, database: u32) -> Self {
        Self::with_codec(server, database, CodecConfig::default())
    }

    /// Connect with a specific value codec
    pub fn with_codec(server: Arc<MemoryServer>, database: u32, codec: CodecConfig) -> Self {
        Self {
            server,
            database,
            codec: ValueCodec::new(codec),
            available: AtomicBool::new(true),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// The server this connection talks to
    pub fn server(&self) -> &Arc<MemoryServer> {
        &self.server
    }

    /// Database index this connection is scoped to
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Make every primitive fail (false) or succeed again (true)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// Check if available
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    /// Queue a fault for the next call of `op`
    pub fn inject(&self, op: StoreOp, fault: Fault) {
        self.faults.lock().entry(op).or_default().push_back(fault);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Calls made to one primitive
    pub fn calls_for(&self, op: StoreOp) -> Vec<StoreCall> {
        self.calls.lock().iter().filter(|c| c.op == op).cloned().collect()
    }

    /// Number of calls made to one primitive
    pub fn call_count(&self, op: StoreOp) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Remaining lifetime of a key in whole seconds, like Redis `TTL`
    pub fn ttl_seconds(&self, key: &str) -> Option<i64> {
        self.server
            .entries
            .get(&(self.database, key.to_owned()))
            .and_then(|entry| entry.expires_at)
            .map(|at| (at - Utc::now()).num_seconds())
    }

    /// Record the call, then report any pending fault for it
    fn begin(&self, op: StoreOp, keys: Vec<String>) -> StoreResult<Option<Fault>> {
        self.calls.lock().push(StoreCall::new(op, keys));

        if !self.is_available() {
            return Err(StoreError::Unavailable(format!(
                "memory store db{} is offline",
                self.database
            )));
        }

        match self.faults.lock().get_mut(&op).and_then(VecDeque::pop_front) {
            Some(Fault::Error) => Err(StoreError::Unavailable(format!(
                "injected {} failure",
                op
            ))),
            other => Ok(other),
        }
    }

    fn decode_or_miss(&self, key: &str, bytes: &[u8]) -> CacheValue {
        match self.codec.decode(bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache payload, reporting miss");
                MISS_SENTINEL
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStoreClient for MemoryStore {
    async fn ping(&self) -> StoreResult<bool> {
        Ok(self.begin(StoreOp::Ping, Vec::new())?.is_none())
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<CacheValue>> {
        let fault = self.begin(StoreOp::MultiGet, keys.to_vec())?;

        let mut values: Vec<CacheValue> = keys
            .iter()
            .map(|key| match self.server.read(self.database, key) {
                Some(bytes) => self.decode_or_miss(key, &bytes),
                None => MISS_SENTINEL,
            })
            .collect();

        match fault {
            Some(Fault::Reject) => Ok(vec![MISS_SENTINEL; keys.len()]),
            Some(Fault::Truncate) => {
                values.pop();
                Ok(values)
            }
            _ => Ok(values),
        }
    }

    async fn multi_set(&self, values: &IndexMap<String, CacheValue>) -> StoreResult<bool> {
        if self.begin(StoreOp::MultiSet, values.keys().cloned().collect())?.is_some() {
            return Ok(false);
        }

        // Encode everything first so a codec failure writes nothing
        let encoded = values
            .iter()
            .map(|(key, value)| Ok((key, self.codec.encode(value)?)))
            .collect::<StoreResult<Vec<_>>>()?;
        for (key, bytes) in encoded {
            self.server.write(self.database, key, bytes, None);
        }
        Ok(true)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        ttl_seconds: u64,
        value: &CacheValue,
    ) -> StoreResult<bool> {
        if self.begin(StoreOp::SetWithExpiry, vec![key.to_owned()])?.is_some() {
            return Ok(false);
        }

        let expires_at = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                StoreError::Protocol(format!("invalid expire time in SETEX: {}", ttl_seconds))
            })?;
        self.server
            .write(self.database, key, self.codec.encode(value)?, Some(expires_at));
        Ok(true)
    }

    async fn multi_delete(&self, keys: &[String]) -> StoreResult<u64> {
        if self.begin(StoreOp::MultiDelete, keys.to_vec())?.is_some() {
            return Ok(0);
        }

        Ok(keys
            .iter()
            .filter(|key| self.server.remove(self.database, key))
            .count() as u64)
    }

    async fn exists_count(&self, key: &str) -> StoreResult<u64> {
        if self.begin(StoreOp::ExistsCount, vec![key.to_owned()])?.is_some() {
            return Ok(0);
        }

        Ok(u64::from(self.server.read(self.database, key).is_some()))
    }

    async fn flush_current_namespace(&self) -> StoreResult<bool> {
        if self.begin(StoreOp::FlushNamespace, Vec::new())?.is_some() {
            return Ok(false);
        }

        self.server.flush_database(self.database);
        Ok(true)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::compression::CompressionAlgorithm;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn values(pairs: &[(&str, CacheValue)]) -> IndexMap<String, CacheValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryStore::new();

        assert!(assert_ok!(store.multi_set(&values(&[("a", json!(1)), ("b", json!("two"))])).await));
        assert_eq!(
            assert_ok!(store.multi_get(&keys(&["a", "b", "c"])).await),
            vec![json!(1), json!("two"), MISS_SENTINEL]
        );
        assert_eq!(assert_ok!(store.exists_count("a").await), 1);
        assert_eq!(assert_ok!(store.exists_count("c").await), 0);
        assert_eq!(assert_ok!(store.multi_delete(&keys(&["a", "c"])).await), 1);
        assert_eq!(store.server().key_count(0), 1);
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = MemoryStore::new();
        assert_ok!(store.set_with_expiry("short", 60, &json!("v")).await);

        let ttl = store.ttl_seconds("short").unwrap();
        assert!(ttl > 0 && ttl <= 60);
        assert!(store.ttl_seconds("absent").is_none());

        // Backdate the entry so it is already expired
        store.server.write(0, "old", Bytes::from_static(b"\x00\"v\""), Some(Utc::now() - Duration::seconds(1)));
        assert_eq!(assert_ok!(store.multi_get(&keys(&["old"])).await), vec![MISS_SENTINEL]);
        assert_eq!(assert_ok!(store.exists_count("old").await), 0);
        assert_eq!(assert_ok!(store.multi_delete(&keys(&["old"])).await), 0);
    }

    #[tokio::test]
    async fn test_databases_are_isolated() {
        let server = Arc::new(MemoryServer::new());
        let db0 = MemoryStore::connect(server.clone(), 0);
        let db3 = MemoryStore::connect(server.clone(), 3);

        assert_ok!(db0.multi_set(&values(&[("k", json!(0))])).await);
        assert_ok!(db3.multi_set(&values(&[("k", json!(3))])).await);

        assert!(assert_ok!(db0.flush_current_namespace().await));
        assert_eq!(server.key_count(0), 0);
        assert_eq!(assert_ok!(db3.multi_get(&keys(&["k"])).await), vec![json!(3)]);

        server.flush_all();
        assert_eq!(server.key_count(3), 0);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_a_miss() {
        let store = MemoryStore::new();
        store.server.write(0, "garbage", Bytes::from_static(b"\x09zz"), None);
        assert_eq!(assert_ok!(store.multi_get(&keys(&["garbage"])).await), vec![MISS_SENTINEL]);
    }

    #[tokio::test]
    async fn test_faults_are_one_shot() {
        let store = MemoryStore::new();
        store.inject(StoreOp::MultiSet, Fault::Error);
        store.inject(StoreOp::MultiSet, Fault::Reject);

        assert_err!(store.multi_set(&values(&[("a", json!(1))])).await);
        assert!(!assert_ok!(store.multi_set(&values(&[("a", json!(1))])).await));
        assert!(assert_ok!(store.multi_set(&values(&[("a", json!(1))])).await));
        assert_eq!(store.call_count(StoreOp::MultiSet), 3);
    }

    #[tokio::test]
    async fn test_offline_store_records_calls() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert_err!(store.ping().await);
        assert_err!(store.exists_count("a").await);
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::new(StoreOp::Ping, vec![]),
                StoreCall::new(StoreOp::ExistsCount, keys(&["a"])),
            ]
        );

        store.reset_calls();
        store.set_available(true);
        assert!(assert_ok!(store.ping().await));
        assert_eq!(store.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_compressed_codec() {
        let store = MemoryStore::with_codec(
            Arc::new(MemoryServer::new()),
            0,
            CodecConfig {
                compression: CompressionAlgorithm::Snappy,
                min_compress_bytes: 16,
                ..Default::default()
            },
        );
        let big = json!({"text": "abcabcabcabcabcabcabcabcabcabcabcabcabcabc"});
        assert_ok!(store.multi_set(&values(&[("big", big.clone())])).await);
        assert_eq!(assert_ok!(store.multi_get(&keys(&["big"])).await), vec![big]);
    }
}
