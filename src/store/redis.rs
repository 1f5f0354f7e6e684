//! Redis Store
//!
//! [`RemoteStoreClient`] over a multiplexed Redis connection. Every primitive
//! maps to exactly one command; the connection manager reconnects on its own
//! and each call works on a cheap clone of it.
//!
//! | Primitive                   | Command   |
//! |-----------------------------|-----------|
//! | `ping`                      | `PING`    |
//! | `multi_get`                 | `MGET`    |
//! | `multi_set`                 | `MSET`    |
//! | `set_with_expiry`           | `SETEX`   |
//! | `multi_delete`              | `DEL`     |
//! | `exists_count`              | `EXISTS`  |
//! | `flush_current_namespace`   | `FLUSHDB` |

use crate::domain::ports::{CacheValue, RemoteStoreClient, MISS_SENTINEL};
use crate::error::{StoreError, StoreResult};
use crate::store::codec::{CodecConfig, ValueCodec};
use async_trait::async_trait;
use indexmap::IndexMap;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{ConnectionInfo, IntoConnectionInfo, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Bounds on establishing the initial connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    /// Timeout for each connection attempt
    pub attempt_timeout: Duration,
    /// Attempts after the first one
    pub retries: usize,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(2),
            retries: 2,
        }
    }
}

impl ConnectPolicy {
    /// Longest backoff between attempts, in milliseconds
    const MAX_BACKOFF_MS: u64 = 500;

    /// Hard deadline for the whole bootstrap, attempts plus backoff
    pub fn deadline(&self) -> Duration {
        let attempts = self.retries as u32 + 1;
        self.attempt_timeout * attempts
            + Duration::from_millis(Self::MAX_BACKOFF_MS) * self.retries as u32
    }

    fn manager_config(&self) -> ConnectionManagerConfig {
        ConnectionManagerConfig::new()
            .set_number_of_retries(self.retries)
            .set_connection_timeout(self.attempt_timeout)
            .set_max_delay(Self::MAX_BACKOFF_MS)
    }
}

/// Build connection info for `url`, selecting `database`
pub fn connection_info(url: &str, database: u32) -> StoreResult<ConnectionInfo> {
    let mut info = url.into_connection_info()?;
    info.redis.db = i64::from(database);
    Ok(info)
}

/// Status replies from commands that answer `+OK`
fn is_ok_reply(reply: &Value) -> bool {
    match reply {
        Value::Okay => true,
        Value::SimpleString(status) => status.eq_ignore_ascii_case("OK"),
        _ => false,
    }
}

/// Redis-backed store client
pub struct RedisStore {
    connection: ConnectionManager,
    database: u32,
    codec: ValueCodec,
}

impl RedisStore {
    /// Open a managed connection to `url` and select `database`
    ///
    /// Gives up once `policy` is exhausted; an unreachable server fails
    /// within [`ConnectPolicy::deadline`].
    pub async fn connect(
        url: &str,
        database: u32,
        codec: CodecConfig,
        policy: ConnectPolicy,
    ) -> StoreResult<Self> {
        let client = redis::Client::open(connection_info(url, database)?)?;
        let deadline = policy.deadline();
        let connection = tokio::time::timeout(
            deadline,
            ConnectionManager::new_with_config(client, policy.manager_config()),
        )
        .await
        .map_err(|_| {
            StoreError::Unavailable(format!("no connection to Redis within {:?}", deadline))
        })??;
        debug!(database, "Connected to Redis");

        Ok(Self {
            connection,
            database,
            codec: ValueCodec::new(codec),
        })
    }

    /// Database index this client is scoped to
    pub fn database(&self) -> u32 {
        self.database
    }

    fn decode_slot(&self, key: &str, slot: Option<Vec<u8>>) -> CacheValue {
        let Some(bytes) = slot else {
            return MISS_SENTINEL;
        };
        match self.codec.decode(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Undecodable cache payload, reporting miss");
                MISS_SENTINEL
            }
        }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("database", &self.database)
            .field("codec", &self.codec)
            .finish()
    }
}

#[async_trait]
impl RemoteStoreClient for RedisStore {
    async fn ping(&self) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(reply.eq_ignore_ascii_case("PONG"))
    }

    async fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<CacheValue>> {
        let mut conn = self.connection.clone();
        let raw: Vec<Option<Vec<u8>>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await?;

        Ok(keys
            .iter()
            .zip(raw)
            .map(|(key, slot)| self.decode_slot(key, slot))
            .collect())
    }

    async fn multi_set(&self, values: &IndexMap<String, CacheValue>) -> StoreResult<bool> {
        let mut cmd = redis::cmd("MSET");
        for (key, value) in values {
            cmd.arg(key).arg(self.codec.encode(value)?.as_ref());
        }

        let mut conn = self.connection.clone();
        let reply: Value = cmd.query_async(&mut conn).await?;
        Ok(is_ok_reply(&reply))
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        ttl_seconds: u64,
        value: &CacheValue,
    ) -> StoreResult<bool> {
        let payload = self.codec.encode(value)?;
        let mut conn = self.connection.clone();
        let reply: Value = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_seconds)
            .arg(payload.as_ref())
            .query_async(&mut conn)
            .await?;
        Ok(is_ok_reply(&reply))
    }

    async fn multi_delete(&self, keys: &[String]) -> StoreResult<u64> {
        let mut conn = self.connection.clone();
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn exists_count(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection.clone();
        let count: u64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(count)
    }

    async fn flush_current_namespace(&self) -> StoreResult<bool> {
        let mut conn = self.connection.clone();
        let reply: Value = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(is_ok_reply(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_connection_info_selects_database() {
        let info = connection_info("redis://127.0.0.1:6379", 4).unwrap();
        assert_eq!(info.redis.db, 4);

        // The explicit database wins over one embedded in the URL
        let info = connection_info("redis://127.0.0.1:6379/2", 7).unwrap();
        assert_eq!(info.redis.db, 7);
    }

    #[test]
    fn test_connection_info_rejects_bad_url() {
        assert_matches!(connection_info("not a url", 0), Err(StoreError::Redis(_)));
    }

    #[test]
    fn test_ok_replies() {
        assert!(is_ok_reply(&Value::Okay));
        assert!(is_ok_reply(&Value::SimpleString("OK".into())));
        assert!(!is_ok_reply(&Value::Nil));
        assert!(!is_ok_reply(&Value::Int(0)));
    }

    #[test]
    fn test_connect_policy_deadline() {
        let policy = ConnectPolicy {
            attempt_timeout: Duration::from_millis(200),
            retries: 2,
        };
        assert_eq!(policy.deadline(), Duration::from_millis(1600));
        assert_eq!(
            ConnectPolicy { retries: 0, ..policy }.deadline(),
            Duration::from_millis(200)
        );
    }

    #[tokio::test]
    async fn test_connect_to_refused_port_gives_up_quickly() {
        let policy = ConnectPolicy {
            attempt_timeout: Duration::from_millis(300),
            retries: 1,
        };
        let started = std::time::Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(10),
            RedisStore::connect("redis://127.0.0.1:1", 0, CodecConfig::default(), policy),
        )
        .await
        .expect("connect must not outlive its policy");

        assert!(result.is_err());
        assert!(started.elapsed() <= policy.deadline() + Duration::from_secs(1));
    }

    /// Needs a server; run with `REDIS_URL=redis://... cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn test_against_live_server() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let store = RedisStore::connect(&url, 15, CodecConfig::default(), ConnectPolicy::default())
            .await
            .unwrap();

        assert!(store.ping().await.unwrap());
        assert!(store.flush_current_namespace().await.unwrap());

        let mut values = IndexMap::new();
        values.insert("a".to_string(), serde_json::json!({"n": 1}));
        assert!(store.multi_set(&values).await.unwrap());
        assert!(store.set_with_expiry("b", 30, &serde_json::json!(2)).await.unwrap());

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(
            store.multi_get(&keys).await.unwrap(),
            vec![serde_json::json!({"n": 1}), serde_json::json!(2), MISS_SENTINEL]
        );
        assert_eq!(store.exists_count("a").await.unwrap(), 1);
        assert_eq!(store.multi_delete(&keys).await.unwrap(), 2);
    }
}
