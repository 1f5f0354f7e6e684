//! Remote Store Clients
//!
//! Implementations of [`RemoteStoreClient`] and the codec they share.
//!
//! - [`RedisStore`]: a Redis server reached over the network
//! - [`MemoryStore`]: an in-process keyspace with fault injection

pub mod codec;
pub mod compression;
pub mod memory;
pub mod redis;

pub use codec::{CodecConfig, ValueCodec};
pub use compression::{CompressionAlgorithm, Compressor};
pub use memory::{Fault, MemoryServer, MemoryStore, StoreCall};
pub use self::redis::{ConnectPolicy, RedisStore};

use crate::config::{StoreBackend, StoreConfig};
use crate::domain::ports::RemoteStoreClient;
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// Store Factory
// =============================================================================

/// Opens store clients from configuration
pub struct StoreFactory;

impl StoreFactory {
    /// Connect to the configured backend
    ///
    /// Connection setup failures are returned as [`Error::Store`] regardless
    /// of failure mode; the mode only governs calls made once connected.
    ///
    /// [`Error::Store`]: crate::error::Error::Store
    pub async fn connect(
        config: &StoreConfig,
        codec: &CodecConfig,
    ) -> Result<Arc<dyn RemoteStoreClient>> {
        info!(
            backend = %config.backend,
            database = config.database,
            compression = %codec.compression,
            "Opening remote store"
        );

        match config.backend {
            StoreBackend::Redis => {
                let store = RedisStore::connect(
                    &config.url,
                    config.database,
                    codec.clone(),
                    config.connect_policy(),
                )
                .await?;
                Ok(Arc::new(store))
            }
            StoreBackend::Memory => Ok(Arc::new(MemoryStore::with_codec(
                Arc::new(MemoryServer::new()),
                config.database,
                codec.clone(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::time::Duration;

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        };
        let store = StoreFactory::connect(&config, &CodecConfig::default())
            .await
            .unwrap();
        assert!(store.ping().await.unwrap());
    }

    #[tokio::test]
    async fn test_connect_bad_redis_url_is_setup_error() {
        let config = StoreConfig {
            backend: StoreBackend::Redis,
            url: "definitely not a url".to_string(),
            ..Default::default()
        };
        let err = StoreFactory::connect(&config, &CodecConfig::default())
            .await
            .err()
            .expect("bad url must fail");
        assert_matches!(err, Error::Store(_));
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_within_deadline() {
        let config = StoreConfig {
            backend: StoreBackend::Redis,
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout_ms: 300,
            connect_retries: 1,
            ..Default::default()
        };
        let deadline = config.connect_policy().deadline();

        let result = tokio::time::timeout(
            deadline + Duration::from_secs(5),
            StoreFactory::connect(&config, &CodecConfig::default()),
        )
        .await
        .expect("bootstrap must respect its deadline");
        assert_matches!(result.err(), Some(Error::Store(_)));
    }
}
