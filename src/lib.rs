//! Simple Cache Adapter
//!
//! A generic key-value cache contract implemented over a remote key-value
//! store, with a configurable policy for what happens when the store fails.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                          Application code                                    │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │                 SimpleCache / SimpleCacheExt (contract)                      │
//! │  ┌───────────────────────────────────────────────────────────────────────┐  │
//! │  │                          CacheAdapter                                 │  │
//! │  │   key dedup  ·  miss sentinel → default  ·  TTL validation            │  │
//! │  │   FailureMode: Exception (raise)  |  Fail (miss / false)              │  │
//! │  └───────────────────────────────┬───────────────────────────────────────┘  │
//! ├──────────────────────────────────┼──────────────────────────────────────────┤
//! │                 RemoteStoreClient (port) + ValueCodec                        │
//! │  ┌─────────────────────────────┐ │ ┌─────────────────────────────────────┐  │
//! │  │        RedisStore           │◄┴►│          MemoryStore                │  │
//! │  │   (ConnectionManager)       │   │   (DashMap, fault injection)        │  │
//! │  └─────────────────────────────┘   └─────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: The cache contract, the adapter and its failure modes
//! - [`store`]: Remote store clients, value codec and compression
//! - [`config`]: YAML configuration
//! - [`domain`]: Core value types and the remote store port
//! - [`error`]: Error types and handling

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use cache::{
    AdapterStatsSnapshot, CacheAdapter, FailureMode, SimpleCache, SimpleCacheExt,
    SimpleCacheRef, Ttl,
};

pub use config::{AdapterConfig, StoreBackend, StoreConfig};

pub use domain::ports::{CacheValue, RemoteStoreClient, RemoteStoreRef, StoreOp, MISS_SENTINEL};

pub use error::{Error, ErrorKind, Result, StoreError, StoreResult};

pub use store::{
    CodecConfig, CompressionAlgorithm, MemoryServer, MemoryStore, RedisStore, StoreFactory,
    ValueCodec,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
