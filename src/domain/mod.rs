//! Domain layer - ports to the outside world

pub mod ports;

pub use ports::{CacheValue, RemoteStoreClient, RemoteStoreRef, StoreOp, MISS_SENTINEL};
