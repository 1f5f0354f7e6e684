//! Payload Compression
//!
//! Block compressors used by the value codec. Each algorithm has a one-byte
//! tag that prefixes encoded payloads.

use crate::error::{Error, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Compression Algorithm
// =============================================================================

/// Compression algorithm identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    #[default]
    None,
    Lz4,
    Zstd,
    Snappy,
}

impl CompressionAlgorithm {
    /// Header byte written in front of payloads
    pub fn tag(&self) -> u8 {
        match self {
            CompressionAlgorithm::None => 0,
            CompressionAlgorithm::Lz4 => 1,
            CompressionAlgorithm::Zstd => 2,
            CompressionAlgorithm::Snappy => 3,
        }
    }

    /// Parse a header byte
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(CompressionAlgorithm::None),
            1 => Some(CompressionAlgorithm::Lz4),
            2 => Some(CompressionAlgorithm::Zstd),
            3 => Some(CompressionAlgorithm::Snappy),
            _ => None,
        }
    }

    /// Build the compressor for this algorithm
    pub fn compressor(&self, level: i32) -> Box<dyn Compressor> {
        match self {
            CompressionAlgorithm::None => Box::new(NoopCompressor),
            CompressionAlgorithm::Lz4 => Box::new(Lz4Compressor::with_level(level)),
            CompressionAlgorithm::Zstd => Box::new(ZstdCompressor::with_level(level)),
            CompressionAlgorithm::Snappy => Box::new(SnappyCompressor),
        }
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionAlgorithm::None => write!(f, "none"),
            CompressionAlgorithm::Lz4 => write!(f, "lz4"),
            CompressionAlgorithm::Zstd => write!(f, "zstd"),
            CompressionAlgorithm::Snappy => write!(f, "snappy"),
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CompressionAlgorithm::None),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            other => Err(Error::Configuration(format!(
                "Unknown compression algorithm: {}",
                other
            ))),
        }
    }
}

// =============================================================================
// Compressor Trait
// =============================================================================

/// Trait for compression implementations
pub trait Compressor: Send + Sync {
    /// Get the algorithm identifier
    fn algorithm(&self) -> CompressionAlgorithm;

    /// Compress data
    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>>;

    /// Decompress data
    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>>;
}

/// Pass-through compressor
pub struct NoopCompressor;

impl Compressor for NoopCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::None
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// LZ4 block compressor (size-prefixed)
pub struct Lz4Compressor {
    level: i32,
}

impl Lz4Compressor {
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Compressor for Lz4Compressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Lz4
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        lz4::block::compress(
            data,
            Some(lz4::block::CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        )
        .map_err(|e| StoreError::Codec(format!("LZ4 compression failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        lz4::block::decompress(data, None)
            .map_err(|e| StoreError::Codec(format!("LZ4 decompression failed: {}", e)))
    }
}

/// Zstd compressor
pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Compressor for ZstdCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Zstd
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        zstd::encode_all(data, self.level)
            .map_err(|e| StoreError::Codec(format!("Zstd compression failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        zstd::decode_all(data)
            .map_err(|e| StoreError::Codec(format!("Zstd decompression failed: {}", e)))
    }
}

/// Snappy raw compressor
pub struct SnappyCompressor;

impl Compressor for SnappyCompressor {
    fn algorithm(&self) -> CompressionAlgorithm {
        CompressionAlgorithm::Snappy
    }

    fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| StoreError::Codec(format!("Snappy compression failed: {}", e)))
    }

    fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        snap::raw::Decoder::new()
            .decompress_vec(data)
            .map_err(|e| StoreError::Codec(format!("Snappy decompression failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DATA: &[u8] = b"{\"name\":\"cache\",\"values\":[1,2,3,1,2,3,1,2,3,1,2,3]} \
        {\"name\":\"cache\",\"values\":[1,2,3,1,2,3,1,2,3,1,2,3]}";

    #[test]
    fn test_every_algorithm_round_trips() {
        for algorithm in [
            CompressionAlgorithm::None,
            CompressionAlgorithm::Lz4,
            CompressionAlgorithm::Zstd,
            CompressionAlgorithm::Snappy,
        ] {
            let compressor = algorithm.compressor(3);
            assert_eq!(compressor.algorithm(), algorithm);

            let compressed = compressor.compress(TEST_DATA).unwrap();
            let decompressed = compressor.decompress(&compressed).unwrap();
            assert_eq!(decompressed, TEST_DATA, "{} round trip", algorithm);
        }
    }

    #[test]
    fn test_tags() {
        for tag in 0..4 {
            let algorithm = CompressionAlgorithm::from_tag(tag).unwrap();
            assert_eq!(algorithm.tag(), tag);
        }
        assert!(CompressionAlgorithm::from_tag(9).is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!("ZSTD".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Zstd);
        assert!("brotli".parse::<CompressionAlgorithm>().is_err());
    }

    #[test]
    fn test_corrupt_input() {
        let err = Lz4Compressor::with_level(3).decompress(b"\x01").unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }
}
