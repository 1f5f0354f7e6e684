//! Value Codec
//!
//! Turns [`CacheValue`]s into the bytes a store keeps, and back.
//!
//! Wire format: one header byte naming the compression algorithm, followed
//! by the (possibly compressed) JSON encoding of the value.
//!
//! ```text
//! ┌────────┬──────────────────────────────────────┐
//! │ tag u8 │ JSON payload (compressed if tag > 0) │
//! └────────┴──────────────────────────────────────┘
//! ```

use crate::domain::ports::CacheValue;
use crate::error::{Error, Result, StoreError, StoreResult};
use crate::store::compression::{CompressionAlgorithm, Compressor};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// Codec Configuration
// =============================================================================

/// Configuration for the value codec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Algorithm applied to payloads at or above `min_compress_bytes`
    pub compression: CompressionAlgorithm,
    /// Smaller payloads are stored uncompressed
    pub min_compress_bytes: usize,
    /// Compression level (algorithm-specific)
    pub level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::None,
            min_compress_bytes: 1024,
            level: 3,
        }
    }
}

impl CodecConfig {
    /// Reject settings the compressors cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.compression == CompressionAlgorithm::Zstd && !(1..=22).contains(&self.level) {
            return Err(Error::Configuration(format!(
                "zstd level must be within 1..=22, got {}",
                self.level
            )));
        }
        if self.level < 0 {
            return Err(Error::Configuration(format!(
                "compression level must not be negative, got {}",
                self.level
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Value Codec
// =============================================================================

/// Encodes and decodes cache values
pub struct ValueCodec {
    config: CodecConfig,
    compressor: Box<dyn Compressor>,
}

impl ValueCodec {
    /// Create a codec with the given configuration
    pub fn new(config: CodecConfig) -> Self {
        let compressor = config.compression.compressor(config.level);
        Self { config, compressor }
    }

    /// Get configuration
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a value for storage
    pub fn encode(&self, value: &CacheValue) -> StoreResult<Bytes> {
        let json = serde_json::to_vec(value)
            .map_err(|e| StoreError::Codec(format!("JSON encoding failed: {}", e)))?;

        let (algorithm, payload) = self.maybe_compress(json);
        let mut buf = BytesMut::with_capacity(payload.len() + 1);
        buf.put_u8(algorithm.tag());
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Decode stored bytes
    pub fn decode(&self, data: &[u8]) -> StoreResult<CacheValue> {
        let (tag, payload) = data
            .split_first()
            .ok_or_else(|| StoreError::Codec("empty payload".to_string()))?;
        let algorithm = CompressionAlgorithm::from_tag(*tag)
            .ok_or_else(|| StoreError::Codec(format!("unknown codec tag {}", tag)))?;

        let json = match algorithm {
            CompressionAlgorithm::None => serde_json::from_slice(payload),
            other => serde_json::from_slice(&other.compressor(self.config.level).decompress(payload)?),
        };
        json.map_err(|e| StoreError::Codec(format!("JSON decoding failed: {}", e)))
    }

    /// Compress only when the payload is large enough and actually shrinks
    fn maybe_compress(&self, json: Vec<u8>) -> (CompressionAlgorithm, Vec<u8>) {
        let algorithm = self.compressor.algorithm();
        if algorithm == CompressionAlgorithm::None || json.len() < self.config.min_compress_bytes {
            return (CompressionAlgorithm::None, json);
        }

        match self.compressor.compress(&json) {
            Ok(compressed) if compressed.len() < json.len() => (algorithm, compressed),
            Ok(_) => (CompressionAlgorithm::None, json),
            Err(e) => {
                warn!(algorithm = %algorithm, error = %e, "Compression failed, storing uncompressed");
                (CompressionAlgorithm::None, json)
            }
        }
    }
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl std::fmt::Debug for ValueCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCodec").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn large_value() -> CacheValue {
        let rows = vec!["repeated row of cached data"; 200];
        json!({ "rows": rows })
    }

    #[test]
    fn test_plain_encoding() {
        let codec = ValueCodec::default();
        let encoded = codec.encode(&json!({"a": 1})).unwrap();
        assert_eq!(encoded[0], 0);
        assert_eq!(&encoded[1..], br#"{"a":1}"#);
        assert_eq!(codec.decode(&encoded).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_false_and_null_are_distinct_payloads() {
        let codec = ValueCodec::default();
        let f = codec.encode(&json!(false)).unwrap();
        let n = codec.encode(&CacheValue::Null).unwrap();
        assert_ne!(f, n);
        assert_eq!(codec.decode(&f).unwrap(), json!(false));
        assert_eq!(codec.decode(&n).unwrap(), CacheValue::Null);
    }

    #[test]
    fn test_large_values_are_compressed() {
        for algorithm in [
            CompressionAlgorithm::Lz4,
            CompressionAlgorithm::Zstd,
            CompressionAlgorithm::Snappy,
        ] {
            let codec = ValueCodec::new(CodecConfig {
                compression: algorithm,
                ..Default::default()
            });
            let value = large_value();
            let encoded = codec.encode(&value).unwrap();
            assert_eq!(encoded[0], algorithm.tag());
            assert_eq!(codec.decode(&encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_small_values_skip_compression() {
        let codec = ValueCodec::new(CodecConfig {
            compression: CompressionAlgorithm::Zstd,
            ..Default::default()
        });
        let encoded = codec.encode(&json!("tiny")).unwrap();
        assert_eq!(encoded[0], CompressionAlgorithm::None.tag());
    }

    #[test]
    fn test_decoder_reads_any_tag() {
        // A plain codec still reads payloads written with compression
        let writer = ValueCodec::new(CodecConfig {
            compression: CompressionAlgorithm::Lz4,
            ..Default::default()
        });
        let encoded = writer.encode(&large_value()).unwrap();
        assert_eq!(ValueCodec::default().decode(&encoded).unwrap(), large_value());
    }

    #[test]
    fn test_corrupt_payloads() {
        let codec = ValueCodec::default();
        assert!(codec.decode(b"").is_err());
        assert!(codec.decode(b"\x07{}").is_err());
        assert!(codec.decode(b"\x00not json").is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(CodecConfig::default().validate().is_ok());
        let bad = CodecConfig {
            compression: CompressionAlgorithm::Zstd,
            level: 40,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
