//! Error types for the Simple Cache Adapter
//!
//! Two layers of errors live here:
//! - [`StoreError`]: what a remote store client reports (transport, codec,
//!   protocol failures). Never shown to callers directly.
//! - [`Error`]: what the adapter surfaces. Operational variants carry the
//!   originating [`StoreError`] as their source.

use crate::domain::ports::StoreOp;
use thiserror::Error;

// =============================================================================
// Store Errors
// =============================================================================

/// Failure reported by a remote store client
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for remote store primitives
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// =============================================================================
// Adapter Errors
// =============================================================================

/// Unified error type for the adapter
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Usage Errors
    // =========================================================================
    #[error("Invalid TTL: {0}")]
    InvalidTtl(String),

    #[error("Value serialization failed: {0}")]
    Serialization(String),

    // =========================================================================
    // Operational Errors
    // =========================================================================
    #[error("Cannot ping remote store. Was the connection opened and authenticated first?")]
    Connectivity {
        #[source]
        source: StoreError,
    },

    #[error("Remote store went away during {operation}")]
    RemoteUnavailable {
        operation: StoreOp,
        #[source]
        source: StoreError,
    },

    // =========================================================================
    // Setup Errors
    // =========================================================================
    #[error("Store connection failed: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller broke the contract; raised in every failure mode
    Usage,
    /// Liveness probe failed while constructing the adapter
    Connectivity,
    /// A remote primitive failed under `FailureMode::Exception`
    RemoteUnavailable,
    /// Store bootstrap, configuration or IO problem
    Setup,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidTtl(_) | Error::Serialization(_) => ErrorKind::Usage,
            Error::Connectivity { .. } => ErrorKind::Connectivity,
            Error::RemoteUnavailable { .. } => ErrorKind::RemoteUnavailable,
            Error::Store(_)
            | Error::Configuration(_)
            | Error::ConfigParse(_)
            | Error::JsonParse(_)
            | Error::Io(_) => ErrorKind::Setup,
        }
    }

    /// Check if this error is a caller contract violation
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    /// Check if this error came from the remote store at runtime
    pub fn is_operational(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connectivity | ErrorKind::RemoteUnavailable
        )
    }

    /// The transport failure behind this error, if any
    pub fn store_cause(&self) -> Option<&StoreError> {
        match self {
            Error::Connectivity { source } | Error::RemoteUnavailable { source, .. } => {
                Some(source)
            }
            Error::Store(source) => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for the adapter
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_kinds() {
        let err = Error::InvalidTtl("interval".into());
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.is_usage());
        assert!(!err.is_operational());

        let err = Error::Connectivity {
            source: StoreError::Unavailable("down".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err.is_operational());

        let err = Error::Configuration("empty url".into());
        assert_eq!(err.kind(), ErrorKind::Setup);
        assert!(!err.is_operational());
    }

    #[test]
    fn test_operational_errors_keep_cause() {
        let err = Error::RemoteUnavailable {
            operation: StoreOp::MultiGet,
            source: StoreError::Unavailable("connection reset".into()),
        };
        assert_eq!(err.to_string(), "Remote store went away during MGET");

        let source = err.source().expect("source attached");
        assert_eq!(source.to_string(), "Store unavailable: connection reset");
        assert!(matches!(
            err.store_cause(),
            Some(StoreError::Unavailable(msg)) if msg == "connection reset"
        ));
    }

    #[test]
    fn test_usage_errors_have_no_cause() {
        let err = Error::Serialization("key must be a string".into());
        assert!(err.store_cause().is_none());
        assert!(err.source().is_none());
    }
}
