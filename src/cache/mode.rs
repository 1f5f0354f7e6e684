//! Failure Mode
//!
//! Policy deciding whether remote store failures surface as errors or
//! degrade to conservative defaults.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the adapter reacts when the remote store fails
///
/// Every decision site matches on this enum exhaustively, so a new variant
/// has to be handled everywhere before the crate compiles again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Surface every operational failure as an error
    #[default]
    Exception,
    /// Swallow operational failures: reads miss, writes report `false`
    Fail,
}

impl FailureMode {
    /// Check if failures are surfaced to the caller
    pub fn is_loud(&self) -> bool {
        match self {
            FailureMode::Exception => true,
            FailureMode::Fail => false,
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Exception => write!(f, "exception"),
            FailureMode::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for FailureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exception" | "throw" => Ok(FailureMode::Exception),
            "fail" => Ok(FailureMode::Fail),
            other => Err(Error::Configuration(format!(
                "Unknown failure mode: {} (expected exception or fail)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_loud() {
        assert_eq!(FailureMode::default(), FailureMode::Exception);
        assert!(FailureMode::default().is_loud());
        assert!(!FailureMode::Fail.is_loud());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("fail".parse::<FailureMode>().unwrap(), FailureMode::Fail);
        assert_eq!("THROW".parse::<FailureMode>().unwrap(), FailureMode::Exception);
        assert!("retry".parse::<FailureMode>().is_err());

        for mode in [FailureMode::Exception, FailureMode::Fail] {
            assert_eq!(mode.to_string().parse::<FailureMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&FailureMode::Fail).unwrap();
        assert_eq!(json, "\"fail\"");
    }
}
