//! # Design
//!
//! - Provide structured, constant-message errors for the settings store.
//! - Capture the failing operation and path so persistence faults are
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for settings operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced while loading or persisting settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO failures while reading or writing the settings document.
    #[error("settings io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// JSON parsing or serialization failures for the settings document.
    #[error("settings json failure")]
    Json {
        /// Operation that triggered the JSON failure.
        operation: &'static str,
        /// Path involved in the JSON failure.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;
    use std::error::Error;

    #[test]
    fn config_error_helpers_build_variants() {
        let io_err = ConfigError::io("read", "settings.json", io::Error::other("io"));
        assert!(matches!(io_err, ConfigError::Io { .. }));
        assert!(io_err.source().is_some());

        let json_source = match serde_json::from_str::<serde_json::Value>("invalid") {
            Ok(_) => serde_json::Error::custom("expected invalid json"),
            Err(err) => err,
        };
        let json_err = ConfigError::json("parse", "settings.json", json_source);
        assert!(matches!(json_err, ConfigError::Json { .. }));
        assert!(json_err.source().is_some());
    }
}
