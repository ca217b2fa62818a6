//! # Design
//!
//! - Provide structured, constant-message errors for the filesystem
//!   subsystems.
//! - Capture operation context (paths, fields, inputs) to make failures
//!   reproducible in tests.
//! - Preserve source errors without interpolating context into messages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by archive builds and temp-area maintenance.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Zip archive failures.
    #[error("fsops zip failure")]
    Zip {
        /// Operation that triggered the archive failure.
        operation: &'static str,
        /// Path involved in the archive failure.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        Self::Zip {
            operation,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn fsops_error_helpers_build_variants() {
        let io_err = FsOpsError::io("create", "artifact.zip", io::Error::other("io"));
        assert!(matches!(io_err, FsOpsError::Io { .. }));
        assert!(io_err.source().is_some());

        let zip_err = FsOpsError::zip(
            "finish",
            "artifact.zip",
            zip::result::ZipError::FileNotFound,
        );
        assert!(matches!(zip_err, FsOpsError::Zip { .. }));
        assert!(zip_err.source().is_some());

        let invalid = FsOpsError::InvalidInput {
            field: "budget_bytes",
            reason: "zero",
            value: Some("0".to_string()),
        };
        assert!(invalid.source().is_none());
    }
}
