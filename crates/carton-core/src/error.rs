//! # Design
//!
//! - One tagged failure type returned from every dispatch; validation and
//!   resolution failures are terminal, never retried.
//! - Constant messages with structured context; the presentation layer maps
//!   [`DispatchError::kind`] and [`DispatchError::status_hint`] to its own
//!   localized copy and transport codes.

use std::path::PathBuf;

use carton_fsops::FsOpsError;
use thiserror::Error;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Terminal failures surfaced to the host from a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Caller lacks permission to download library files.
    #[error("caller is not permitted to download library files")]
    Unauthorized,
    /// No valid identifiers remained after normalization.
    #[error("request contained no valid file identifiers")]
    InvalidInput,
    /// Identifiers were valid but none resolved to an accessible file.
    #[error("no accessible files matched the request")]
    NotAccessible,
    /// A single-file target vanished between resolution and response.
    #[error("file vanished before it could be served")]
    NotFound {
        /// Identifier whose backing file disappeared.
        id: u64,
    },
    /// Every candidate was cut off by the budget; no archive was produced.
    #[error("archive would contain no files")]
    EmptyResult,
    /// Archive creation or writing failed.
    #[error("archive build failed")]
    Archive {
        /// Underlying filesystem failure.
        source: FsOpsError,
    },
    /// The temp area could not be prepared at startup.
    #[error("temp area unavailable")]
    EnvironmentUnavailable {
        /// Temp root that failed to open.
        path: PathBuf,
        /// Underlying filesystem failure.
        source: FsOpsError,
    },
}

impl DispatchError {
    /// Machine-friendly discriminator for presentation-layer mapping.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidInput => "invalid_input",
            Self::NotAccessible => "not_accessible",
            Self::NotFound { .. } => "not_found",
            Self::EmptyResult => "empty_result",
            Self::Archive { .. } => "io_error",
            Self::EnvironmentUnavailable { .. } => "environment_unavailable",
        }
    }

    /// HTTP-equivalent status the presentation layer would typically use.
    #[must_use]
    pub const fn status_hint(&self) -> u16 {
        match self {
            Self::Unauthorized | Self::NotAccessible => 403,
            Self::InvalidInput => 400,
            Self::NotFound { .. } => 404,
            Self::EmptyResult | Self::Archive { .. } | Self::EnvironmentUnavailable { .. } => 500,
        }
    }
}
