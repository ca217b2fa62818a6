//! Default values applied when settings are absent or fail coercion.
//!
//! # Design
//! - Centralize the fallback values so the store, the validator, and tests
//!   agree on what an unset field means.

/// Cumulative ZIP budget in megabytes when unset or zero.
pub(crate) const MAX_DOWNLOAD_SIZE_MB: u64 = 100;
/// Age cutoff for the scheduled sweep in hours when unset or zero.
pub(crate) const CLEANUP_INTERVAL_HOURS: u64 = 24;
/// Archive name pattern when unset or blank.
pub(crate) const ZIP_NAME_PATTERN: &str = "library-download-{timestamp}";
