//! Typed settings models and change payloads.
//!
//! # Design
//! - Pure data carriers used by the settings store and the dispatcher.
//! - Keeps domain types separate from IO/wiring code in `service.rs`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Process-wide download settings, read as a consistent snapshot per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Cumulative byte budget for one ZIP build, expressed in megabytes.
    pub max_download_size_mb: u64,
    /// Age cutoff for the scheduled temp-area sweep, in hours.
    pub cleanup_interval_hours: u64,
    /// Whether download and cleanup activity is appended to the journal.
    pub logging_enabled: bool,
    /// Archive name pattern; `{timestamp}`, `{date}`, `{user}`, and
    /// `{userid}` are substituted, anything else is kept verbatim.
    pub zip_name_pattern: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_download_size_mb: defaults::MAX_DOWNLOAD_SIZE_MB,
            cleanup_interval_hours: defaults::CLEANUP_INTERVAL_HOURS,
            logging_enabled: false,
            zip_name_pattern: defaults::ZIP_NAME_PATTERN.to_string(),
        }
    }
}

impl Settings {
    /// The ZIP budget converted to bytes.
    #[must_use]
    pub const fn max_download_size_bytes(&self) -> u64 {
        self.max_download_size_mb.saturating_mul(1024 * 1024)
    }

    /// The scheduled-sweep age cutoff as a duration.
    #[must_use]
    pub const fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours.saturating_mul(3600))
    }
}

/// Partial update applied through the administrative settings path.
///
/// Unset fields keep their current value; set fields pass through the
/// coercion rules in [`crate::validate`] before taking effect.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    /// Replacement ZIP budget in megabytes.
    pub max_download_size_mb: Option<u64>,
    /// Replacement sweep age cutoff in hours.
    pub cleanup_interval_hours: Option<u64>,
    /// Replacement journaling flag.
    pub logging_enabled: Option<bool>,
    /// Replacement archive name pattern.
    pub zip_name_pattern: Option<String>,
}
