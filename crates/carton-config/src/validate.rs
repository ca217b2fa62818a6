//! Coercion rules applied to administrative settings input.
//!
//! Invalid numeric fields fall back to the documented defaults rather than
//! failing the update; a blank pattern falls back to the default pattern.
//! The administrative surface is trusted to send well-typed values, so out
//! of range input heals instead of erroring.

use crate::defaults;
use crate::model::{Settings, SettingsPatch};

/// Apply `patch` over `current`, coercing every field into its valid range.
#[must_use]
pub fn sanitize(patch: &SettingsPatch, current: &Settings) -> Settings {
    let max_download_size_mb = coerce_positive(
        patch
            .max_download_size_mb
            .unwrap_or(current.max_download_size_mb),
        defaults::MAX_DOWNLOAD_SIZE_MB,
    );
    let cleanup_interval_hours = coerce_positive(
        patch
            .cleanup_interval_hours
            .unwrap_or(current.cleanup_interval_hours),
        defaults::CLEANUP_INTERVAL_HOURS,
    );
    let logging_enabled = patch.logging_enabled.unwrap_or(current.logging_enabled);
    let zip_name_pattern = coerce_pattern(
        patch
            .zip_name_pattern
            .as_deref()
            .unwrap_or(&current.zip_name_pattern),
    );

    Settings {
        max_download_size_mb,
        cleanup_interval_hours,
        logging_enabled,
        zip_name_pattern,
    }
}

/// Re-run coercion over a settings document loaded from disk.
///
/// Hand-edited files may carry zeroes or blank patterns; healing on load
/// keeps the snapshot invariant (`>= 1`, non-empty pattern) unconditional.
#[must_use]
pub fn heal(loaded: Settings) -> Settings {
    sanitize(&SettingsPatch::default(), &loaded)
}

const fn coerce_positive(value: u64, fallback: u64) -> u64 {
    if value == 0 { fallback } else { value }
}

fn coerce_pattern(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        defaults::ZIP_NAME_PATTERN.to_string()
    } else {
        trimmed.to_string()
    }
}
