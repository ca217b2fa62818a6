//! Settings store with per-request snapshot semantics.
//!
//! # Design
//! - One `RwLock`-guarded document; `snapshot` hands out a clone so a
//!   dispatch never observes a half-applied update.
//! - Updates persist before they swap in, using write-temp-then-rename so a
//!   crash mid-update leaves the previous document intact.
//! - A missing settings file means defaults; it is never an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{error, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Settings, SettingsPatch};
use crate::validate;

/// Shared handle to the process-wide settings document.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// Open the store backed by the JSON document at `path`.
    ///
    /// A missing file starts from defaults; a corrupt file is reported as an
    /// error so an operator edit is not silently discarded.
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read or
    /// parsed.
    pub fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let settings = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|source| ConfigError::io("settings.read", &path, source))?;
            let loaded: Settings = serde_json::from_str(&raw)
                .map_err(|source| ConfigError::json("settings.parse", &path, source))?;
            validate::heal(loaded)
        } else {
            Settings::default()
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Some(path),
        })
    }

    /// Construct an unpersisted store, primarily for tests and embedders
    /// that manage persistence themselves.
    #[must_use]
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(validate::heal(settings))),
            path: None,
        }
    }

    /// Clone out the current settings.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.read_guard().clone()
    }

    /// Sanitize and apply an administrative patch, persisting the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the updated document cannot be persisted; the
    /// in-memory settings are left unchanged in that case.
    pub fn update(&self, patch: &SettingsPatch) -> ConfigResult<Settings> {
        let updated = validate::sanitize(patch, &self.snapshot());
        if let Some(path) = self.path.as_deref() {
            persist(path, &updated)?;
        }
        let mut guard = self.write_guard();
        *guard = updated.clone();
        drop(guard);
        info!(
            max_download_size_mb = updated.max_download_size_mb,
            cleanup_interval_hours = updated.cleanup_interval_hours,
            logging_enabled = updated.logging_enabled,
            "settings updated"
        );
        Ok(updated)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Settings> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("settings lock poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("settings lock poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

fn persist(path: &Path, settings: &Settings) -> ConfigResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|source| ConfigError::io("settings.create_parent", parent, source))?;
    }
    let serialised = serde_json::to_string_pretty(settings)
        .map_err(|source| ConfigError::json("settings.serialize", path, source))?;
    let staged = path.with_extension("json.tmp");
    fs::write(&staged, serialised)
        .map_err(|source| ConfigError::io("settings.write", &staged, source))?;
    fs::rename(&staged, path).map_err(|source| {
        if let Err(cleanup_err) = fs::remove_file(&staged) {
            warn!(
                error = %cleanup_err,
                path = %staged.display(),
                "failed to remove staged settings document"
            );
        }
        ConfigError::io("settings.rename", path, source)
    })
}
