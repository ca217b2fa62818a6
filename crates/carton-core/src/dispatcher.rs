//! Request orchestration: validate, resolve, serve or pack, journal.
//!
//! Each dispatch is independent: settings are read once as a snapshot,
//! every archive build writes to its own destination, and journal appends
//! are serialized by the journal itself. The dispatcher holds no per
//! request state.

use std::sync::Arc;
use std::time::Duration;

use carton_config::{ConfigResult, Settings, SettingsPatch, SettingsStore};
use carton_fsops::archive::{self, BuildOutcome};
use carton_fsops::{FileRef, TempArea, naming};
use carton_journal::{EntryKind, Journal, LogEntry};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::model::{Caller, Download, Library, PurgeMode};
use crate::resolver;

/// Orchestrates downloads, settings, journaling, and temp-area retention.
#[derive(Clone)]
pub struct Dispatcher {
    library: Arc<dyn Library>,
    settings: SettingsStore,
    journal: Journal,
    temp: TempArea,
    temp_base_url: String,
}

impl Dispatcher {
    /// Wire the dispatcher against the host library and open the temp
    /// area.
    ///
    /// The temp root is prepared once here; a root that cannot be created
    /// is reported as [`DispatchError::EnvironmentUnavailable`] so the
    /// host can refuse to register the download surface at all.
    ///
    /// # Errors
    ///
    /// Returns an error when the temp root cannot be created.
    pub fn new(
        library: Arc<dyn Library>,
        settings: SettingsStore,
        journal: Journal,
        temp_root: impl Into<std::path::PathBuf>,
        temp_base_url: impl Into<String>,
    ) -> DispatchResult<Self> {
        let temp_root = temp_root.into();
        let temp = TempArea::open(&temp_root).map_err(|source| {
            DispatchError::EnvironmentUnavailable {
                path: temp_root,
                source,
            }
        })?;
        Ok(Self {
            library,
            settings,
            journal,
            temp,
            temp_base_url: temp_base_url.into(),
        })
    }

    /// Serve a download request: one resolved file is returned directly,
    /// several are packed into a budgeted ZIP in the temp area.
    ///
    /// # Errors
    ///
    /// Returns a typed failure for unauthorized callers, empty or
    /// unresolvable id sets, vanished single files, empty archives, and
    /// archive IO faults. Journal failures never fail the request.
    pub fn dispatch(&self, caller: &Caller, raw_ids: &[String]) -> DispatchResult<Download> {
        if !self.library.can_download(caller) {
            warn!(caller_id = caller.id, "caller may not download files");
            return Err(DispatchError::Unauthorized);
        }

        let ids = resolver::normalize(raw_ids);
        if ids.is_empty() {
            return Err(DispatchError::InvalidInput);
        }

        let resolved = resolver::resolve_accessible(self.library.as_ref(), caller, &ids);
        if resolved.is_empty() {
            return Err(DispatchError::NotAccessible);
        }

        let settings = self.settings.snapshot();
        let download = if let [only] = resolved.as_slice() {
            self.serve_single(only)?
        } else {
            self.build_archive(caller, &settings, &resolved)?
        };

        if settings.logging_enabled {
            let kind = match download {
                Download::Single { .. } => EntryKind::Single,
                Download::Archive { .. } => EntryKind::Zip,
            };
            self.journal.append(LogEntry {
                timestamp: Utc::now(),
                user: caller.login.clone(),
                user_id: caller.id,
                file_count: resolved.len(),
                file_ids: resolved.iter().map(|file| file.id).collect(),
                kind,
                source_ip: caller
                    .source_ip
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            });
        }

        Ok(download)
    }

    fn serve_single(&self, file: &FileRef) -> DispatchResult<Download> {
        // The file may vanish between resolution and response; surface the
        // race instead of retrying.
        if !file.path.is_file() {
            return Err(DispatchError::NotFound { id: file.id });
        }
        info!(file_id = file.id, "serving single file directly");
        Ok(Download::Single {
            url: file.url.clone(),
            filename: file.display_name.clone(),
        })
    }

    fn build_archive(
        &self,
        caller: &Caller,
        settings: &Settings,
        resolved: &[FileRef],
    ) -> DispatchResult<Download> {
        let timestamp = Utc::now();
        let base_name = naming::render(
            &settings.zip_name_pattern,
            timestamp,
            &caller.login,
            caller.id,
        );
        let filename = format!("{base_name}.zip");
        let destination = self.temp.artifact_path(&filename);

        let outcome = archive::build(resolved, settings.max_download_size_bytes(), &destination)
            .map_err(|source| DispatchError::Archive { source })?;
        let summary = match outcome {
            BuildOutcome::Built(summary) => summary,
            BuildOutcome::Empty => return Err(DispatchError::EmptyResult),
        };

        Ok(Download::Archive {
            url: format!(
                "{}/{filename}",
                self.temp_base_url.trim_end_matches('/')
            ),
            filename,
            file_count: summary.file_count,
        })
    }

    /// Apply one retention policy to the temp area, returning the number
    /// of entries removed.
    ///
    /// Scheduled and manual purges are journaled as system cleanup runs
    /// when logging is enabled; the opportunistic view-open purge is not.
    pub fn purge(&self, mode: PurgeMode) -> usize {
        let settings = self.settings.snapshot();
        let removed = match mode {
            PurgeMode::Opportunistic => self.temp.purge_all(),
            PurgeMode::Scheduled => self.temp.purge_stale(settings.cleanup_max_age()),
            PurgeMode::Manual => self.temp.purge_archives(),
        };
        info!(mode = mode.as_str(), removed, "temp area purge finished");
        if settings.logging_enabled && !matches!(mode, PurgeMode::Opportunistic) {
            self.journal.append(LogEntry::system_cleanup(Utc::now()));
        }
        removed
    }

    /// Current settings snapshot.
    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings.snapshot()
    }

    /// Apply an administrative settings patch.
    ///
    /// # Errors
    ///
    /// Returns an error when the updated document cannot be persisted.
    pub fn update_settings(&self, patch: &SettingsPatch) -> ConfigResult<Settings> {
        self.settings.update(patch)
    }

    /// Most-recent-first journal entries for the statistics surface.
    #[must_use]
    pub fn journal_recent(&self, limit: usize) -> Vec<LogEntry> {
        self.journal.recent(limit)
    }

    /// Total number of journaled activities.
    #[must_use]
    pub fn journal_len(&self) -> usize {
        self.journal.len()
    }

    /// Archive count and cumulative bytes currently in the temp area.
    #[must_use]
    pub fn temp_usage(&self) -> (usize, u64) {
        self.temp.usage()
    }

    /// Spawn the recurring scheduled sweep on the current tokio runtime.
    ///
    /// Runs a [`PurgeMode::Scheduled`] purge every `period` (hourly is the
    /// intended cadence; the configured `cleanup_interval_hours` only
    /// moves the age cutoff, not the trigger frequency). At-least-once
    /// semantics: a missed tick delays the next sweep rather than
    /// bursting, and a skipped run only postpones cleanup.
    #[must_use]
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                dispatcher.purge(PurgeMode::Scheduled);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    struct EmptyLibrary;

    impl Library for EmptyLibrary {
        fn can_download(&self, _caller: &Caller) -> bool {
            true
        }

        fn can_access(&self, _caller: &Caller, _id: u64) -> bool {
            true
        }

        fn lookup(&self, _id: u64) -> Option<crate::model::LibraryFile> {
            None
        }
    }

    fn dispatcher(temp: &TempDir) -> Result<Dispatcher> {
        Ok(Dispatcher::new(
            Arc::new(EmptyLibrary),
            SettingsStore::in_memory(Settings::default()),
            Journal::with_capacity(16),
            temp.path().join("temp"),
            "https://library.test/temp",
        )?)
    }

    #[test]
    fn single_file_that_vanished_after_resolution_is_not_found() -> Result<()> {
        let temp = TempDir::new()?;
        let dispatcher = dispatcher(&temp)?;

        // Simulates the resolve-to-serve race: the ref was valid at
        // resolution time but its backing file is gone by the time the
        // response is produced.
        let vanished = FileRef {
            id: 7,
            path: temp.path().join("vanished.jpg"),
            size: 16,
            display_name: "vanished.jpg".to_string(),
            url: "https://library.test/files/vanished.jpg".to_string(),
        };
        let result = dispatcher.serve_single(&vanished);
        assert!(matches!(result, Err(DispatchError::NotFound { id: 7 })));

        fs::write(temp.path().join("present.jpg"), b"bytes")?;
        let present = FileRef {
            id: 8,
            path: temp.path().join("present.jpg"),
            size: 5,
            display_name: "present.jpg".to_string(),
            url: "https://library.test/files/present.jpg".to_string(),
        };
        let download = dispatcher.serve_single(&present)?;
        assert_eq!(
            download,
            Download::Single {
                url: "https://library.test/files/present.jpg".to_string(),
                filename: "present.jpg".to_string(),
            }
        );
        Ok(())
    }
}
