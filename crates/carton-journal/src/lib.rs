#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Bounded activity journal for download and cleanup events.
//!
//! The journal is a capped FIFO ring: appends evict the oldest entry once
//! the cap is reached, and the trim happens inside the same lock
//! acquisition as the push so concurrent writers never observe an
//! over-full ring. Persistence is best-effort; a write failure is logged
//! and never surfaces to the dispatch path.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Default number of retained entries, matching the administrative surface.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Login recorded for entries produced without an acting operator.
const SYSTEM_USER: &str = "system";

/// Kind of activity recorded by a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Direct single-file download.
    Single,
    /// ZIP archive download.
    Zip,
    /// Temp-area cleanup run.
    Cleanup,
}

impl EntryKind {
    /// Machine-friendly discriminator for rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Zip => "zip",
            Self::Cleanup => "cleanup",
        }
    }
}

/// One recorded download or cleanup event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Moment the activity happened.
    pub timestamp: DateTime<Utc>,
    /// Login of the acting operator, or `system` for scheduled work.
    pub user: String,
    /// Numeric id of the acting operator, `0` for the system.
    pub user_id: u64,
    /// Number of files involved.
    pub file_count: usize,
    /// Library identifiers involved, empty for cleanup runs.
    pub file_ids: Vec<u64>,
    /// What kind of activity this entry records.
    pub kind: EntryKind,
    /// Source address of the request, or `system`/`unknown`.
    pub source_ip: String,
}

impl LogEntry {
    /// Entry recorded for a system-initiated cleanup run.
    #[must_use]
    pub fn system_cleanup(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            user: SYSTEM_USER.to_string(),
            user_id: 0,
            file_count: 0,
            file_ids: Vec::new(),
            kind: EntryKind::Cleanup,
            source_ip: SYSTEM_USER.to_string(),
        }
    }
}

/// Shared, capped journal of download and cleanup activity.
#[derive(Clone)]
pub struct Journal {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
    path: Option<PathBuf>,
}

impl Journal {
    /// Construct an unpersisted journal with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Construct an unpersisted journal retaining at most `capacity`
    /// entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "journal capacity must be positive");
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
            path: None,
        }
    }

    /// Open a journal persisted as a JSON array at `path`.
    ///
    /// A missing file starts empty; a corrupt file also starts empty with a
    /// warning, since journal data is advisory and must never block the
    /// download path.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut loaded: VecDeque<LogEntry> = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<LogEntry>>(&raw) {
                Ok(entries) => entries.into(),
                Err(err) => {
                    warn!(
                        error = %err,
                        path = %path.display(),
                        "discarding corrupt journal document"
                    );
                    VecDeque::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => VecDeque::new(),
            Err(err) => {
                warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to read journal document; starting empty"
                );
                VecDeque::new()
            }
        };
        while loaded.len() > DEFAULT_CAPACITY {
            loaded.pop_front();
        }
        Self {
            entries: Arc::new(Mutex::new(loaded)),
            capacity: DEFAULT_CAPACITY,
            path: Some(path),
        }
    }

    /// Append an entry, evicting the oldest once the cap is reached.
    pub fn append(&self, entry: LogEntry) {
        let snapshot = {
            let mut guard = self.lock();
            guard.push_back(entry);
            while guard.len() > self.capacity {
                guard.pop_front();
            }
            self.path
                .is_some()
                .then(|| guard.iter().cloned().collect::<Vec<_>>())
        };
        if let (Some(entries), Some(path)) = (snapshot, self.path.as_deref()) {
            persist(path, &entries);
        }
    }

    /// Chronological snapshot of the retained entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().iter().cloned().collect()
    }

    /// Most-recent-first view, capped at `limit`, for the statistics
    /// surface.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        self.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the journal holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("journal mutex poisoned; continuing with recovered guard");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

fn persist(path: &Path, entries: &[LogEntry]) {
    let serialised = match serde_json::to_string(entries) {
        Ok(serialised) => serialised,
        Err(err) => {
            warn!(error = %err, "failed to serialize journal");
            return;
        }
    };
    if let Err(err) = fs::write(path, serialised) {
        warn!(
            error = %err,
            path = %path.display(),
            "failed to persist journal"
        );
    }
}
