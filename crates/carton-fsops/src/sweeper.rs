//! Retention sweeping over the temp area.
//!
//! Three policies share one deletion core: an opportunistic full purge of
//! everything under the root, a scheduled age-based purge of stale archive
//! artifacts, and a manual purge of all archive artifacts. Every candidate
//! path must canonicalize to a location inside the canonicalized root
//! before deletion; anything else is skipped. Individual deletion failures
//! are logged and skipped, never fatal to the sweep.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{FsOpsError, FsOpsResult};

/// File extension of archive artifacts managed by the sweeper.
const ARCHIVE_EXTENSION: &str = "zip";

/// Handle to the flat temp directory holding archive artifacts.
#[derive(Debug, Clone)]
pub struct TempArea {
    root: PathBuf,
}

impl TempArea {
    /// Open the temp area at `root`, creating the directory when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> FsOpsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|source| FsOpsError::io("temp_area.create_root", &root, source))?;
        Ok(Self { root })
    }

    /// Root directory of the temp area.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path for an artifact with the given filename.
    #[must_use]
    pub fn artifact_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    /// Remove every file and directory under the root regardless of age.
    ///
    /// Returns the number of top-level entries removed. A missing root is a
    /// no-op.
    pub fn purge_all(&self) -> usize {
        let Some((entries, canonical_root)) = self.read_entries() else {
            return 0;
        };

        let mut removed = 0usize;
        for path in entries {
            if !self.contains(&canonical_root, &path) {
                continue;
            }
            let deleted = if path.is_dir() {
                remove_dir_tree(&canonical_root, &path)
            } else {
                remove_file_logged(&path)
            };
            if deleted {
                removed += 1;
            }
        }
        debug!(root = %self.root.display(), removed, "temp area purged");
        removed
    }

    /// Remove archive artifacts whose modification time is older than
    /// `max_age`. Fresh archives and non-archive files are untouched.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self.purge_archives_where(|path| match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified < cutoff,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %path.display(),
                    "failed to read artifact mtime; leaving in place"
                );
                false
            }
        })
    }

    /// Remove all archive artifacts under the root, regardless of age.
    pub fn purge_archives(&self) -> usize {
        self.purge_archives_where(|_| true)
    }

    /// Number of archive artifacts and their cumulative size in bytes.
    #[must_use]
    pub fn usage(&self) -> (usize, u64) {
        let Some((entries, _)) = self.read_entries() else {
            return (0, 0);
        };
        let mut count = 0usize;
        let mut bytes = 0u64;
        for path in entries {
            if path.is_file() && is_archive(&path) {
                count += 1;
                bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            }
        }
        (count, bytes)
    }

    fn purge_archives_where(&self, mut stale: impl FnMut(&Path) -> bool) -> usize {
        let Some((entries, canonical_root)) = self.read_entries() else {
            return 0;
        };

        let mut removed = 0usize;
        for path in entries {
            if !path.is_file() || !is_archive(&path) {
                continue;
            }
            if !self.contains(&canonical_root, &path) {
                continue;
            }
            if stale(&path) && remove_file_logged(&path) {
                removed += 1;
            }
        }
        removed
    }

    /// Top-level entries plus the canonicalized root, or `None` when the
    /// root is missing or unreadable (treated as an empty sweep).
    fn read_entries(&self) -> Option<(Vec<PathBuf>, PathBuf)> {
        if !self.root.is_dir() {
            return None;
        }
        let canonical_root = match self.root.canonicalize() {
            Ok(root) => root,
            Err(err) => {
                warn!(
                    error = %err,
                    root = %self.root.display(),
                    "failed to canonicalize temp root; skipping sweep"
                );
                return None;
            }
        };
        let reader = match fs::read_dir(&self.root) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(
                    error = %err,
                    root = %self.root.display(),
                    "failed to read temp root; skipping sweep"
                );
                return None;
            }
        };
        let mut entries = Vec::new();
        for entry in reader {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(err) => {
                    warn!(
                        error = %err,
                        root = %self.root.display(),
                        "failed to read temp entry"
                    );
                }
            }
        }
        Some((entries, canonical_root))
    }

    /// Path-traversal defense: the candidate must resolve inside the root.
    fn contains(&self, canonical_root: &Path, candidate: &Path) -> bool {
        match candidate.canonicalize() {
            Ok(resolved) if resolved.starts_with(canonical_root) => true,
            Ok(resolved) => {
                warn!(
                    path = %resolved.display(),
                    root = %canonical_root.display(),
                    "refusing to delete path outside temp root"
                );
                false
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %candidate.display(),
                    "failed to resolve temp entry; skipping"
                );
                false
            }
        }
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn remove_file_logged(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                error = %err,
                path = %path.display(),
                "failed to remove temp file"
            );
            false
        }
    }
}

/// Explicit walk-and-delete: files first, then directories deepest-first,
/// re-checking containment per entry rather than trusting a recursive
/// delete.
fn remove_dir_tree(canonical_root: &Path, dir: &Path) -> bool {
    let mut files = Vec::new();
    let mut directories = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %dir.display(),
                    "failed to traverse temp directory"
                );
                continue;
            }
        };
        let resolved = match entry.path().canonicalize() {
            Ok(resolved) => resolved,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %entry.path().display(),
                    "failed to resolve temp directory entry; skipping"
                );
                continue;
            }
        };
        if !resolved.starts_with(canonical_root) {
            warn!(
                path = %resolved.display(),
                root = %canonical_root.display(),
                "refusing to delete path outside temp root"
            );
            continue;
        }
        if entry.file_type().is_dir() {
            directories.push(entry);
        } else {
            files.push(entry);
        }
    }

    for entry in files {
        let _ = remove_file_logged(entry.path());
    }

    directories.sort_by_key(walkdir::DirEntry::depth);
    directories.reverse();
    let mut root_removed = false;
    for entry in directories {
        match fs::remove_dir(entry.path()) {
            Ok(()) => {
                if entry.path() == dir {
                    root_removed = true;
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    path = %entry.path().display(),
                    "failed to remove temp directory"
                );
            }
        }
    }
    root_removed
}
