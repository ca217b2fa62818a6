//! Budgeted flat-ZIP archive builder.
//!
//! Packing is a hard cutoff, not best-fit: files are taken in input order
//! and the first file that would push the running total past the budget
//! ends packing for every remaining file as well. This keeps the packed
//! set a deterministic prefix of the operator's selection.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{FsOpsError, FsOpsResult};

/// A resolved, caller-accessible library file queued for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Library identifier the file was resolved from.
    pub id: u64,
    /// Absolute location on disk.
    pub path: PathBuf,
    /// Size in bytes captured at resolution time.
    pub size: u64,
    /// Name the file is presented under, and the archive entry base name.
    pub display_name: String,
    /// Host-facing URL for direct single-file downloads.
    pub url: String,
}

/// Successful build result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Location of the finished archive.
    pub path: PathBuf,
    /// Number of entries packed.
    pub file_count: usize,
    /// Cumulative size of the packed source files; never exceeds the
    /// budget.
    pub total_bytes: u64,
}

/// Outcome of one build attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// At least one file was packed; the artifact exists at the summary
    /// path.
    Built(ArchiveSummary),
    /// No file fit the budget or survived packing; the destination was
    /// removed.
    Empty,
}

/// Pack `files` into a new ZIP at `destination` under `budget_bytes`.
///
/// The destination must not already exist; a concurrent name collision
/// surfaces as the create failing rather than a silent overwrite. A
/// per-file open failure skips that file and packing continues; zero
/// packed files removes the just-created archive and reports
/// [`BuildOutcome::Empty`].
///
/// # Errors
///
/// Returns an error when the destination cannot be created, when the ZIP
/// stream itself fails, or when `budget_bytes` is zero.
pub fn build(
    files: &[FileRef],
    budget_bytes: u64,
    destination: &Path,
) -> FsOpsResult<BuildOutcome> {
    if budget_bytes == 0 {
        return Err(FsOpsError::InvalidInput {
            field: "budget_bytes",
            reason: "zero",
            value: None,
        });
    }

    let target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)
        .map_err(|source| FsOpsError::io("archive.create", destination, source))?;
    let mut writer = ZipWriter::new(target);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut used_names: HashSet<String> = HashSet::new();
    let mut file_count = 0usize;
    let mut total_bytes = 0u64;

    for file in files {
        if total_bytes.saturating_add(file.size) > budget_bytes {
            break;
        }

        let mut reader = match File::open(&file.path) {
            Ok(reader) => reader,
            Err(err) => {
                warn!(
                    error = %err,
                    file_id = file.id,
                    path = %file.path.display(),
                    "skipping unreadable file during archive build"
                );
                continue;
            }
        };

        let entry_name = unique_entry_name(&used_names, &file.display_name);
        writer
            .start_file(entry_name.clone(), options)
            .map_err(|source| FsOpsError::zip("archive.start_entry", destination, source))?;
        io::copy(&mut reader, &mut writer)
            .map_err(|source| FsOpsError::io("archive.write_entry", destination, source))?;

        used_names.insert(entry_name);
        file_count += 1;
        total_bytes += file.size;
    }

    writer
        .finish()
        .map_err(|source| FsOpsError::zip("archive.finish", destination, source))?;

    if file_count == 0 {
        if let Err(err) = fs::remove_file(destination) {
            warn!(
                error = %err,
                path = %destination.display(),
                "failed to remove empty archive"
            );
        }
        return Ok(BuildOutcome::Empty);
    }

    info!(
        path = %destination.display(),
        file_count,
        total_bytes,
        "archive built"
    );
    Ok(BuildOutcome::Built(ArchiveSummary {
        path: destination.to_path_buf(),
        file_count,
        total_bytes,
    }))
}

/// First occurrence keeps the display name; later occurrences get the
/// smallest unused `_N` suffix before the extension.
fn unique_entry_name(used: &HashSet<String>, display_name: &str) -> String {
    if !used.contains(display_name) {
        return display_name.to_string();
    }

    let (stem, extension) = match display_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (display_name, None),
    };

    for counter in 1u32.. {
        let candidate = extension.map_or_else(
            || format!("{stem}_{counter}"),
            |ext| format!("{stem}_{counter}.{ext}"),
        );
        if !used.contains(&candidate) {
            return candidate;
        }
    }
    unreachable!("suffix space exhausted");
}
