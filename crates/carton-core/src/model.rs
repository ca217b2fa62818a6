//! Caller identity, host-library seam, and download descriptors.
//!
//! # Design
//! - Pure data carriers plus the one trait the host implements; keeps the
//!   dispatch orchestration in `dispatcher.rs` free of host concerns.
//! - The core never checks permissions itself; it asks the [`Library`].

use std::path::PathBuf;

/// Identity of the operator a dispatch is performed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Host-assigned numeric id.
    pub id: u64,
    /// Login string, used by the naming engine and the journal.
    pub login: String,
    /// Source address of the request when the host knows it.
    pub source_ip: Option<String>,
}

/// A library file as the host presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    /// Absolute location on disk.
    pub path: PathBuf,
    /// Host-facing URL for direct downloads.
    pub url: String,
    /// Name the file is presented under.
    pub display_name: String,
}

/// Host collaborator that owns file metadata and authorization.
///
/// Identifiers that fail [`Library::lookup`] are treated as not referring
/// to a downloadable resource and are silently dropped during resolution.
pub trait Library: Send + Sync {
    /// Whether the caller may download library files at all.
    fn can_download(&self, caller: &Caller) -> bool;

    /// Whether the caller may access one specific file.
    fn can_access(&self, caller: &Caller, id: u64) -> bool;

    /// Look up a file by identifier.
    fn lookup(&self, id: u64) -> Option<LibraryFile>;
}

/// Successful download descriptor returned to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Download {
    /// Direct reference to an existing file; no artifact was created.
    Single {
        /// URL the host should redirect the caller to.
        url: String,
        /// Filename presented to the caller.
        filename: String,
    },
    /// Freshly built ZIP artifact in the temp area.
    Archive {
        /// URL of the artifact under the temp base URL.
        url: String,
        /// Artifact filename, `<rendered-pattern>.zip`.
        filename: String,
        /// Number of files packed.
        file_count: usize,
    },
}

/// Which retention policy a purge applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeMode {
    /// Admin view opened: delete everything under the temp root.
    Opportunistic,
    /// Recurring sweep: delete archives older than the configured age.
    Scheduled,
    /// Admin button: delete all archives regardless of age.
    Manual,
}

impl PurgeMode {
    /// Machine-friendly discriminator for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opportunistic => "opportunistic",
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        }
    }
}
