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

//! Request dispatch core for Carton library downloads.
//!
//! The host hands [`Dispatcher::dispatch`] a caller identity and raw file
//! identifiers; the core normalizes and resolves them against the host
//! [`Library`], serves one file directly or packs several into a budgeted
//! ZIP, journals the activity, and returns a [`Download`] descriptor or a
//! typed [`DispatchError`].

pub mod dispatcher;
pub mod error;
pub mod model;
pub mod resolver;

pub use carton_config::{ConfigError, ConfigResult, Settings, SettingsPatch, SettingsStore};
pub use carton_fsops::{ArchiveSummary, FileRef, TempArea};
pub use carton_journal::{EntryKind, Journal, LogEntry};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use model::{Caller, Download, Library, LibraryFile, PurgeMode};
