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

//! Filesystem subsystems for the Carton download core.
//!
//! Layout: `archive.rs` (budgeted flat-ZIP builder), `naming.rs` (pattern
//! rendering and filename sanitation), `sweeper.rs` (temp-area retention).

pub mod archive;
pub mod error;
pub mod naming;
pub mod sweeper;

pub use archive::{ArchiveSummary, BuildOutcome, FileRef};
pub use error::{FsOpsError, FsOpsResult};
pub use sweeper::TempArea;
