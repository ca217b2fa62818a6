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

//! File-backed download settings for the Carton platform.
//!
//! Layout: `model.rs` (typed settings and the administrative patch),
//! `validate.rs` (coercion rules applied to untrusted input), `service.rs`
//! (`SettingsStore` with snapshot/update semantics).

mod defaults;
pub mod error;
pub mod model;
pub mod service;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{Settings, SettingsPatch};
pub use service::SettingsStore;
