//! Offline pipeline behind a catalog of terminal-editor color schemes.
//!
//! The library discovers candidate repositories through the GitHub search
//! API, tracks their stars and freshness, detects the schemes they declare,
//! and renders each scheme on light and dark backgrounds by driving a
//! sandboxed headless Neovim. The [`jobs`] module wires these pieces into the
//! `discover`, `refresh` and `render` passes run by the `vcsw` binary.

mod config;
mod error;
mod extractor;
mod file;
mod history;
mod model;
mod store;
mod sync;
mod validity;

pub mod github;
pub mod jobs;
pub mod retry;
pub mod sandbox;

pub use config::{
    DEFAULT_QUERIES, SandboxConfig, WorkerConfig, load_config, parse_config, parse_repository_key,
};
pub use error::{Error, io_error};
pub use extractor::{Declaration, FoundDeclaration, NameExtractor, SourceFile, scheme_key};
pub use file::{SCHEME_FILE_EXTENSIONS, has_extension};
pub use history::{HISTORY_CAPACITY, HistoryEntry, StargazersHistory};
pub use model::{
    Background, ColorData, ColorScheme, ColorTable, Dialect, Owner, Repository, SchemeSource,
};
pub use store::{JsonStore, Report, RepositoryPatch, RepositoryStore};
pub use sync::{Reconciled, reconcile};
pub use validity::{
    InvalidReason, ValidityPolicy, check_generate, check_update, is_generate_valid,
    is_update_valid,
};
