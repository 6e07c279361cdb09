//! Shared types, error model, and configuration for the org hierarchy tools.
//!
//! This crate is the foundation depended on by all other crates.
//! It provides:
//! - [`OrgChartError`]: the unified error type
//! - Domain types ([`UserRecord`], [`HierarchyNode`], [`HierarchyDocument`])
//! - The [`DirectorySource`] contract
//! - Configuration ([`AppConfig`], [`BuildConfig`], config loading)

pub mod config;
pub mod error;
pub mod source;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildConfig, FilterConfig, GraphConfig, GraphCredentials, HierarchyConfig,
    OutputConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_credentials,
};
pub use error::{OrgChartError, Result};
pub use source::DirectorySource;
pub use types::{
    HierarchyDocument, HierarchyNode, PersonSummary, UserPage, UserRecord, UserType,
};
