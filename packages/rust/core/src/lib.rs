//! Org hierarchy construction and the end-to-end run.
//!
//! This crate turns flat directory records into reporting trees:
//! [`filter`] decides who is in, [`hierarchy`] links people to their nearest
//! eligible manager, [`serializer`] writes the result, and [`pipeline`] ties
//! it to a [`DirectorySource`](orgchart_shared::DirectorySource).

pub mod filter;
pub mod hierarchy;
pub mod pipeline;
pub mod serializer;
pub mod summary;

pub use filter::{Exclusion, RecordFilter};
pub use hierarchy::{BuildReport, BuildWarning, BuiltHierarchy, CycleReason, HierarchyBuilder};
pub use pipeline::{
    ProgressReporter, RunConfig, RunResult, SilentProgress, build_org_hierarchy, fetch_all_users,
};
pub use summary::OrgSummary;
