//! Directory sources: where raw user records come from.
//!
//! This crate provides:
//! - [`GraphDirectory`]: Microsoft Graph `/users`, paginated, client-credentials auth
//! - [`SnapshotDirectory`]: a JSON export on disk, for offline runs

mod graph;
mod snapshot;
mod wire;

pub use graph::GraphDirectory;
pub use snapshot::SnapshotDirectory;
