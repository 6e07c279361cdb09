//! Offline directory source backed by a JSON export.
//!
//! Accepts either a raw Graph page (`{"value": [...]}`) or a bare array of
//! Graph user objects. The whole file is served as a single page.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, instrument};

use orgchart_shared::{DirectorySource, OrgChartError, Result, UserPage, UserRecord};

use crate::wire::GraphUser;

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotShape {
    Bare(Vec<GraphUser>),
    Page(SnapshotPage),
}

/// Exported Graph page. Unlike a live response, `value` must be present:
/// an object without it is the wrong file, not an empty directory.
#[derive(Deserialize)]
struct SnapshotPage {
    value: Vec<GraphUser>,
}

/// Directory source that reads users from a JSON file.
#[derive(Debug, Clone)]
pub struct SnapshotDirectory {
    path: PathBuf,
}

impl SnapshotDirectory {
    /// Serve records from the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<UserRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| OrgChartError::io(&self.path, e))?;

        let shape: SnapshotShape = serde_json::from_str(&content).map_err(|e| {
            OrgChartError::validation(format!(
                "{} is not a users array or Graph users page: {e}",
                self.path.display()
            ))
        })?;

        let users = match shape {
            SnapshotShape::Bare(users) => users,
            SnapshotShape::Page(page) => page.value,
        };
        Ok(users.into_iter().map(UserRecord::from).collect())
    }
}

impl DirectorySource for SnapshotDirectory {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn fetch_users_page(&self, page_token: Option<&str>) -> Result<UserPage> {
        if let Some(token) = page_token {
            return Err(OrgChartError::validation(format!(
                "snapshot source has a single page; unexpected page token '{token}'"
            )));
        }

        let records = self.load().await?;
        info!(records = records.len(), "loaded users snapshot");

        Ok(UserPage {
            records,
            next_page_token: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_graph_page_fixture() {
        let source = SnapshotDirectory::new("../../../fixtures/graph/users_page.json");
        let page = source.fetch_users_page(None).await.expect("load fixture");

        assert_eq!(page.records.len(), 4);
        assert!(page.next_page_token.is_none());
        assert_eq!(page.records[3].manager_id.as_deref(), Some("3"));
        assert!(!page.records[2].account_enabled);
    }

    #[tokio::test]
    async fn reads_bare_array_fixture() {
        let source = SnapshotDirectory::new("../../../fixtures/graph/users_array.json");
        let page = source.fetch_users_page(None).await.expect("load fixture");

        assert_eq!(page.records.len(), 3);
        assert_eq!(page.records[0].user_principal_name.as_deref(), Some("ada@x.com"));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let source = SnapshotDirectory::new("../../../fixtures/graph/does-not-exist.json");
        let err = source.fetch_users_page(None).await.unwrap_err();
        assert!(matches!(err, OrgChartError::Io { .. }));
    }

    fn write_snapshot(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("users.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn object_without_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(
            &dir,
            r#"{ "users": [ { "id": "1", "mail": "ceo@x.com", "accountEnabled": true } ] }"#,
        );

        let err = SnapshotDirectory::new(path)
            .fetch_users_page(None)
            .await
            .unwrap_err();
        assert!(matches!(err, OrgChartError::Validation { .. }));
    }

    #[tokio::test]
    async fn single_user_object_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir, r#"{ "id": "1", "mail": "ceo@x.com" }"#);

        let err = SnapshotDirectory::new(path)
            .fetch_users_page(None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "Validation");
    }

    #[tokio::test]
    async fn empty_value_page_is_an_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(&dir, r#"{ "@odata.context": "x", "value": [] }"#);

        let page = SnapshotDirectory::new(path).fetch_users_page(None).await.unwrap();
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn rejects_continuation_token() {
        let source = SnapshotDirectory::new("../../../fixtures/graph/users_page.json");
        assert!(source.fetch_users_page(Some("next")).await.is_err());
    }
}
