//! Core domain types: directory records in, reporting trees out.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UserRecord
// ---------------------------------------------------------------------------

/// Account type as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserType {
    /// Regular member of the tenant.
    #[default]
    Member,
    /// Invited external guest.
    Guest,
    /// Any other value the directory returned.
    Other(String),
}

impl UserType {
    /// Parse the directory's `userType` value. Absent means `Member`.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            None => Self::Member,
            Some(v) if v.eq_ignore_ascii_case("member") => Self::Member,
            Some(v) if v.eq_ignore_ascii_case("guest") => Self::Guest,
            Some(v) => Self::Other(v.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Member => "Member",
            Self::Guest => "Guest",
            Self::Other(v) => v,
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user as fetched from the directory source.
///
/// `manager_id` is a weak reference: it names another record's `id` and may
/// point at a record that is filtered out or was never returned at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Opaque, stable identifier.
    pub id: String,
    /// Display name (may be empty).
    pub display_name: String,
    /// Primary SMTP address.
    pub mail: Option<String>,
    /// Job title.
    pub job_title: Option<String>,
    /// Whether sign-in is enabled for the account.
    pub account_enabled: bool,
    /// Member vs. guest.
    pub user_type: UserType,
    /// Id of this user's direct manager.
    pub manager_id: Option<String>,
    /// Sign-in name.
    pub user_principal_name: Option<String>,
    /// Department.
    pub department: Option<String>,
}

impl UserRecord {
    /// Short human-readable key for log lines: mail if present, else id.
    pub fn log_key(&self) -> &str {
        self.mail.as_deref().unwrap_or(&self.id)
    }
}

/// One page of records from a [`DirectorySource`](crate::DirectorySource).
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    /// Records on this page, in source order.
    pub records: Vec<UserRecord>,
    /// Opaque token for the next page; `None` once the source is exhausted.
    pub next_page_token: Option<String>,
}

// ---------------------------------------------------------------------------
// HierarchyNode
// ---------------------------------------------------------------------------

/// Display fields copied from an eligible [`UserRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    pub id: String,
    pub display_name: String,
    pub mail: String,
    pub job_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// A person in the reporting tree, owning their direct reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    #[serde(flatten)]
    pub record: PersonSummary,
    /// Direct reports, in discovery order.
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
    /// At least one direct report manages people of their own.
    #[serde(rename = "hasManagerReports", default)]
    pub has_manager_reports: bool,
    /// Mirrors `has_manager_reports`; distribution-list tooling keys on this name.
    #[serde(rename = "needsStandardList", default)]
    pub needs_standard_list: bool,
}

impl HierarchyNode {
    /// Node with its manager-report flags derived from `children`.
    pub fn new(record: PersonSummary, children: Vec<HierarchyNode>) -> Self {
        let has_manager_reports = children.iter().any(HierarchyNode::is_manager);
        Self {
            record,
            children,
            has_manager_reports,
            needs_standard_list: has_manager_reports,
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }

    /// Depth of this subtree (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(HierarchyNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Whether this person has any direct reports.
    pub fn is_manager(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&HierarchyNode> {
        if self.record.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

// ---------------------------------------------------------------------------
// HierarchyDocument
// ---------------------------------------------------------------------------

/// The serialized output shape.
///
/// A single root serializes as a bare JSON object; zero or several roots
/// serialize as a JSON array. Consumers can tell the two apart by the
/// top-level JSON type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HierarchyDocument {
    /// Exactly one connected tree.
    Single(HierarchyNode),
    /// Disconnected sub-orgs, or an empty org.
    Forest(Vec<HierarchyNode>),
}

impl HierarchyDocument {
    /// Wrap a list of roots in the right shape.
    pub fn from_roots(mut roots: Vec<HierarchyNode>) -> Self {
        if roots.len() == 1 {
            if let Some(root) = roots.pop() {
                return Self::Single(root);
            }
        }
        Self::Forest(roots)
    }

    /// All roots in the document.
    pub fn roots(&self) -> &[HierarchyNode] {
        match self {
            Self::Single(root) => std::slice::from_ref(root),
            Self::Forest(roots) => roots,
        }
    }

    /// True when the document holds no people.
    pub fn is_empty(&self) -> bool {
        self.roots().is_empty()
    }

    /// Total number of people across all trees.
    pub fn people_count(&self) -> usize {
        self.roots().iter().map(HierarchyNode::size).sum()
    }
}
