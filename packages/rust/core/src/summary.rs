//! Organization summary over built trees.

use serde::Serialize;

use orgchart_shared::{HierarchyDocument, HierarchyNode};

/// Manager counts across an emitted document.
///
/// Managers with at least one manager among their direct reports are the ones
/// that need a list of their own on top of their team's list; the rest are
/// front-line managers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrgSummary {
    pub total_people: usize,
    pub total_managers: usize,
    pub managers_with_manager_reports: usize,
    pub front_line_managers: usize,
    pub max_depth: usize,
}

impl OrgSummary {
    pub fn from_document(document: &HierarchyDocument) -> Self {
        let mut summary = Self::default();
        let mut stack: Vec<(&HierarchyNode, usize)> =
            document.roots().iter().map(|r| (r, 1)).collect();

        while let Some((node, depth)) = stack.pop() {
            summary.total_people += 1;
            summary.max_depth = summary.max_depth.max(depth);
            if node.is_manager() {
                summary.total_managers += 1;
                if node.children.iter().any(HierarchyNode::is_manager) {
                    summary.managers_with_manager_reports += 1;
                }
            }
            stack.extend(node.children.iter().map(|c| (c, depth + 1)));
        }

        summary.front_line_managers =
            summary.total_managers - summary.managers_with_manager_reports;
        summary
    }
}
