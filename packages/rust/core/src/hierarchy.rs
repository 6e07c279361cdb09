//! Reporting-tree construction.
//!
//! Links every eligible record to its nearest eligible ancestor, walking
//! manager references through the full (unfiltered) record set so that a
//! disabled or otherwise excluded manager does not sever the chain.
//!
//! The tree is built in an arena: every node gets a slot first, parents are
//! resolved to slot indices, cycles are broken, and only then are child lists
//! and owned [`HierarchyNode`]s assembled.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use orgchart_shared::{
    HierarchyDocument, HierarchyNode, OrgChartError, PersonSummary, Result, UserRecord,
};

use crate::filter::RecordFilter;

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// How a manager-chain walk was found to be cyclic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReason {
    /// The walk came back to a record it had already passed.
    Revisited { manager_id: String },
    /// The walk ran past the hop bound.
    HopBoundExceeded { max_hops: usize },
    /// Eligible records report to each other in a loop; this record's
    /// manager edge was cut to break it.
    EligibleLoop { manager_id: String },
}

impl std::fmt::Display for CycleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Revisited { manager_id } => {
                write!(f, "manager chain revisits {manager_id}")
            }
            Self::HopBoundExceeded { max_hops } => {
                write!(f, "manager chain longer than {max_hops} hops")
            }
            Self::EligibleLoop { manager_id } => {
                write!(f, "reporting loop through {manager_id}")
            }
        }
    }
}

/// Non-fatal conditions found while building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// A record's manager chain is cyclic; it was reattached to a root.
    CycleDetected {
        id: String,
        key: String,
        reason: CycleReason,
    },
    /// A record names a manager the directory never returned.
    DanglingManager { id: String, manager_id: String },
    /// The directory returned the same id twice; the later copy was dropped.
    DuplicateId { id: String },
    /// Nothing survived filtering.
    EmptyResult,
}

impl BuildWarning {
    /// Category name used in logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::CycleDetected { .. } => "CycleDetected",
            Self::DanglingManager { .. } => "DanglingManager",
            Self::DuplicateId { .. } => "DuplicateId",
            Self::EmptyResult => "EmptyResult",
        }
    }
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycleDetected { id, key, reason } => write!(
                f,
                "CycleDetected: record {id} ({key}): {reason}; attached to root"
            ),
            Self::DanglingManager { id, manager_id } => write!(
                f,
                "DanglingManager: record {id} reports to unknown manager {manager_id}; treated as top of chain"
            ),
            Self::DuplicateId { id } => {
                write!(f, "DuplicateId: record {id} returned more than once; later copy dropped")
            }
            Self::EmptyResult => f.write_str("EmptyResult: no eligible records after filtering"),
        }
    }
}

/// Counts and warnings from one build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Records received from the source (after de-duplication).
    pub records_fetched: usize,
    /// Records that passed the filter.
    pub records_eligible: usize,
    /// Excluded record counts keyed by exclusion label.
    pub excluded: BTreeMap<String, usize>,
    /// Number of trees emitted.
    pub roots: usize,
    pub warnings: Vec<BuildWarning>,
}

impl BuildReport {
    fn warn(&mut self, warning: BuildWarning) {
        warn!(category = warning.category(), "{warning}");
        self.warnings.push(warning);
    }

    /// Number of `CycleDetected` warnings.
    pub fn cycles_detected(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, BuildWarning::CycleDetected { .. }))
            .count()
    }
}

/// Output of [`HierarchyBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuiltHierarchy {
    pub document: HierarchyDocument,
    pub report: BuildReport,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Outcome of walking one record's manager chain.
#[derive(Debug, Clone)]
enum Resolution {
    /// Nearest eligible ancestor (arena slot).
    Parent(usize),
    /// Chain ended without an eligible ancestor after `hops` ineligible managers.
    Top { hops: usize },
    Cycle(CycleReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    OnPath,
    Done,
}

/// Builds reporting trees from raw directory records.
#[derive(Debug, Clone)]
pub struct HierarchyBuilder<'a> {
    filter: &'a RecordFilter,
    max_hops: usize,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(filter: &'a RecordFilter, max_hops: usize) -> Self {
        Self { filter, max_hops }
    }

    /// Build the hierarchy from the full, unfiltered record set.
    ///
    /// With `start_manager_email`, the document holds only that manager's
    /// subtree; otherwise it holds every root (see [`HierarchyDocument`]).
    ///
    /// # Errors
    /// [`OrgChartError::ManagerNotFound`] if `start_manager_email` matches no
    /// eligible record.
    #[instrument(skip_all, fields(records = records.len(), scoped = start_manager_email.is_some()))]
    pub fn build(
        &self,
        records: &[UserRecord],
        start_manager_email: Option<&str>,
    ) -> Result<BuiltHierarchy> {
        let mut report = BuildReport::default();

        // Full index, first occurrence wins.
        let mut full: HashMap<&str, &UserRecord> = HashMap::with_capacity(records.len());
        let mut unique: Vec<&UserRecord> = Vec::with_capacity(records.len());
        for record in records {
            if full.contains_key(record.id.as_str()) {
                report.warn(BuildWarning::DuplicateId {
                    id: record.id.clone(),
                });
                continue;
            }
            full.insert(record.id.as_str(), record);
            unique.push(record);
        }
        report.records_fetched = unique.len();

        // Arena of eligible records, in source order.
        let mut eligible: Vec<&UserRecord> = Vec::new();
        for &record in &unique {
            match self.filter.exclusion(record) {
                None => eligible.push(record),
                Some(exclusion) => {
                    debug!(id = %record.id, key = record.log_key(), %exclusion, "record excluded");
                    *report.excluded.entry(exclusion.label()).or_default() += 1;
                }
            }
        }
        report.records_eligible = eligible.len();
        info!(
            fetched = report.records_fetched,
            eligible = report.records_eligible,
            "applied eligibility filter"
        );

        let slots: HashMap<&str, usize> = eligible
            .iter()
            .enumerate()
            .map(|(slot, r)| (r.id.as_str(), slot))
            .collect();

        // Resolve every record's nearest eligible ancestor.
        let resolutions: Vec<Resolution> = eligible
            .iter()
            .map(|record| self.resolve(record, &full, &slots, &mut report))
            .collect();

        let mut parent: Vec<Option<usize>> = resolutions
            .iter()
            .map(|r| match r {
                Resolution::Parent(p) => Some(*p),
                _ => None,
            })
            .collect();

        let mut cycles: Vec<(usize, CycleReason)> = resolutions
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| match r {
                Resolution::Cycle(reason) => Some((slot, reason.clone())),
                _ => None,
            })
            .collect();
        for closer in break_loops(&mut parent) {
            let manager_id = eligible[closer]
                .manager_id
                .clone()
                .unwrap_or_default();
            cycles.push((closer, CycleReason::EligibleLoop { manager_id }));
        }
        cycles.sort_by_key(|(slot, _)| *slot);
        for (slot, reason) in &cycles {
            report.warn(BuildWarning::CycleDetected {
                id: eligible[*slot].id.clone(),
                key: eligible[*slot].log_key().to_string(),
                reason: reason.clone(),
            });
        }

        // Pick roots and reattach everything else that has no parent.
        let candidates: Vec<(usize, usize)> = resolutions
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| match r {
                Resolution::Top { hops } => Some((slot, *hops)),
                _ => None,
            })
            .collect();

        let mut roots: Vec<usize> = match candidates.iter().map(|(_, hops)| *hops).min() {
            Some(min_hops) => candidates
                .iter()
                .filter(|(_, hops)| *hops == min_hops)
                .map(|(slot, _)| *slot)
                .collect(),
            None => cycles.iter().map(|(slot, _)| *slot).collect(),
        };
        roots.sort_by_key(|&slot| root_sort_key(eligible[slot]));

        if let Some(&designated) = roots.first() {
            for slot in 0..eligible.len() {
                if parent[slot].is_none() && !roots.contains(&slot) {
                    debug!(
                        id = %eligible[slot].id,
                        root = %eligible[designated].id,
                        "attaching detached record to designated root"
                    );
                    parent[slot] = Some(designated);
                }
            }
        }

        if roots.len() > 1 {
            warn!(
                roots = roots.len(),
                selected = %eligible[roots[0]].id,
                "multiple disconnected root candidates; emitting one tree per root"
            );
        }

        // Children in discovery (source) order.
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); eligible.len()];
        for (slot, p) in parent.iter().enumerate() {
            if let Some(p) = p {
                children[*p].push(slot);
            }
        }

        let tops: Vec<usize> = match start_manager_email {
            Some(mail) => {
                let wanted = mail.trim();
                let slot = eligible
                    .iter()
                    .position(|r| matches_address(r, wanted))
                    .ok_or_else(|| OrgChartError::manager_not_found(wanted))?;
                info!(id = %eligible[slot].id, mail = wanted, "scoping hierarchy to manager");
                vec![slot]
            }
            None => roots,
        };

        let trees = materialize(&eligible, &children, &tops);
        report.roots = trees.len();
        if trees.is_empty() {
            report.warn(BuildWarning::EmptyResult);
        }

        Ok(BuiltHierarchy {
            document: HierarchyDocument::from_roots(trees),
            report,
        })
    }

    /// Walk `record`'s manager chain through the full index.
    fn resolve(
        &self,
        record: &UserRecord,
        full: &HashMap<&str, &UserRecord>,
        slots: &HashMap<&str, usize>,
        report: &mut BuildReport,
    ) -> Resolution {
        let mut visited: HashSet<&str> = HashSet::from([record.id.as_str()]);
        let mut current = record.manager_id.as_deref();
        let mut hops = 0;

        while let Some(manager_id) = current {
            if !visited.insert(manager_id) {
                return Resolution::Cycle(CycleReason::Revisited {
                    manager_id: manager_id.to_string(),
                });
            }
            if hops >= self.max_hops {
                return Resolution::Cycle(CycleReason::HopBoundExceeded {
                    max_hops: self.max_hops,
                });
            }
            if let Some(&slot) = slots.get(manager_id) {
                return Resolution::Parent(slot);
            }
            match full.get(manager_id) {
                Some(manager) => {
                    current = manager.manager_id.as_deref();
                    hops += 1;
                }
                None => {
                    report.warn(BuildWarning::DanglingManager {
                        id: record.id.clone(),
                        manager_id: manager_id.to_string(),
                    });
                    break;
                }
            }
        }

        Resolution::Top { hops }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Cut one edge out of every loop in the parent table.
///
/// Returns the slots whose parent edge was removed, in discovery order.
fn break_loops(parent: &mut [Option<usize>]) -> Vec<usize> {
    let mut state = vec![Visit::New; parent.len()];
    let mut cut = Vec::new();

    for start in 0..parent.len() {
        if state[start] != Visit::New {
            continue;
        }
        let mut path = Vec::new();
        let mut cur = start;
        loop {
            match state[cur] {
                Visit::Done => break,
                Visit::OnPath => {
                    if let Some(&closer) = path.last() {
                        parent[closer] = None;
                        cut.push(closer);
                    }
                    break;
                }
                Visit::New => {
                    state[cur] = Visit::OnPath;
                    path.push(cur);
                    match parent[cur] {
                        Some(p) => cur = p,
                        None => break,
                    }
                }
            }
        }
        for slot in path {
            state[slot] = Visit::Done;
        }
    }

    cut
}

/// Build owned trees bottom-up without recursion.
fn materialize(
    eligible: &[&UserRecord],
    children: &[Vec<usize>],
    tops: &[usize],
) -> Vec<HierarchyNode> {
    // Pre-order from each top; reversed, every child precedes its parent.
    let mut order = Vec::new();
    let mut stack: Vec<usize> = tops.iter().rev().copied().collect();
    while let Some(slot) = stack.pop() {
        order.push(slot);
        stack.extend(children[slot].iter().rev().copied());
    }

    let mut built: Vec<Option<HierarchyNode>> = vec![None; eligible.len()];
    for &slot in order.iter().rev() {
        let kids = children[slot]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[slot] = Some(HierarchyNode::new(summarize(eligible[slot]), kids));
    }

    tops.iter().filter_map(|&slot| built[slot].take()).collect()
}

fn summarize(record: &UserRecord) -> PersonSummary {
    PersonSummary {
        id: record.id.clone(),
        display_name: record.display_name.clone(),
        mail: record.mail.clone().unwrap_or_default(),
        job_title: record.job_title.clone().unwrap_or_default(),
        user_principal_name: record.user_principal_name.clone(),
        department: record.department.clone(),
    }
}

fn matches_address(record: &UserRecord, wanted: &str) -> bool {
    [record.mail.as_deref(), record.user_principal_name.as_deref()]
        .into_iter()
        .flatten()
        .any(|addr| addr.trim().eq_ignore_ascii_case(wanted))
}

/// Seniority implied by a job title; lower sorts first.
fn title_rank(title: &str) -> u8 {
    let title = title.to_lowercase();
    let words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has_word = |wanted: &[&str]| words.iter().any(|w| wanted.contains(w));
    let vice = title.contains("vice president");

    if title.contains("chief executive") || has_word(&["ceo"]) || (has_word(&["president"]) && !vice) {
        0
    } else if title.contains("chief ") || has_word(&["cto", "cfo", "cio", "coo"]) {
        1
    } else if title.contains("senior vice president") || has_word(&["svp"]) {
        2
    } else if vice || has_word(&["vp"]) {
        3
    } else {
        4
    }
}

fn root_sort_key(record: &UserRecord) -> (u8, String, String) {
    (
        title_rank(record.job_title.as_deref().unwrap_or_default()),
        record.display_name.to_lowercase(),
        record.id.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgchart_shared::{BuildConfig, UserType};

    fn user(id: &str, mail: &str, manager: Option<&str>, enabled: bool, title: &str) -> UserRecord {
        UserRecord {
            id: id.into(),
            display_name: format!("User {id}"),
            mail: Some(mail.into()),
            job_title: Some(title.into()),
            account_enabled: enabled,
            user_type: UserType::Member,
            manager_id: manager.map(String::from),
            user_principal_name: None,
            department: None,
        }
    }

    fn filter() -> RecordFilter {
        RecordFilter::new(&BuildConfig::default().exclusions).unwrap()
    }

    /// CEO(1) <- VP(2); CEO(1) <- disabled svc(3) <- Eng(4)
    fn scenario() -> Vec<UserRecord> {
        vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "vp@x.com", Some("1"), true, "VP"),
            user("3", "svc@x.com", Some("1"), false, ""),
            user("4", "eng@x.com", Some("3"), true, "Eng"),
        ]
    }

    fn child_ids(node: &HierarchyNode) -> Vec<&str> {
        node.children.iter().map(|c| c.record.id.as_str()).collect()
    }

    fn all_ids(doc: &HierarchyDocument) -> Vec<String> {
        let mut ids = Vec::new();
        let mut stack: Vec<&HierarchyNode> = doc.roots().iter().collect();
        while let Some(node) = stack.pop() {
            ids.push(node.record.id.clone());
            stack.extend(node.children.iter());
        }
        ids.sort();
        ids
    }

    #[test]
    fn skips_disabled_intermediate_manager() {
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100)
            .build(&scenario(), None)
            .unwrap();

        let HierarchyDocument::Single(root) = &built.document else {
            panic!("expected a single root, got {:?}", built.document);
        };
        assert_eq!(root.record.id, "1");
        assert_eq!(child_ids(root), ["2", "4"]);
        assert!(root.children.iter().all(|c| c.children.is_empty()));
        assert_eq!(built.report.records_eligible, 3);
        assert_eq!(built.report.excluded.get("account disabled"), Some(&1));
        assert!(built.report.warnings.is_empty());
    }

    #[test]
    fn scoped_to_manager_without_reports() {
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100)
            .build(&scenario(), Some("VP@x.com"))
            .unwrap();

        let HierarchyDocument::Single(root) = &built.document else {
            panic!("expected a single root");
        };
        assert_eq!(root.record.id, "2");
        assert!(root.children.is_empty());
        assert_eq!(all_ids(&built.document), ["2"]);
    }

    #[test]
    fn scoped_subtree_excludes_other_branches() {
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "vp-a@x.com", Some("1"), true, "VP"),
            user("3", "vp-b@x.com", Some("1"), true, "VP"),
            user("4", "a1@x.com", Some("2"), true, "Eng"),
            user("5", "b1@x.com", Some("3"), true, "Eng"),
            user("6", "a2@x.com", Some("4"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100)
            .build(&records, Some("vp-a@x.com"))
            .unwrap();
        assert_eq!(all_ids(&built.document), ["2", "4", "6"]);
    }

    #[test]
    fn flags_managers_of_managers() {
        // 1 -> 2 -> 4 -> 6, 1 -> 3 -> 5
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "vp-a@x.com", Some("1"), true, "VP"),
            user("3", "vp-b@x.com", Some("1"), true, "VP"),
            user("4", "a1@x.com", Some("2"), true, "Lead"),
            user("5", "b1@x.com", Some("3"), true, "Eng"),
            user("6", "a2@x.com", Some("4"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let HierarchyDocument::Single(root) = &built.document else {
            panic!("expected a single root");
        };
        let flag = |id: &str| root.find(id).map(|n| n.has_manager_reports);
        assert_eq!(flag("1"), Some(true));
        assert_eq!(flag("2"), Some(true));
        assert_eq!(flag("3"), Some(false));
        assert_eq!(flag("4"), Some(false));
        assert_eq!(flag("6"), Some(false));
        assert!(root.needs_standard_list);
    }

    #[test]
    fn unknown_start_manager_is_fatal() {
        let filter = filter();
        let err = HierarchyBuilder::new(&filter, 100)
            .build(&scenario(), Some("svc@x.com"))
            .unwrap_err();
        assert!(matches!(err, OrgChartError::ManagerNotFound { ref mail } if mail == "svc@x.com"));
    }

    #[test]
    fn scoped_lookup_matches_user_principal_name() {
        let mut records = scenario();
        records[1].user_principal_name = Some("val.price@corp.x.com".into());
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100)
            .build(&records, Some("Val.Price@corp.x.com"))
            .unwrap();
        assert_eq!(built.document.roots()[0].record.id, "2");
    }

    #[test]
    fn empty_org_is_empty_forest() {
        let records = vec![user("1", "a@x.com", None, false, "CEO")];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        assert!(built.document.is_empty());
        assert_eq!(serde_json::to_string(&built.document).unwrap(), "[]");
        assert_eq!(built.report.warnings, [BuildWarning::EmptyResult]);
    }

    #[test]
    fn disconnected_sub_orgs_each_get_a_root() {
        // Disabled top (0) with two eligible VPs: both one hop from the top.
        let records = vec![
            user("0", "gone@x.com", None, false, "CEO"),
            user("1", "vp-b@x.com", Some("0"), true, "VP Sales"),
            user("2", "vp-a@x.com", Some("0"), true, "Chief Technology Officer"),
            user("3", "rep@x.com", Some("1"), true, "Rep"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let HierarchyDocument::Forest(roots) = &built.document else {
            panic!("expected a forest");
        };
        let root_ids: Vec<&str> = roots.iter().map(|r| r.record.id.as_str()).collect();
        // C-level ranks ahead of VP.
        assert_eq!(root_ids, ["2", "1"]);
        assert_eq!(child_ids(&roots[1]), ["3"]);
        assert_eq!(built.report.roots, 2);
    }

    #[test]
    fn deeper_orphans_attach_to_designated_root() {
        // 5 reports to a disabled chain two hops from the top; CEO has zero hops.
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("8", "old-top@x.com", None, false, "Founder"),
            user("9", "old-mid@x.com", Some("8"), false, "Director"),
            user("5", "orphan@x.com", Some("9"), true, "Analyst"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let HierarchyDocument::Single(root) = &built.document else {
            panic!("expected single root");
        };
        assert_eq!(root.record.id, "1");
        assert_eq!(child_ids(root), ["5"]);
    }

    #[test]
    fn ineligible_cycle_is_detected_and_reattached() {
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("x", "x@x.com", Some("y"), false, "Ghost"),
            user("y", "y@x.com", Some("x"), false, "Ghost"),
            user("2", "stuck@x.com", Some("x"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let root = &built.document.roots()[0];
        assert_eq!(root.record.id, "1");
        assert_eq!(child_ids(root), ["2"]);
        assert_eq!(built.report.cycles_detected(), 1);
        assert!(built.report.warnings[0].to_string().starts_with("CycleDetected: record 2"));
    }

    #[test]
    fn hop_bound_is_enforced() {
        // 1 (CEO) is reachable only through three disabled managers.
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("a", "a@x.com", Some("1"), false, "M"),
            user("b", "b@x.com", Some("a"), false, "M"),
            user("c", "c@x.com", Some("b"), false, "M"),
            user("2", "far@x.com", Some("c"), true, "Eng"),
        ];
        let filter = filter();

        let generous = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();
        assert_eq!(generous.report.cycles_detected(), 0);

        let tight = HierarchyBuilder::new(&filter, 2).build(&records, None).unwrap();
        assert_eq!(tight.report.cycles_detected(), 1);
        assert!(matches!(
            &tight.report.warnings[0],
            BuildWarning::CycleDetected { reason: CycleReason::HopBoundExceeded { max_hops: 2 }, .. }
        ));
        // Either way 2 ends up under the CEO.
        assert_eq!(child_ids(&tight.document.roots()[0]), ["2"]);
    }

    #[test]
    fn eligible_loop_is_broken() {
        let records = vec![
            user("a", "a@x.com", Some("b"), true, "Lead"),
            user("b", "b@x.com", Some("a"), true, "Lead"),
            user("c", "c@x.com", Some("a"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        // No natural top exists, so the record whose edge closed the loop is the root.
        let HierarchyDocument::Single(root) = &built.document else {
            panic!("expected single root");
        };
        assert_eq!(root.record.id, "b");
        assert_eq!(child_ids(root), ["a"]);
        assert_eq!(child_ids(&root.children[0]), ["c"]);
        assert_eq!(built.report.cycles_detected(), 1);
    }

    #[test]
    fn self_managed_record_is_a_cycle() {
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "me@x.com", Some("2"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();
        assert_eq!(child_ids(&built.document.roots()[0]), ["2"]);
        assert_eq!(built.report.cycles_detected(), 1);
    }

    #[test]
    fn dangling_manager_is_treated_as_top() {
        let records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "lost@x.com", Some("nobody"), true, "Eng"),
        ];
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        // Both are zero-hop tops; the CEO sorts first.
        let roots: Vec<&str> = built
            .document
            .roots()
            .iter()
            .map(|r| r.record.id.as_str())
            .collect();
        assert_eq!(roots, ["1", "2"]);
        assert!(matches!(
            built.report.warnings[0],
            BuildWarning::DanglingManager { ref manager_id, .. } if manager_id == "nobody"
        ));
    }

    #[test]
    fn duplicate_ids_keep_first_copy() {
        let mut records = scenario();
        records.push(user("2", "imposter@x.com", Some("1"), true, "VP"));
        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let vp = built.document.roots()[0].find("2").unwrap();
        assert_eq!(vp.record.mail, "vp@x.com");
        assert_eq!(built.document.people_count(), 3);
    }

    #[test]
    fn every_eligible_record_appears_exactly_once() {
        // A messy directory: loops, dangling refs, disabled chains, guests.
        let mut records = vec![
            user("1", "ceo@x.com", None, true, "CEO"),
            user("2", "a@x.com", Some("3"), true, "Lead"),
            user("3", "b@x.com", Some("2"), true, "Lead"),
            user("4", "c@x.com", Some("9"), true, "Eng"),
            user("5", "d@x.com", Some("6"), false, "Mgr"),
            user("6", "e@x.com", Some("5"), false, "Mgr"),
            user("7", "f@x.com", Some("5"), true, "Eng"),
            user("8", "g@x.com", Some("1"), true, "Eng"),
        ];
        let mut guest = user("10", "guest@x.com", Some("1"), true, "Partner");
        guest.user_type = UserType::Guest;
        records.push(guest);

        let filter = filter();
        let built = HierarchyBuilder::new(&filter, 100).build(&records, None).unwrap();

        let mut expected: Vec<String> = ["1", "2", "3", "4", "7", "8"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        expected.sort();
        assert_eq!(all_ids(&built.document), expected);
    }

    #[test]
    fn title_rank_orders_executives() {
        assert_eq!(title_rank("Chief Executive Officer"), 0);
        assert_eq!(title_rank("President"), 0);
        assert_eq!(title_rank("CFO"), 1);
        assert_eq!(title_rank("Senior Vice President, Sales"), 2);
        assert_eq!(title_rank("Vice President"), 3);
        assert_eq!(title_rank("VP Sales"), 3);
        assert_eq!(title_rank("Engineer"), 4);
        assert_eq!(title_rank("Project Coordinator"), 4);
    }
}
