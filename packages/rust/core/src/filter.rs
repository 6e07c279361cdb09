//! Record eligibility.
//!
//! A record makes it into the tree only if it is an enabled member account
//! with a mailbox and a job title, and none of its identifiers match a
//! configured exclusion pattern.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};

use orgchart_shared::{OrgChartError, Result, UserRecord, UserType};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Why a record was left out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Disabled,
    Guest,
    UnsupportedUserType(String),
    MissingMail,
    MissingJobTitle,
    /// Matched a configured exclusion pattern.
    Pattern {
        pattern: String,
        reason: String,
        field: &'static str,
    },
}

impl Exclusion {
    /// Short label used for exclusion tallies.
    pub fn label(&self) -> String {
        match self {
            Self::Disabled => "account disabled".into(),
            Self::Guest => "guest account".into(),
            Self::UnsupportedUserType(_) => "unsupported user type".into(),
            Self::MissingMail => "missing mail".into(),
            Self::MissingJobTitle => "missing job title".into(),
            Self::Pattern { reason, .. } => reason.clone(),
        }
    }
}

impl std::fmt::Display for Exclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedUserType(t) => write!(f, "unsupported user type '{t}'"),
            Self::Pattern {
                pattern,
                reason,
                field,
            } => write!(f, "{reason} ({field} matches '{pattern}')"),
            other => f.write_str(&other.label()),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Glob(Pattern),
}

#[derive(Debug, Clone)]
struct ExclusionPattern {
    raw: String,
    reason: String,
    matcher: Matcher,
}

impl ExclusionPattern {
    fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => value.to_lowercase().contains(needle.as_str()),
            Matcher::Glob(pattern) => pattern.matches_with(value, GLOB_OPTIONS),
        }
    }
}

/// Pure eligibility predicate over [`UserRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    patterns: Vec<ExclusionPattern>,
}

impl RecordFilter {
    /// Compile the `{pattern: reason}` table.
    pub fn new(exclusions: &BTreeMap<String, String>) -> Result<Self> {
        let patterns = exclusions
            .iter()
            .map(|(raw, reason)| {
                let matcher = if raw.contains(['*', '?', '[']) {
                    Matcher::Glob(Pattern::new(raw).map_err(|e| {
                        OrgChartError::validation(format!("invalid exclusion pattern '{raw}': {e}"))
                    })?)
                } else {
                    Matcher::Substring(raw.to_lowercase())
                };
                Ok(ExclusionPattern {
                    raw: raw.clone(),
                    reason: reason.clone(),
                    matcher,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// True if the record belongs in the tree.
    pub fn is_eligible(&self, record: &UserRecord) -> bool {
        self.exclusion(record).is_none()
    }

    /// First rule the record fails, or `None` if it is eligible.
    pub fn exclusion(&self, record: &UserRecord) -> Option<Exclusion> {
        if !record.account_enabled {
            return Some(Exclusion::Disabled);
        }
        match &record.user_type {
            UserType::Member => {}
            UserType::Guest => return Some(Exclusion::Guest),
            UserType::Other(t) => return Some(Exclusion::UnsupportedUserType(t.clone())),
        }
        if is_blank(record.mail.as_deref()) {
            return Some(Exclusion::MissingMail);
        }
        if is_blank(record.job_title.as_deref()) {
            return Some(Exclusion::MissingJobTitle);
        }

        let fields = [
            ("id", Some(record.id.as_str())),
            ("mail", record.mail.as_deref()),
            ("userPrincipalName", record.user_principal_name.as_deref()),
        ];
        for pattern in &self.patterns {
            for (field, value) in fields {
                if value.is_some_and(|v| pattern.matches(v)) {
                    return Some(Exclusion::Pattern {
                        pattern: pattern.raw.clone(),
                        reason: pattern.reason.clone(),
                        field,
                    });
                }
            }
        }
        None
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
