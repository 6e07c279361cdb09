//! End-to-end run: directory source → filter → hierarchy → JSON file.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{info, instrument};

use orgchart_shared::{
    BuildConfig, DirectorySource, HierarchyDocument, OrgChartError, Result, UserRecord,
};

use crate::filter::RecordFilter;
use crate::hierarchy::{BuildReport, HierarchyBuilder};
use crate::serializer;
use crate::summary::OrgSummary;

/// Configuration for [`build_org_hierarchy`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Filter patterns, hop bound, optional scoping manager.
    pub build: BuildConfig,
    /// Directory receiving the JSON document.
    pub output_dir: PathBuf,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunResult {
    /// Path of the written JSON document.
    pub output_path: PathBuf,
    /// The emitted document.
    pub document: HierarchyDocument,
    /// Counts and non-fatal warnings from the build.
    pub report: BuildReport,
    /// Manager statistics over the emitted trees.
    pub summary: OrgSummary,
    /// Pages fetched from the directory.
    pub pages: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each directory page.
    fn page_fetched(&self, page: usize, total_records: usize);
    /// Called when the run completes.
    fn done(&self, result: &RunResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_fetched(&self, _page: usize, _total_records: usize) {}
    fn done(&self, _result: &RunResult) {}
}

/// Drain a paginated source. Returns all records and the number of pages.
///
/// Any error from the source aborts the fetch and is reported as
/// [`OrgChartError::SourceUnavailable`].
#[instrument(skip_all)]
pub async fn fetch_all_users<S: DirectorySource>(
    source: &S,
    progress: &dyn ProgressReporter,
) -> Result<(Vec<UserRecord>, usize)> {
    let mut records = Vec::new();
    let mut token: Option<String> = None;
    let mut seen_tokens: HashSet<String> = HashSet::new();
    let mut pages = 0;

    loop {
        pages += 1;
        info!(page = pages, "fetching users page");

        let page = source
            .fetch_users_page(token.as_deref())
            .await
            .map_err(|e| match e {
                OrgChartError::SourceUnavailable { .. } => e,
                other => OrgChartError::source_unavailable(format!("page {pages}: {other}")),
            })?;

        records.extend(page.records);
        progress.page_fetched(pages, records.len());
        info!(page = pages, total = records.len(), "users page received");

        match page.next_page_token {
            Some(next) if !seen_tokens.insert(next.clone()) => {
                return Err(OrgChartError::source_unavailable(format!(
                    "pagination looped back to an earlier page after page {pages}"
                )));
            }
            Some(next) => token = Some(next),
            None => break,
        }
    }

    info!(pages, total = records.len(), "fetched all users");
    Ok((records, pages))
}

/// Run the full pipeline.
///
/// 1. Fetch every page from the directory
/// 2. Filter and build the hierarchy
/// 3. Summarize
/// 4. Write `org_hierarchy_*.json`
#[instrument(skip_all, fields(scoped = config.build.start_manager_email.is_some()))]
pub async fn build_org_hierarchy<S: DirectorySource>(
    source: &S,
    config: &RunConfig,
    progress: &dyn ProgressReporter,
) -> Result<RunResult> {
    let start = Instant::now();
    let filter = RecordFilter::new(&config.build.exclusions)?;

    progress.phase("Fetching directory users");
    let (records, pages) = fetch_all_users(source, progress).await?;

    progress.phase("Building hierarchy");
    let scope = config.build.start_manager_email.as_deref();
    let built = HierarchyBuilder::new(&filter, config.build.max_hops).build(&records, scope)?;

    let summary = OrgSummary::from_document(&built.document);
    if !built.document.is_empty() {
        info!(
            people = summary.total_people,
            managers = summary.total_managers,
            managers_with_manager_reports = summary.managers_with_manager_reports,
            front_line_managers = summary.front_line_managers,
            max_depth = summary.max_depth,
            "organization summary"
        );
    }

    progress.phase("Writing output");
    let file_name = serializer::output_filename(scope, Local::now().naive_local());
    let output_path = serializer::write_document(&built.document, &config.output_dir, &file_name)?;

    let result = RunResult {
        output_path,
        document: built.document,
        report: built.report,
        summary,
        pages,
        elapsed: start.elapsed(),
    };
    progress.done(&result);

    Ok(result)
}
