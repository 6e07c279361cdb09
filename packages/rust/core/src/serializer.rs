//! Hierarchy output: document shape, file naming, and writing.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use orgchart_shared::{HierarchyDocument, HierarchyNode, OrgChartError, Result};

/// Prefix of every output file.
const FILE_PREFIX: &str = "org_hierarchy";

/// Give up looking for a free file name after this many suffixes.
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Wrap built roots in the output shape: one root is a bare object,
/// anything else an array.
pub fn serialize(roots: Vec<HierarchyNode>) -> HierarchyDocument {
    HierarchyDocument::from_roots(roots)
}

/// `org_hierarchy[_<local>]_<YYYYmmdd_HHMMSS>.json`.
///
/// `<local>` is the part of the scoped manager's address before `@`, with
/// anything outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn output_filename(start_manager_email: Option<&str>, timestamp: NaiveDateTime) -> String {
    let stamp = timestamp.format("%Y%m%d_%H%M%S");
    match start_manager_email.map(scope_label) {
        Some(label) if !label.is_empty() => format!("{FILE_PREFIX}_{label}_{stamp}.json"),
        _ => format!("{FILE_PREFIX}_{stamp}.json"),
    }
}

fn scope_label(email: &str) -> String {
    email
        .trim()
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `document` as pretty JSON into `output_dir`, never overwriting.
///
/// If the timestamped name already exists, `_1`, `_2`, … are appended
/// before the extension. Returns the path written.
#[instrument(skip_all, fields(output_dir = %output_dir.display()))]
pub fn write_document(
    document: &HierarchyDocument,
    output_dir: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    let path = write_new_json(document, output_dir, file_name)?;
    info!(path = %path.display(), people = document.people_count(), "hierarchy written");
    Ok(path)
}

fn write_new_json<T: Serialize>(value: &T, output_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir).map_err(|e| OrgChartError::io(output_dir, e))?;

    let stem = file_name.strip_suffix(".json").unwrap_or(file_name);

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = if attempt == 0 {
            output_dir.join(format!("{stem}.json"))
        } else {
            output_dir.join(format!("{stem}_{attempt}.json"))
        };

        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "output name taken, trying next suffix");
                continue;
            }
            Err(e) => return Err(OrgChartError::io(&candidate, e)),
        };

        // A partial file would hold the name for the next run.
        if let Err(e) = write_pretty(file, value, &candidate) {
            if let Err(cleanup) = std::fs::remove_file(&candidate) {
                warn!(
                    path = %candidate.display(),
                    error = %cleanup,
                    "could not remove partial output"
                );
            }
            return Err(e);
        }
        return Ok(candidate);
    }

    Err(OrgChartError::io(
        output_dir.join(format!("{stem}.json")),
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name after {MAX_NAME_ATTEMPTS} attempts"),
        ),
    ))
}

fn write_pretty<T: Serialize>(file: File, value: &T, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| OrgChartError::io(path, e))
}
