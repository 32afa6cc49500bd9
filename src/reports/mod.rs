//! Build-report discovery under the reports directory.
//!
//! Upstream build jobs drop JSON reports anywhere under the reports tree.
//! The report for one configuration is found by filename substring match
//! against the canonical configuration id.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no build report matched configuration {config}")]
    NoArtifacts { config: String },

    #[error("build report lists no artifact named {binary}")]
    BinaryNotListed { binary: String },

    #[error("cannot parse build report {path}: {source}")]
    Malformed {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A build report dropped by an upstream build job.
#[derive(Debug, Deserialize)]
pub struct BuildReport {
    pub build_urls: Vec<String>,
}

/// Find the artifact URLs for one canonical configuration id.
///
/// Walks the reports tree and parses the first regular file whose name
/// contains the id as a substring; at most one report is expected to match.
/// Returns an empty list when nothing matches -- the caller decides whether
/// that is fatal.
pub fn locate_build_urls(
    canonical_id: &str,
    reports_root: &Path,
) -> Result<Vec<String>, ReportError> {
    for entry in WalkDir::new(reports_root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        if !entry.file_name().to_string_lossy().contains(canonical_id) {
            continue;
        }
        info!(report = %entry.path().display(), "Found build report");
        let raw = std::fs::read_to_string(entry.path())?;
        let report: BuildReport =
            serde_json::from_str(&raw).map_err(|source| ReportError::Malformed {
                path: entry.path().display().to_string(),
                source,
            })?;
        return Ok(report.build_urls);
    }
    Ok(Vec::new())
}

/// Locate the changed-images manifest, if any upstream job produced one.
///
/// Returns `None` when the walk finds nothing; the caller then runs the
/// untagged image.
pub fn find_changed_images(reports_root: &Path) -> Option<PathBuf> {
    WalkDir::new(reports_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == "changed_images.json")
        .map(walkdir::DirEntry::into_path)
}
