//! Result aggregation and publishing: upload logs, render the report,
//! return the final URL bundle.

pub mod report;
pub mod s3;

use crate::classify::TestOutcome;
use crate::github::RepoLinks;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Object-storage seam. Production uses S3; tests use an in-memory fake.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload a local file under `key`, returning its public URL.
    async fn upload(&self, local: &Path, key: &str) -> Result<String>;
}

/// Everything uploaded for one check run. Immutable once created.
#[derive(Debug)]
pub struct UploadedReport {
    pub report_url: String,
    pub raw_log_url: String,
    pub additional_urls: Vec<String>,
}

/// Run identification fed into the report and the storage key prefix.
#[derive(Debug, Clone)]
pub struct PublishContext<'a> {
    pub check_name: &'a str,
    pub pr_number: u64,
    pub sha: &'a str,
    pub links: &'a RepoLinks,
}

/// Storage key prefix for one run: pr/sha/check-name, with the characters
/// that would break a key flattened to underscores.
pub fn results_prefix(pr_number: u64, sha: &str, check_name: &str) -> String {
    let sanitized = check_name.to_lowercase().replace([' ', '(', ')', ','], "_");
    format!("{pr_number}/{sha}/{sanitized}")
}

async fn upload_logs(
    uploader: &dyn Uploader,
    prefix: &str,
    paths: &[PathBuf],
) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("log path {} has no file name", path.display()))?;
        let url = uploader.upload(path, &format!("{prefix}/{name}")).await?;
        urls.push(url);
    }
    Ok(urls)
}

/// Upload the raw log and auxiliaries (raw log first), render the HTML
/// report over the resulting URLs, upload it too, and return the bundle.
pub async fn upload_results(
    uploader: &dyn Uploader,
    work_dir: &Path,
    ctx: &PublishContext<'_>,
    summary: &[(String, TestOutcome)],
    raw_log: &Path,
    additional: &[PathBuf],
) -> Result<UploadedReport> {
    let prefix = results_prefix(ctx.pr_number, ctx.sha, ctx.check_name);

    let mut files = vec![raw_log.to_path_buf()];
    files.extend(additional.iter().cloned());
    let mut urls = upload_logs(uploader, &prefix, &files).await?;

    // The first URL is always the raw log; the rest are "additional".
    let raw_log_url = urls.remove(0);

    let html = report::render(ctx.check_name, summary, &raw_log_url, ctx.links, &urls)?;
    let report_path = work_dir.join("report.html");
    std::fs::write(&report_path, html)
        .with_context(|| format!("cannot write report to {}", report_path.display()))?;

    let report_url = uploader
        .upload(&report_path, &format!("{prefix}.html"))
        .await?;
    info!(%report_url, "Report uploaded");

    Ok(UploadedReport {
        report_url,
        raw_log_url,
        additional_urls: urls,
    })
}
