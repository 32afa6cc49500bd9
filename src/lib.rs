//! unitcheck -- CI unit-test result pipeline.
//!
//! This crate downloads the prebuilt unit-test binary for one build-matrix
//! configuration, runs it inside a container, classifies the harness output
//! into a verdict, uploads the artifacts and an HTML report to object
//! storage, and sets the commit status.

pub mod classify;
pub mod config;
pub mod container;
pub mod fetch;
pub mod github;
pub mod publish;
pub mod reports;

use anyhow::Result;
use std::os::unix::fs::PermissionsExt;
use tracing::info;

/// Options for one check run, resolved by the CLI layer.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Commit-status context and report title.
    pub check_name: String,
    /// Build-matrix index of the configuration under test.
    pub build_number: usize,
    /// Test image to run (tag applied from the changed-images manifest).
    pub image: String,
    /// Artifact name of the prebuilt test binary.
    pub binary_name: String,
}

/// Run the whole pipeline: fetch, execute, classify, aggregate, publish.
///
/// Strictly sequential; every stage runs to completion before the next
/// starts, and any fatal stage error aborts before a status is published.
pub async fn run_check(
    opts: &CheckOptions,
) -> Result<(classify::RunVerdict, publish::UploadedReport)> {
    let env = config::CheckEnv::from_env();
    let gh_env = github::GithubEnv::from_env();

    std::fs::create_dir_all(&env.temp_path)?;

    let pr = github::PrInfo::from_event_file(&gh_env.event_path)?;
    info!(pr = pr.number, sha = %pr.sha, "Loaded CI event context");

    // Resolve the build configuration and its join key.
    let configs = config::load_build_configs(&env.repo_path)?;
    let build_config = config::resolve(&configs, opts.build_number)?;
    let config_id = config::canonical_id(build_config);
    info!(%config_id, "Resolved build configuration");

    // Find the artifacts its build job produced.
    let urls = reports::locate_build_urls(&config_id, &env.reports_path)?;
    if urls.is_empty() {
        return Err(reports::ReportError::NoArtifacts { config: config_id }.into());
    }

    let manifest = reports::find_changed_images(&env.reports_path);
    let image = container::resolve_image(&opts.image, manifest.as_deref());
    container::pull_image(&image).await?;

    // Fetch the test binary artifact.
    let binary_url = urls
        .iter()
        .find(|url| url.ends_with(&opts.binary_name))
        .ok_or_else(|| reports::ReportError::BinaryNotListed {
            binary: opts.binary_name.clone(),
        })?;
    let binary_path = env.temp_path.join(&opts.binary_name);
    let client = reqwest::Client::new();
    fetch::download_with_retries(&client, binary_url, &binary_path).await?;

    // The binary must be executable inside the container.
    let mut perms = std::fs::metadata(&binary_path)?.permissions();
    perms.set_mode(0o777);
    std::fs::set_permissions(&binary_path, perms)?;

    let output_dir = env.temp_path.join("test_output");
    std::fs::create_dir_all(&output_dir)?;

    let run = container::run_unit_tests(&image, &binary_path, &output_dir).await?;

    let result_log = output_dir.join(classify::RESULT_LOG_NAME);
    let verdict = classify::classify(&result_log)?;
    info!(status = %verdict.status, description = %verdict.description, "Classified test run");

    // Aggregate and publish.
    let links = github::repo_links(&gh_env.repository, &pr, &gh_env.run_id);
    let uploader = publish::s3::S3Uploader::new(&publish::s3::S3Settings::from_env()).await;
    let ctx = publish::PublishContext {
        check_name: &opts.check_name,
        pr_number: pr.number,
        sha: &pr.sha,
        links: &links,
    };
    let uploaded = publish::upload_results(
        &uploader,
        &env.temp_path,
        &ctx,
        &verdict.summary,
        &run.log_path,
        &verdict.extra_log_paths,
    )
    .await?;

    let status_client = github::StatusClient::new(&gh_env);
    status_client
        .set_status(
            &pr.sha,
            &opts.check_name,
            &verdict.description,
            verdict.status.as_state(),
            &uploaded.report_url,
        )
        .await?;

    Ok((verdict, uploaded))
}
