//! GitHub context for one check run: event payload, report links, and the
//! commit-status API.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("cannot read event payload {path}: {source}")]
    EventUnreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("commit status request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("commit status rejected: {status} {body}")]
    Rejected { status: u16, body: String },
}

/// Environment-supplied GitHub context.
#[derive(Debug, Clone)]
pub struct GithubEnv {
    pub event_path: PathBuf,
    pub repository: String,
    pub run_id: String,
    pub token: String,
    pub api_base: String,
}

impl GithubEnv {
    /// Read the context from the conventional CI environment variables.
    pub fn from_env() -> Self {
        GithubEnv {
            event_path: std::env::var("GITHUB_EVENT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("event.json")),
            repository: std::env::var("GITHUB_REPOSITORY").unwrap_or_default(),
            run_id: std::env::var("GITHUB_RUN_ID").unwrap_or_default(),
            token: std::env::var("GITHUB_TOKEN").unwrap_or_default(),
            api_base: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
        }
    }
}

/// Pull-request context extracted from the CI event payload.
///
/// A zero number means a direct push to master.
#[derive(Debug, Clone)]
pub struct PrInfo {
    pub number: u64,
    pub sha: String,
}

impl PrInfo {
    /// Parse the event payload file the CI runner points us at.
    pub fn from_event_file(path: &Path) -> Result<Self, GithubError> {
        let raw = std::fs::read_to_string(path).map_err(|source| GithubError::EventUnreadable {
            path: path.display().to_string(),
            source,
        })?;
        let event: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(Self::from_event(&event))
    }

    /// Extract the PR number and head sha from the event document.
    /// Push events carry the sha in `after` and have no number.
    pub fn from_event(event: &serde_json::Value) -> Self {
        let number = event
            .get("number")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0);
        let sha = event
            .pointer("/pull_request/head/sha")
            .or_else(|| event.get("after"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        PrInfo { number, sha }
    }
}

/// Links shown in the report header.
#[derive(Debug, Clone)]
pub struct RepoLinks {
    pub branch_name: String,
    pub branch_url: String,
    pub commit_url: String,
    pub task_url: String,
}

/// Derive report links from the run context.
pub fn repo_links(repository: &str, pr: &PrInfo, run_id: &str) -> RepoLinks {
    let (branch_name, branch_url) = if pr.number == 0 {
        (
            "master".to_string(),
            format!("https://github.com/{repository}/commits/master"),
        )
    } else {
        (
            format!("PR #{}", pr.number),
            format!("https://github.com/{repository}/pull/{}", pr.number),
        )
    };
    RepoLinks {
        branch_name,
        branch_url,
        commit_url: format!("https://github.com/{repository}/commit/{}", pr.sha),
        task_url: format!("https://github.com/{repository}/actions/runs/{run_id}"),
    }
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    context: &'a str,
    description: &'a str,
    state: &'a str,
    target_url: &'a str,
}

/// Minimal commit-status client for the REST API.
pub struct StatusClient {
    client: reqwest::Client,
    api_base: String,
    repository: String,
    token: String,
}

impl StatusClient {
    pub fn new(env: &GithubEnv) -> Self {
        StatusClient {
            client: reqwest::Client::builder()
                .user_agent("unitcheck/0.1")
                .build()
                .expect("Failed to build HTTP client"),
            api_base: env.api_base.clone(),
            repository: env.repository.clone(),
            token: env.token.clone(),
        }
    }

    /// Publish the final state for a commit under the given check context.
    pub async fn set_status(
        &self,
        sha: &str,
        context: &str,
        description: &str,
        state: &str,
        target_url: &str,
    ) -> Result<(), GithubError> {
        let url = format!(
            "{}/repos/{}/statuses/{}",
            self.api_base, self.repository, sha
        );
        info!(%context, %state, "Setting commit status");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&StatusBody {
                context,
                description,
                state,
                target_url,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GithubError::Rejected { status, body });
        }
        Ok(())
    }
}
