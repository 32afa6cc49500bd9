//! HTML report rendering over the classified summary and uploaded URLs.

use crate::classify::TestOutcome;
use crate::github::RepoLinks;
use anyhow::Result;
use askama::Template;

struct Row<'a> {
    name: &'a str,
    outcome: &'static str,
    class: &'static str,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    check_name: &'a str,
    rows: Vec<Row<'a>>,
    raw_log_url: &'a str,
    task_url: &'a str,
    branch_name: &'a str,
    branch_url: &'a str,
    commit_url: &'a str,
    additional_urls: &'a [String],
    /// One build configuration per run; matrix reports are reserved.
    single_config: bool,
    generated_at: String,
}

/// Render the report fed with the check name, per-test summary, and the
/// URLs the aggregation stage produced.
pub fn render(
    check_name: &str,
    summary: &[(String, TestOutcome)],
    raw_log_url: &str,
    links: &RepoLinks,
    additional_urls: &[String],
) -> Result<String> {
    let rows = summary
        .iter()
        .map(|(name, outcome)| match outcome {
            TestOutcome::Ok => Row {
                name: name.as_str(),
                outcome: "OK",
                class: "ok",
            },
            TestOutcome::Fail => Row {
                name: name.as_str(),
                outcome: "FAIL",
                class: "fail",
            },
        })
        .collect();

    let template = ReportTemplate {
        check_name,
        rows,
        raw_log_url,
        task_url: &links.task_url,
        branch_name: &links.branch_name,
        branch_url: &links.branch_url,
        commit_url: &links.commit_url,
        additional_urls,
        single_config: true,
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{repo_links, PrInfo};

    fn sample_links() -> RepoLinks {
        let pr = PrInfo {
            number: 5,
            sha: "cafe".to_string(),
        };
        repo_links("acme/widget", &pr, "11")
    }

    #[test]
    fn test_render_lists_tests_and_links() {
        let summary = vec![
            ("Suite.Good".to_string(), TestOutcome::Ok),
            ("Suite.Bad".to_string(), TestOutcome::Fail),
        ];
        let html = render(
            "Unit tests",
            &summary,
            "https://reports.example.com/raw.log",
            &sample_links(),
            &["https://reports.example.com/extra.txt".to_string()],
        )
        .expect("render failed");

        assert!(html.contains("Unit tests"));
        assert!(html.contains("Suite.Good"));
        assert!(html.contains("Suite.Bad"));
        assert!(html.contains("FAIL"));
        assert!(html.contains("https://reports.example.com/raw.log"));
        assert!(html.contains("https://reports.example.com/extra.txt"));
        assert!(html.contains("PR #5"));
    }

    #[test]
    fn test_render_empty_summary() {
        let html = render(
            "Unit tests",
            &[],
            "https://reports.example.com/raw.log",
            &sample_links(),
            &[],
        )
        .expect("render failed");
        assert!(html.contains("No individual test results"));
    }
}
