//! Verdict classification of a unit-test result log.
//!
//! A single pass over the log, recognizing one signature per line in a
//! fixed priority order. Crash signatures stop the scan immediately; the
//! lines after a crash are never counted.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the result log the test harness writes into the output directory.
pub const RESULT_LOG_NAME: &str = "test_result.txt";

const OK_SIGN: &str = "OK ]";
const FAILED_SIGN: &str = "FAILED  ]";
const SEGFAULT: &str = "Segmentation fault";
const SIGNAL: &str = "received signal SIG";
const PASSED: &str = "PASSED";

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Skipping such a line instead would corrupt the pass/fail counts.
    #[error("no test name in line '{line}'")]
    NoTestName { line: String },

    #[error("cannot read result log: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a single test, as spelled in the per-test summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestOutcome {
    Ok,
    Fail,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Ok => write!(f, "OK"),
            TestOutcome::Fail => write!(f, "FAIL"),
        }
    }
}

/// Coarse status of the whole run, in commit-status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Success,
    Failure,
    /// Reserved for the no-log-at-all case.
    Error,
}

impl RunStatus {
    /// The state string the commit-status API expects.
    pub fn as_state(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
            RunStatus::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_state())
    }
}

/// Classified outcome of one test run.
#[derive(Debug, Serialize)]
pub struct RunVerdict {
    pub status: RunStatus,
    pub description: String,
    /// Per-test outcomes in log order.
    pub summary: Vec<(String, TestOutcome)>,
    /// Logs to upload alongside the raw run log.
    pub extra_log_paths: Vec<PathBuf>,
}

/// Classify the result log into a verdict.
///
/// A missing log is not an error here: it yields the `Error` status verdict
/// without opening anything. A line no test name can be extracted from is
/// an error and aborts the classification.
pub fn classify(log_path: &Path) -> Result<RunVerdict, ClassifyError> {
    if !log_path.exists() {
        info!(log = %log_path.display(), "No output log");
        return Ok(RunVerdict {
            status: RunStatus::Error,
            description: "No output log".to_string(),
            summary: Vec::new(),
            extra_log_paths: Vec::new(),
        });
    }

    let mut summary: Vec<(String, TestOutcome)> = Vec::new();
    let mut total: u32 = 0;
    let mut failed: u32 = 0;
    let mut status = RunStatus::Success;
    let mut description = String::new();
    let mut passed_seen = false;
    let mut scan_stopped = false;

    let raw = std::fs::read_to_string(log_path)?;
    for line in raw.lines() {
        // One signature per line, checked in priority order. A line could
        // in principle contain more than one: the first check wins.
        if line.contains(OK_SIGN) {
            let name = test_name(line.trim())?;
            debug!(test = name, "Found ok line");
            summary.push((name.to_string(), TestOutcome::Ok));
            total += 1;
        } else if line.contains(FAILED_SIGN)
            && !line.contains("listed below")
            && line.contains("ms)")
        {
            // "listed below" is the summary-section header, and FAILED
            // mentions without a duration are not result records.
            let name = test_name(line.trim())?;
            debug!(test = name, "Found fail line");
            summary.push((name.to_string(), TestOutcome::Fail));
            total += 1;
            failed += 1;
        } else if line.contains(SEGFAULT) {
            info!(%line, "Found segfault line");
            status = RunStatus::Failure;
            description.push_str("Segmentation fault. ");
            scan_stopped = true;
            break;
        } else if line.contains(SIGNAL) {
            info!(%line, "Received signal line");
            status = RunStatus::Failure;
            description.push_str("Exit on signal. ");
            scan_stopped = true;
            break;
        } else if line.contains(PASSED) {
            debug!(%line, "PASSED record found");
            passed_seen = true;
        }
    }

    if !scan_stopped {
        if !passed_seen {
            status = RunStatus::Failure;
            description.push_str("PASSED record not found. ");
        }
        if failed > 0 {
            status = RunStatus::Failure;
        }
        if description.is_empty() {
            description = format!("fail: {failed}, passed: {}", total - failed);
        }
    }

    Ok(RunVerdict {
        status,
        description,
        summary,
        extra_log_paths: vec![log_path.to_path_buf()],
    })
}

/// Extract the test name from a result line.
///
/// Tokens are scanned in reverse; the first one containing no parenthesis
/// wins. The harness puts timing and status in parenthesized tokens and
/// never puts the name first on the line.
fn test_name(line: &str) -> Result<&str, ClassifyError> {
    line.split_whitespace()
        .rev()
        .find(|token| !token.contains('(') && !token.contains(')'))
        .ok_or_else(|| ClassifyError::NoTestName {
            line: line.to_string(),
        })
}
