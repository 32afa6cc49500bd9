//! Container execution of the unit-test binary via the docker CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

/// In-container path the test binary is mounted at.
pub const BINARY_MOUNT: &str = "/unit_tests";
/// In-container path the output directory is mounted at.
pub const OUTPUT_MOUNT: &str = "/test_output";
/// Name of the captured combined stdout/stderr log.
pub const RUN_LOG_NAME: &str = "runlog.log";

const PULL_RETRIES: u32 = 10;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("cannot pull image {image}: all {attempts} attempts failed")]
    PullRetriesExhausted { image: String, attempts: u32 },

    #[error("docker did not run: {0}")]
    Engine(#[from] std::io::Error),
}

/// Resolve the image reference to run, applying a tag from the
/// changed-images manifest when one exists for it.
pub fn resolve_image(base: &str, manifest: Option<&Path>) -> String {
    let Some(path) = manifest else {
        info!("Images file not found");
        return base.to_string();
    };
    match read_image_tags(path) {
        Ok(tags) => match tags.get(base) {
            Some(tag) => format!("{base}:{tag}"),
            None => base.to_string(),
        },
        Err(e) => {
            warn!(manifest = %path.display(), "Cannot read images manifest: {}", e);
            base.to_string()
        }
    }
}

fn read_image_tags(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Pull the test image, retrying with a linearly growing backoff.
pub async fn pull_image(image: &str) -> Result<(), ContainerError> {
    for attempt in 0..PULL_RETRIES {
        info!(%image, "Pulling image");
        match Command::new("docker").args(["pull", image]).output().await {
            Ok(output) if output.status.success() => return Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(%image, attempt, "docker pull failed: {}", stderr.trim());
            }
            Err(e) => {
                warn!(%image, attempt, "docker pull did not run: {}", e);
            }
        }
        tokio::time::sleep(Duration::from_secs(3 * u64::from(attempt))).await;
    }

    Err(ContainerError::PullRetriesExhausted {
        image: image.to_string(),
        attempts: PULL_RETRIES,
    })
}

/// Outcome of one containerized test run.
#[derive(Debug)]
pub struct RunOutput {
    /// Captured combined stdout/stderr of the container.
    pub log_path: PathBuf,
    pub exit_code: i32,
}

/// Run the test image with the binary and output directory bind-mounted,
/// capturing combined stdout/stderr verbatim into the run log.
///
/// SYS_PTRACE lets the harness trace its own children for crash reports.
/// The container process is waited on before this returns, error or not.
pub async fn run_unit_tests(
    image: &str,
    binary_path: &Path,
    output_dir: &Path,
) -> Result<RunOutput, ContainerError> {
    let log_path = output_dir.join(RUN_LOG_NAME);
    let log = std::fs::File::create(&log_path)?;
    let log_err = log.try_clone()?;

    info!(%image, binary = %binary_path.display(), "Running unit tests");

    let status = Command::new("docker")
        .arg("run")
        .arg("--cap-add=SYS_PTRACE")
        .arg(format!("--volume={}:{}", binary_path.display(), BINARY_MOUNT))
        .arg(format!("--volume={}:{}", output_dir.display(), OUTPUT_MOUNT))
        .arg(image)
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .status()
        .await?;

    let exit_code = status.code().unwrap_or(-1);
    if status.success() {
        info!("Run successfully");
    } else {
        info!(exit_code, "Run failed");
    }

    Ok(RunOutput {
        log_path,
        exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_image_without_manifest() {
        assert_eq!(resolve_image("ci/unit-test", None), "ci/unit-test");
    }

    #[test]
    fn test_resolve_image_with_tag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("changed_images.json");
        std::fs::write(&manifest, r#"{"ci/unit-test": "12345"}"#).expect("write");

        assert_eq!(
            resolve_image("ci/unit-test", Some(&manifest)),
            "ci/unit-test:12345"
        );
    }

    #[test]
    fn test_resolve_image_not_in_manifest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("changed_images.json");
        std::fs::write(&manifest, r#"{"ci/stateless-test": "777"}"#).expect("write");

        assert_eq!(
            resolve_image("ci/unit-test", Some(&manifest)),
            "ci/unit-test"
        );
    }

    #[test]
    fn test_resolve_image_unreadable_manifest_falls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = dir.path().join("changed_images.json");
        std::fs::write(&manifest, "not json").expect("write");

        assert_eq!(
            resolve_image("ci/unit-test", Some(&manifest)),
            "ci/unit-test"
        );
    }
}
