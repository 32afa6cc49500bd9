//! Build-matrix configuration: loading, index resolution, canonical ids.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the build matrix inside the repository copy.
const BUILD_MATRIX_PATH: &str = "tests/ci/ci_config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("build index {index} out of range ({total} configurations)")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("cannot read build matrix at {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed build matrix: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One entry of the build matrix. Loaded once, never mutated; its identity
/// is the canonical string form produced by [`canonical_id`].
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    pub compiler: String,
    #[serde(rename = "build-type", default)]
    pub build_type: String,
    #[serde(default)]
    pub sanitizer: String,
    pub bundled: String,
    pub splitted: String,
    pub tidy: String,
    pub with_coverage: bool,
    #[serde(rename = "package-type")]
    pub package_type: String,
}

#[derive(Debug, Deserialize)]
struct BuildMatrix {
    build_config: Vec<BuildConfig>,
}

/// Load the build-matrix document from the repository copy.
pub fn load_build_configs(repo_path: &Path) -> Result<Vec<BuildConfig>, ConfigError> {
    let path = repo_path.join(BUILD_MATRIX_PATH);
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let matrix: BuildMatrix = serde_json::from_str(&raw)?;
    Ok(matrix.build_config)
}

/// Pick the configuration for one build-matrix index.
pub fn resolve(configs: &[BuildConfig], index: usize) -> Result<&BuildConfig, ConfigError> {
    configs.get(index).ok_or(ConfigError::IndexOutOfRange {
        index,
        total: configs.len(),
    })
}

/// Canonical string id of a configuration.
///
/// This is the join key matched against build-report filenames, so the
/// encoding must stay stable. Performance packages short-circuit: nothing
/// but the package type matters for them.
pub fn canonical_id(config: &BuildConfig) -> String {
    if config.package_type == "performance" {
        return "performance".to_string();
    }

    let build_type = if config.build_type.is_empty() {
        "relwithdebuginfo"
    } else {
        config.build_type.as_str()
    };
    let sanitizer = if config.sanitizer.is_empty() {
        "none"
    } else {
        config.sanitizer.as_str()
    };

    [
        config.compiler.as_str(),
        build_type,
        sanitizer,
        config.bundled.as_str(),
        config.splitted.as_str(),
        if config.tidy == "enable" { "tidy" } else { "notidy" },
        if config.with_coverage {
            "with_coverage"
        } else {
            "without_coverage"
        },
        config.package_type.as_str(),
    ]
    .join("_")
}

/// Working paths for one check run, supplied by the CI environment.
#[derive(Debug, Clone)]
pub struct CheckEnv {
    /// Scratch directory for the fetched binary and the container output.
    pub temp_path: PathBuf,
    /// Checkout of the repository under test (holds the build matrix).
    pub repo_path: PathBuf,
    /// Directory tree where upstream build jobs drop their reports.
    pub reports_path: PathBuf,
}

impl CheckEnv {
    /// Read the paths from the environment, with the conventional defaults.
    pub fn from_env() -> Self {
        CheckEnv {
            temp_path: env_path("TEMP_PATH", "."),
            repo_path: env_path("REPO_COPY", "../../"),
            reports_path: env_path("REPORTS_PATH", "./reports"),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}
