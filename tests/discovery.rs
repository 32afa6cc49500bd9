//! Fixture-driven discovery flow: build matrix -> canonical id -> report
//! lookup, the join the pipeline relies on.

use unitcheck::{config, reports};

fn matrix_json() -> &'static str {
    r#"
    {
      "build_config": [
        {
          "compiler": "clang-11",
          "build-type": "",
          "sanitizer": "address",
          "bundled": "bundled",
          "splitted": "unsplitted",
          "tidy": "disable",
          "with_coverage": false,
          "package-type": "binary"
        },
        {
          "compiler": "gcc-10",
          "build-type": "debug",
          "sanitizer": "",
          "bundled": "bundled",
          "splitted": "splitted",
          "tidy": "enable",
          "with_coverage": true,
          "package-type": "performance"
        }
      ]
    }
    "#
}

#[test]
fn test_matrix_to_artifact_urls() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Repo copy with the build matrix in the conventional place.
    let repo = dir.path().join("repo");
    std::fs::create_dir_all(repo.join("tests/ci")).expect("mkdir");
    std::fs::write(repo.join("tests/ci/ci_config.json"), matrix_json()).expect("write matrix");

    // Reports tree with one report per configuration.
    let reports_root = dir.path().join("reports");
    std::fs::create_dir_all(reports_root.join("build_check")).expect("mkdir");
    let id = "clang-11_relwithdebuginfo_address_bundled_unsplitted_notidy_without_coverage_binary";
    std::fs::write(
        reports_root.join(format!("build_check/report_{id}.json")),
        r#"{"build_urls": ["https://builds.example.com/unit_tests", "https://builds.example.com/extra.tgz"]}"#,
    )
    .expect("write report");

    let configs = config::load_build_configs(&repo).expect("load failed");
    assert_eq!(configs.len(), 2);

    let build_config = config::resolve(&configs, 0).expect("resolve failed");
    let canonical = config::canonical_id(build_config);
    assert_eq!(canonical, id);

    let urls = reports::locate_build_urls(&canonical, &reports_root).expect("locate failed");
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("unit_tests"));
}

#[test]
fn test_performance_config_matches_performance_report() {
    let dir = tempfile::tempdir().expect("tempdir");

    let repo = dir.path().join("repo");
    std::fs::create_dir_all(repo.join("tests/ci")).expect("mkdir");
    std::fs::write(repo.join("tests/ci/ci_config.json"), matrix_json()).expect("write matrix");

    let reports_root = dir.path().join("reports");
    std::fs::create_dir_all(&reports_root).expect("mkdir");
    std::fs::write(
        reports_root.join("report_performance.json"),
        r#"{"build_urls": ["https://builds.example.com/performance.tgz"]}"#,
    )
    .expect("write report");

    let configs = config::load_build_configs(&repo).expect("load failed");
    let build_config = config::resolve(&configs, 1).expect("resolve failed");
    assert_eq!(config::canonical_id(build_config), "performance");

    let urls = reports::locate_build_urls("performance", &reports_root).expect("locate failed");
    assert_eq!(urls, vec!["https://builds.example.com/performance.tgz"]);
}

#[test]
fn test_unmatched_config_yields_no_urls() {
    let dir = tempfile::tempdir().expect("tempdir");
    let reports_root = dir.path().join("reports");
    std::fs::create_dir_all(&reports_root).expect("mkdir");

    let urls =
        reports::locate_build_urls("clang-11_never_built", &reports_root).expect("locate failed");
    assert!(urls.is_empty());
}
