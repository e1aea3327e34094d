//! Integration tests for the full regression pipeline

use pretty_assertions::{assert_eq, assert_ne};
use std::fs;
use std::path::{Path, PathBuf};

use page_vision::capture::MockPageDriver;
use page_vision::config::ThresholdSettings;
use page_vision::diff::DiffConfig;
use page_vision::runner::{RunConfig, run};
use page_vision::viewport::Viewport;

fn pipeline_config(root: PathBuf, viewports: Vec<Viewport>) -> RunConfig {
    RunConfig {
        baseline_url: "https://prod.example/home".to_string(),
        candidate_url: "https://staging.example/home".to_string(),
        brand: "H&M".to_string(),
        page_type: "Home Page".to_string(),
        root,
        spec_id: "regression".to_string(),
        viewports,
        thresholds: ThresholdSettings::defaults(),
        diff: DiffConfig::default(),
    }
}

fn compare_dir(root: &Path) -> PathBuf {
    root.join("regression").join("compare")
}

#[test]
fn test_run_produces_full_artifact_set() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = pipeline_config(tmp.path().to_path_buf(), vec![Viewport::Mobile]);

    let result = run(&config, &mut |_viewport| Ok(Box::new(MockPageDriver::new())));

    // Different origins render differently in the mock driver, so the run
    // fails on mismatch, but all three artifacts exist with the contract
    // names.
    assert!(!result.success);
    let dir = compare_dir(tmp.path());
    assert!(dir.join("original-h-m-home-page-mobile.png").exists());
    assert!(dir.join("modified-h-m-home-page-mobile.png").exists());
    assert!(dir.join("diff-h-m-home-page-mobile.png").exists());

    let verdict = &result.verdicts[0];
    let comparison = verdict.result.as_ref().expect("comparison ran");
    assert!(comparison.mismatch_percent > 0.0);
}

#[test]
fn test_same_origin_run_is_stable() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = pipeline_config(tmp.path().to_path_buf(), vec![Viewport::Desktop]);
    config.candidate_url = config.baseline_url.clone();

    let result = run(&config, &mut |_viewport| Ok(Box::new(MockPageDriver::new())));

    assert!(result.success);
    let verdict = &result.verdicts[0];
    assert_eq!(
        verdict
            .result
            .as_ref()
            .expect("comparison ran")
            .mismatch_percent,
        0.0
    );

    let dir = compare_dir(tmp.path());
    let original = fs::read(dir.join("original-h-m-home-page-desktop.png")).unwrap();
    let modified = fs::read(dir.join("modified-h-m-home-page-desktop.png")).unwrap();
    assert_eq!(original, modified, "same origin captures byte-identically");
}

#[test]
fn test_cleanup_is_scoped_to_the_run_viewport() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = pipeline_config(tmp.path().to_path_buf(), vec![Viewport::Mobile]);

    // Seed stale artifacts from a previous run: one for the identity under
    // test, one for another viewport, one for another brand.
    let dir = compare_dir(tmp.path());
    fs::create_dir_all(&dir).expect("Failed to create compare dir");
    let stale_same = dir.join("diff-h-m-home-page-mobile.png");
    let other_viewport = dir.join("original-h-m-home-page-desktop.png");
    let other_brand = dir.join("original-acme-home-page-mobile.png");
    fs::write(&stale_same, b"stale").unwrap();
    fs::write(&other_viewport, b"keep").unwrap();
    fs::write(&other_brand, b"keep").unwrap();

    let result = run(&config, &mut |_viewport| Ok(Box::new(MockPageDriver::new())));

    // The stale same-identity diff was replaced with a real PNG.
    assert_ne!(fs::read(&stale_same).unwrap(), b"stale");
    // Other identities survive untouched.
    assert_eq!(fs::read(&other_viewport).unwrap(), b"keep");
    assert_eq!(fs::read(&other_brand).unwrap(), b"keep");
    assert_eq!(result.verdicts.len(), 1);
}

#[test]
fn test_pipeline_sequencing() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = pipeline_config(tmp.path().to_path_buf(), vec![Viewport::Tablet]);

    // Clone keeps a handle on the shared call log after the run consumes
    // the boxed driver.
    let probe = MockPageDriver::new();
    let handle = probe.clone();
    let mut probe = Some(probe);

    let result = run(&config, &mut |_viewport| {
        Ok(Box::new(probe.take().expect("single viewport run")))
    });
    assert!(result.verdicts[0].error.is_none());

    let calls = handle.calls();
    let pos = |needle: &str| {
        calls
            .iter()
            .position(|c| c == needle || c.starts_with(needle))
            .unwrap_or_else(|| panic!("call {} not recorded: {:?}", needle, calls))
    };

    // Lazy-load cycle happens before layout normalization.
    assert!(pos("scroll_bottom") < pos("flatten_header"));
    assert!(pos("flatten_header") < pos("hide_scrollbars"));
    // Layout is restored only after the capture lands.
    assert!(pos("capture:original-") < pos("restore_layout"));
    // The candidate capture runs in an isolated context opened after the
    // baseline capture completed.
    assert!(pos("capture:original-") < pos("isolated_context"));
    assert!(pos("isolated_context") < pos("capture:modified-"));
    // Both navigations carried the default suppression policy.
    assert_eq!(
        calls
            .iter()
            .filter(|c| c.starts_with("navigate:") && c.ends_with(":suppress=true"))
            .count(),
        2
    );
}

#[test]
fn test_capture_failure_yields_verdict_not_panic() {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let config = pipeline_config(tmp.path().to_path_buf(), vec![Viewport::Mobile]);

    let result = run(&config, &mut |_viewport| {
        let mut driver = MockPageDriver::new();
        driver.fail_capture = true;
        Ok(Box::new(driver))
    });

    assert!(!result.success);
    let verdict = &result.verdicts[0];
    assert!(verdict.error.is_some());
    assert!(verdict.result.is_none());
    assert!(!verdict.passed());
}
