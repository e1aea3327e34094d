//! Per-viewport regression run orchestration.
//!
//! For each viewport: clear stale artifacts, capture the baseline origin,
//! capture the candidate origin in an isolated context, compare, record the
//! verdict. A navigation failure is fatal to that viewport only; remaining
//! viewports continue. Cleanup always completes before any capture begins,
//! and both captures complete before the comparison engine runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

use crate::capture::{CaptureController, CaptureResult, PageDriver};
use crate::compare::{ComparisonResult, compare};
use crate::config::ThresholdSettings;
use crate::diff::DiffConfig;
use crate::namespace::{ArtifactSet, CaptureIdentity, clear_artifacts, ensure_compare_dir};
use crate::viewport::Viewport;

/// Configuration for a regression run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Baseline origin URL
    pub baseline_url: String,
    /// Candidate origin URL
    pub candidate_url: String,
    /// Brand code (sanitized for naming)
    pub brand: String,
    /// Page type (sanitized for naming)
    pub page_type: String,
    /// Artifact root directory
    pub root: PathBuf,
    /// Spec identifier under the root
    pub spec_id: String,
    /// Viewports to evaluate, in order
    pub viewports: Vec<Viewport>,
    /// Per-viewport mismatch thresholds
    pub thresholds: ThresholdSettings,
    /// Pixel-diff configuration
    pub diff: DiffConfig,
}

/// Verdict for one viewport's test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportVerdict {
    /// Viewport evaluated
    pub viewport: Viewport,

    /// Base artifact name for this identity
    pub base_name: String,

    /// Threshold applied (fraction, [0,1])
    pub threshold: f64,

    /// Comparison outcome (absent when capture failed)
    pub result: Option<ComparisonResult>,

    /// Capture/navigation error, if the pipeline aborted
    pub error: Option<String>,
}

impl ViewportVerdict {
    /// Whether this viewport's test case passed.
    pub fn passed(&self) -> bool {
        self.error.is_none() && self.result.as_ref().is_some_and(|r| r.success)
    }
}

/// Result of a complete regression run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether every viewport passed
    pub success: bool,

    /// When the run started
    #[serde(with = "chrono::serde::ts_seconds")]
    pub started: DateTime<Utc>,

    /// Per-viewport verdicts, in run order
    pub verdicts: Vec<ViewportVerdict>,
}

impl RunResult {
    /// Write the run manifest next to the compare directory.
    pub fn write_manifest(&self, config: &RunConfig) -> std::io::Result<()> {
        let path = config.root.join(&config.spec_id).join("run.json");
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Factory for per-viewport page drivers.
///
/// The runner opens a fresh driver per viewport so each test case gets a
/// browser window sized to its viewport class.
pub type DriverFactory<'a> = dyn FnMut(Viewport) -> CaptureResult<Box<dyn PageDriver>> + 'a;

/// Execute a regression run across the configured viewports.
pub fn run(config: &RunConfig, make_driver: &mut DriverFactory) -> RunResult {
    let started = Utc::now();
    let mut verdicts = Vec::with_capacity(config.viewports.len());

    for &viewport in &config.viewports {
        let verdict = run_viewport(config, viewport, make_driver);
        match (&verdict.error, &verdict.result) {
            (Some(err), _) => {
                error!(viewport = %viewport, error = %err, "viewport aborted");
            }
            (None, Some(result)) => {
                info!(viewport = %viewport, success = result.success, mismatch = result.mismatch_percent, "viewport verdict");
            }
            _ => {}
        }
        verdicts.push(verdict);
    }

    RunResult {
        success: verdicts.iter().all(ViewportVerdict::passed),
        started,
        verdicts,
    }
}

fn run_viewport(
    config: &RunConfig,
    viewport: Viewport,
    make_driver: &mut DriverFactory,
) -> ViewportVerdict {
    let identity = CaptureIdentity::new(&config.brand, &config.page_type, viewport);
    let base_name = identity.base_name();
    let threshold = config.thresholds.for_viewport(viewport);

    info!(
        viewport = %viewport,
        base_name = %base_name,
        baseline = %config.baseline_url,
        candidate = %config.candidate_url,
        "comparing screenshots"
    );

    let mut verdict = ViewportVerdict {
        viewport,
        base_name,
        threshold,
        result: None,
        error: None,
    };

    if let Err(err) = prepare_and_capture(config, viewport, &identity, make_driver) {
        verdict.error = Some(err.to_string());
        return verdict;
    }

    let artifacts = ArtifactSet::resolve(&config.root, &config.spec_id, &identity);
    match compare(
        &artifacts.baseline,
        &artifacts.candidate,
        &artifacts.diff,
        threshold,
        &config.diff,
    ) {
        Ok(result) => verdict.result = Some(result),
        Err(err) => verdict.error = Some(err.to_string()),
    }
    verdict
}

/// Cleanup and both captures, strictly ordered: stale artifacts are removed
/// before any capture, and the baseline capture completes before the
/// candidate's isolated context opens.
fn prepare_and_capture(
    config: &RunConfig,
    viewport: Viewport,
    identity: &CaptureIdentity,
    make_driver: &mut DriverFactory,
) -> CaptureResult<()> {
    clear_artifacts(
        &config.root,
        &config.spec_id,
        viewport,
        identity.brand(),
        identity.page_type(),
    )?;
    ensure_compare_dir(&config.root, &config.spec_id)?;

    let artifacts = ArtifactSet::resolve(&config.root, &config.spec_id, identity);
    let controller = CaptureController::for_viewport(viewport);
    let mut driver = make_driver(viewport)?;

    controller.capture(driver.as_mut(), &config.baseline_url, &artifacts.baseline)?;

    let args = controller.origin_args(&config.candidate_url, &artifacts.candidate);
    controller.capture_isolated(driver.as_mut(), &args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MockPageDriver;

    fn test_config(root: PathBuf) -> RunConfig {
        RunConfig {
            baseline_url: "https://baseline.example".to_string(),
            candidate_url: "https://candidate.example".to_string(),
            brand: "Acme".to_string(),
            page_type: "Home Page".to_string(),
            root,
            spec_id: "regression".to_string(),
            viewports: vec![Viewport::Mobile],
            thresholds: ThresholdSettings::defaults(),
            diff: DiffConfig::default(),
        }
    }

    #[test]
    fn test_navigation_failure_confined_to_viewport() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path().to_path_buf());
        config.viewports = vec![Viewport::Desktop, Viewport::Mobile];

        let mut calls = 0;
        let result = run(&config, &mut |_viewport| {
            calls += 1;
            let mut driver = MockPageDriver::new();
            // First viewport's navigation fails; second proceeds.
            driver.fail_navigation = calls == 1;
            Ok(Box::new(driver))
        });

        assert!(!result.success);
        assert_eq!(result.verdicts.len(), 2);
        assert!(result.verdicts[0].error.is_some());
        assert!(!result.verdicts[0].passed());
        assert!(result.verdicts[1].error.is_none());
    }

    #[test]
    fn test_same_origin_twice_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = test_config(tmp.path().to_path_buf());
        // Identical origins render identically in the mock driver.
        config.candidate_url = config.baseline_url.clone();

        let result = run(&config, &mut |_viewport| {
            Ok(Box::new(MockPageDriver::new()))
        });

        assert!(result.success);
        let verdict = &result.verdicts[0];
        assert!(verdict.passed());
        let comparison = verdict.result.as_ref().unwrap();
        assert_eq!(comparison.mismatch_percent, 0.0);
        assert_eq!(verdict.base_name, "acme-home-page-mobile");
    }

    #[test]
    fn test_manifest_written() {
        let tmp = tempfile::tempdir().unwrap();
        let config = test_config(tmp.path().to_path_buf());
        let result = run(&config, &mut |_viewport| {
            Ok(Box::new(MockPageDriver::new()))
        });

        result.write_manifest(&config).unwrap();
        let manifest = tmp.path().join("regression").join("run.json");
        assert!(manifest.exists());
        let parsed: RunResult =
            serde_json::from_str(&fs::read_to_string(manifest).unwrap()).unwrap();
        assert_eq!(parsed.verdicts.len(), 1);
    }
}
