//! Comparison engine: quantify visual difference between two same-identity
//! captures and classify pass/fail against a per-viewport threshold.
//!
//! Comparison outcomes are always returned as data, never thrown, so the
//! caller can branch on success and log artifact locations. Only genuine
//! faults (unreadable or unwritable images) surface as errors.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::diff::{DiffConfig, DiffError, diff_images, load_png, save_png};

/// Result type for comparison operations
pub type CompareResult<T> = Result<T, CompareError>;

/// Error types for comparison faults (not mismatches)
#[derive(Debug)]
pub enum CompareError {
    /// The pixel-diff collaborator failed (decode/encode/IO)
    Diff(DiffError),
}

impl std::fmt::Display for CompareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompareError::Diff(err) => write!(f, "Diff error: {}", err),
        }
    }
}

impl std::error::Error for CompareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompareError::Diff(err) => Some(err),
        }
    }
}

impl From<DiffError> for CompareError {
    fn from(err: DiffError) -> Self {
        CompareError::Diff(err)
    }
}

/// Structured failure kinds that are not visual regressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonFailure {
    /// Baseline or candidate image absent: the capture pipeline did not
    /// produce it. Distinguishable from a real mismatch.
    MissingArtifact,
}

/// Outcome of one baseline/candidate comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Whether the mismatch stayed within the threshold
    pub success: bool,

    /// Mismatch percentage in [0, 100]
    pub mismatch_percent: f64,

    /// Path of the persisted diff image (absent on the missing-artifact path)
    pub diff_path: Option<PathBuf>,

    /// Structured failure kind, if the comparison was never performed
    pub error: Option<ComparisonFailure>,
}

impl ComparisonResult {
    fn missing_artifact() -> Self {
        Self {
            success: false,
            mismatch_percent: 0.0,
            diff_path: None,
            error: Some(ComparisonFailure::MissingArtifact),
        }
    }

    /// Human-readable summary for verdict output.
    pub fn summary(&self) -> String {
        match self.error {
            Some(ComparisonFailure::MissingArtifact) => {
                "baseline or candidate image missing".to_string()
            }
            None if self.success => {
                format!("screenshots match ({:.2}% mismatch)", self.mismatch_percent)
            }
            None => match &self.diff_path {
                Some(diff) => format!(
                    "mismatch {:.2}% exceeds threshold, diff saved at {}",
                    self.mismatch_percent,
                    diff.display()
                ),
                None => format!("mismatch {:.2}% exceeds threshold", self.mismatch_percent),
            },
        }
    }
}

/// Compare a baseline and candidate image and persist the diff raster.
///
/// `threshold` is the maximum tolerated mismatch fraction in [0, 1]. The
/// boundary is inclusive: a mismatch of exactly `threshold * 100` percent
/// passes. The diff image is written on both pass and fail so near-miss
/// passes can be audited; it is not written when an input is missing.
pub fn compare(
    baseline_path: &Path,
    candidate_path: &Path,
    diff_path: &Path,
    threshold: f64,
    config: &DiffConfig,
) -> CompareResult<ComparisonResult> {
    if !baseline_path.exists() || !candidate_path.exists() {
        debug!(
            baseline = %baseline_path.display(),
            candidate = %candidate_path.display(),
            "missing capture artifact"
        );
        return Ok(ComparisonResult::missing_artifact());
    }

    let baseline = load_png(baseline_path)?;
    let candidate = load_png(candidate_path)?;

    let diff = diff_images(&baseline, &candidate, config);
    if let Some(ref img) = diff.diff_image {
        save_png(img, diff_path)?;
    }

    let success = diff.mismatch_percent <= threshold * 100.0;
    info!(
        mismatch = diff.mismatch_percent,
        threshold = threshold * 100.0,
        success,
        "comparison complete"
    );

    Ok(ComparisonResult {
        success,
        mismatch_percent: diff.mismatch_percent,
        diff_path: Some(diff_path.to_path_buf()),
        error: None,
    })
}
