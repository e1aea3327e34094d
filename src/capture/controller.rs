//! Capture controller: the stabilization sequence that turns a live page into
//! a comparable full-page raster.
//!
//! Three sources of nondeterminism are defeated before the raster is taken:
//! lazy-loaded content (scroll cycle plus an incremental scroll pass),
//! animated settle time (fixed viewport-class delays), and viewport-fixed
//! chrome (sticky headers flattened, scrollbars hidden, both reverted on
//! every exit path).

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::driver::PageDriver;
use super::types::{CaptureError, CaptureResult, OriginCaptureArgs, SuppressionPolicy};
use crate::viewport::Viewport;

/// Default pause after the lazy-load scroll cycle (milliseconds)
pub const DEFAULT_LAZY_LOAD_PAUSE_MS: u64 = 2000;

/// Default number of incremental scroll steps
pub const DEFAULT_SCROLL_STEPS: u32 = 10;

/// Default pause at each scroll step (milliseconds)
pub const DEFAULT_STEP_PAUSE_MS: u64 = 200;

/// Default pause after returning to top, before the capture (milliseconds)
pub const DEFAULT_FINAL_PAUSE_MS: u64 = 500;

/// Structural markers asserted visible before any capture
pub const DEFAULT_MARKERS: [&str; 2] = ["body", "footer"];

/// Timing and marker configuration for one capture.
#[derive(Debug, Clone)]
pub struct StabilizationConfig {
    /// Settle delay after navigation (viewport-class dependent)
    pub settle_delay_ms: u64,
    /// Pause after each half of the lazy-load scroll cycle
    pub lazy_load_pause_ms: u64,
    /// Number of incremental scroll steps across the content height
    pub scroll_steps: u32,
    /// Pause at each incremental scroll offset
    pub step_pause_ms: u64,
    /// Final pause at top-of-page before the capture
    pub final_pause_ms: u64,
    /// Elements that must be visible before capture proceeds
    pub markers: Vec<String>,
}

impl StabilizationConfig {
    /// Stabilization settings for a viewport class.
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self {
            settle_delay_ms: viewport.settle_delay_ms(),
            lazy_load_pause_ms: DEFAULT_LAZY_LOAD_PAUSE_MS,
            scroll_steps: DEFAULT_SCROLL_STEPS,
            step_pause_ms: DEFAULT_STEP_PAUSE_MS,
            final_pause_ms: DEFAULT_FINAL_PAUSE_MS,
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Precomputed list of scroll offsets for the incremental capture pass.
///
/// The range `[0, total_height)` is partitioned into equal steps. An explicit
/// offset list keeps the pass a bounded loop with a testable step count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollPlan {
    offsets: Vec<u64>,
}

impl ScrollPlan {
    pub fn new(total_height: u64, steps: u32) -> Self {
        let step = (total_height / u64::from(steps.max(1))).max(1);
        let mut offsets = Vec::new();
        let mut current = 0;
        while current < total_height {
            offsets.push(current);
            current += step;
        }
        if offsets.is_empty() {
            offsets.push(0);
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }
}

/// Drives one page through the stabilization sequence and requests a
/// full-page capture from the page driver.
#[derive(Debug, Clone)]
pub struct CaptureController {
    config: StabilizationConfig,
    policy: SuppressionPolicy,
}

impl CaptureController {
    pub fn new(config: StabilizationConfig, policy: SuppressionPolicy) -> Self {
        Self { config, policy }
    }

    /// Controller with viewport-class timings and the default suppression policy.
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self::new(StabilizationConfig::for_viewport(viewport), SuppressionPolicy::default())
    }

    pub fn config(&self) -> &StabilizationConfig {
        &self.config
    }

    /// Capture a stable full-page raster of `url` to `output`.
    ///
    /// The sequence is strictly ordered: navigate and settle, assert markers,
    /// run the lazy-load scroll cycle exactly once, then take the incremental
    /// scroll pass and the capture under normalized layout. A page that never
    /// reaches a visible state aborts with a navigation error; no partial
    /// artifact is produced.
    pub fn capture(
        &self,
        driver: &mut dyn PageDriver,
        url: &str,
        output: &Path,
    ) -> CaptureResult<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        info!(url, output = %output.display(), "capturing page");

        driver.navigate(url, &self.policy)?;
        driver.wait_ms(self.config.settle_delay_ms);

        for marker in &self.config.markers {
            if !driver.is_visible(marker)? {
                return Err(CaptureError::Navigation(format!(
                    "element '{}' not visible after {}ms settle on {}",
                    marker, self.config.settle_delay_ms, url
                )));
            }
        }

        // Lazy-load cycle, exactly once and before layout normalization:
        // many lazy-load implementations only fire on a scroll event crossing
        // the element's position.
        driver.scroll_to_bottom()?;
        driver.wait_ms(self.config.lazy_load_pause_ms);
        driver.scroll_to_top()?;
        driver.wait_ms(self.config.lazy_load_pause_ms);

        with_normalized_layout(driver, |d| {
            let height = d.content_height()?;
            let plan = ScrollPlan::new(height, self.config.scroll_steps);
            debug!(height, steps = plan.offsets().len(), "incremental scroll pass");

            for &offset in plan.offsets() {
                d.scroll_to(offset)?;
                d.wait_ms(self.config.step_pause_ms);
            }

            d.scroll_to_top()?;
            d.wait_ms(self.config.final_pause_ms);
            d.capture_full_page(output)
        })
    }

    /// Build the argument bundle for a capture inside an isolated context.
    pub fn origin_args(&self, url: &str, output: &Path) -> OriginCaptureArgs {
        OriginCaptureArgs {
            url: url.to_string(),
            output: output.to_path_buf(),
            settle_delay_ms: self.config.settle_delay_ms,
            markers: self.config.markers.clone(),
            policy: self.policy.clone(),
        }
    }

    /// Capture inside an isolated browsing context.
    ///
    /// The context is opened fresh from the driver and receives only the
    /// serializable `args` bundle: the pipeline run inside it reads nothing
    /// from `self` beyond step timings, and re-registers the suppression
    /// policy carried in the bundle.
    pub fn capture_isolated(
        &self,
        driver: &mut dyn PageDriver,
        args: &OriginCaptureArgs,
    ) -> CaptureResult<()> {
        let mut context = driver.open_isolated()?;
        let isolated = CaptureController::new(
            StabilizationConfig {
                settle_delay_ms: args.settle_delay_ms,
                markers: args.markers.clone(),
                ..self.config.clone()
            },
            args.policy.clone(),
        );
        isolated.capture(context.as_mut(), &args.url, &args.output)
    }
}

/// Run `f` with sticky headers flattened and scrollbars hidden, reverting the
/// layout on every exit path, including capture failure.
fn with_normalized_layout<T>(
    driver: &mut dyn PageDriver,
    f: impl FnOnce(&mut dyn PageDriver) -> CaptureResult<T>,
) -> CaptureResult<T> {
    driver.flatten_sticky_header()?;
    if let Err(err) = driver.hide_scrollbars() {
        let _ = driver.restore_layout();
        return Err(err);
    }

    let result = f(driver);
    let restored = driver.restore_layout();

    match result {
        Ok(value) => {
            restored?;
            Ok(value)
        }
        // The original failure wins over a secondary restore failure.
        Err(err) => {
            let _ = restored;
            Err(err)
        }
    }
}
