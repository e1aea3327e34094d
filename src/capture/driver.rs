//! Page driver abstraction over the browser-automation harness.
//!
//! This module provides a unified interface for the primitives the capture
//! pipeline needs from a browser:
//! - `ChromeDriver` for real captures over the Chrome DevTools Protocol
//! - `MockPageDriver` for testing the pipeline without a browser

use image::{Rgba, RgbaImage};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::types::{CaptureError, CaptureResult, SuppressionPolicy};

/// Trait for page drivers.
///
/// Implementations expose the bounded set of primitives the capture
/// controller sequences: navigation, fixed waits, visibility queries,
/// scrolling, scoped layout normalization and full-page raster capture.
/// All operations are synchronous; a driver backed by an async protocol owns
/// its own runtime and blocks internally.
pub trait PageDriver {
    /// Navigate to a URL with an explicit script-error suppression policy.
    fn navigate(&mut self, url: &str, policy: &SuppressionPolicy) -> CaptureResult<()>;

    /// Suspend for a fixed, bounded duration.
    fn wait_ms(&mut self, ms: u64);

    /// Whether the element matched by `selector` is present and visible.
    fn is_visible(&mut self, selector: &str) -> CaptureResult<bool>;

    /// Scroll to a vertical offset.
    fn scroll_to(&mut self, y: u64) -> CaptureResult<()>;

    /// Scroll to the top of the document.
    fn scroll_to_top(&mut self) -> CaptureResult<()>;

    /// Scroll past the bottom of the document (triggers bottom-anchored lazy loads).
    fn scroll_to_bottom(&mut self) -> CaptureResult<()>;

    /// Total content height: the max of the DOM height metrics, robust to
    /// quirks-mode vs standards-mode reporting.
    fn content_height(&mut self) -> CaptureResult<u64>;

    /// Reflow the viewport-fixed header into normal document flow.
    fn flatten_sticky_header(&mut self) -> CaptureResult<()>;

    /// Suppress scrollbar rendering so captured content is not shifted by a
    /// variable-width scrollbar across environments.
    fn hide_scrollbars(&mut self) -> CaptureResult<()>;

    /// Revert every layout mutation made by `flatten_sticky_header` and
    /// `hide_scrollbars`.
    fn restore_layout(&mut self) -> CaptureResult<()>;

    /// Capture a full-page raster to `output`.
    fn capture_full_page(&mut self, output: &Path) -> CaptureResult<()>;

    /// Open an isolated browsing context that shares no mutable state with
    /// this driver. Used for cross-origin candidate captures.
    fn open_isolated(&mut self) -> CaptureResult<Box<dyn PageDriver>>;
}

/// A scripted page driver for testing the capture pipeline.
///
/// Records every primitive invocation into a shared call log so tests can
/// assert on sequencing (lazy-load before normalization, restore after
/// capture, and so on). Rendering is deterministic: the captured image is
/// derived from the current URL, so capturing the same URL twice yields
/// byte-identical pixels.
#[derive(Debug, Clone)]
pub struct MockPageDriver {
    calls: Arc<Mutex<Vec<String>>>,
    current_url: Option<String>,
    /// Reported total content height
    pub content_height: u64,
    /// Rendered capture dimensions (width, height)
    pub dimensions: (u32, u32),
    /// Markers reported as not visible
    pub hidden_markers: HashSet<String>,
    /// Fail the next navigation
    pub fail_navigation: bool,
    /// Fail the full-page capture
    pub fail_capture: bool,
}

impl MockPageDriver {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            current_url: None,
            content_height: 2000,
            dimensions: (400, 800),
            hidden_markers: HashSet::new(),
            fail_navigation: false,
            fail_capture: false,
        }
    }

    /// Snapshot of the recorded call log, including calls made by isolated
    /// contexts spawned from this driver.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("call log poisoned").push(call.into());
    }

    /// Deterministic pseudo-render of a URL: a solid background with a
    /// content band, both colored from a hash of the URL.
    fn render(&self, url: &str) -> RgbaImage {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in url.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        let bg = [
            (hash & 0xff) as u8,
            ((hash >> 8) & 0xff) as u8,
            ((hash >> 16) & 0xff) as u8,
        ];
        let band = [
            ((hash >> 24) & 0xff) as u8,
            ((hash >> 32) & 0xff) as u8,
            ((hash >> 40) & 0xff) as u8,
        ];

        let (width, height) = self.dimensions;
        let mut img = RgbaImage::from_pixel(width, height, Rgba([bg[0], bg[1], bg[2], 255]));
        let band_top = height / 4;
        let band_bottom = height / 2;
        for y in band_top..band_bottom {
            for x in 0..width {
                img.put_pixel(x, y, Rgba([band[0], band[1], band[2], 255]));
            }
        }
        img
    }
}

impl Default for MockPageDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PageDriver for MockPageDriver {
    fn navigate(&mut self, url: &str, policy: &SuppressionPolicy) -> CaptureResult<()> {
        self.record(format!(
            "navigate:{}:suppress={}",
            url, policy.suppress_page_errors
        ));
        if self.fail_navigation {
            return Err(CaptureError::Navigation(format!(
                "mock navigation to {} failed",
                url
            )));
        }
        self.current_url = Some(url.to_string());
        Ok(())
    }

    fn wait_ms(&mut self, ms: u64) {
        self.record(format!("wait:{}", ms));
    }

    fn is_visible(&mut self, selector: &str) -> CaptureResult<bool> {
        self.record(format!("visible:{}", selector));
        Ok(!self.hidden_markers.contains(selector))
    }

    fn scroll_to(&mut self, y: u64) -> CaptureResult<()> {
        self.record(format!("scroll:{}", y));
        Ok(())
    }

    fn scroll_to_top(&mut self) -> CaptureResult<()> {
        self.record("scroll_top");
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> CaptureResult<()> {
        self.record("scroll_bottom");
        Ok(())
    }

    fn content_height(&mut self) -> CaptureResult<u64> {
        self.record("content_height");
        Ok(self.content_height)
    }

    fn flatten_sticky_header(&mut self) -> CaptureResult<()> {
        self.record("flatten_header");
        Ok(())
    }

    fn hide_scrollbars(&mut self) -> CaptureResult<()> {
        self.record("hide_scrollbars");
        Ok(())
    }

    fn restore_layout(&mut self) -> CaptureResult<()> {
        self.record("restore_layout");
        Ok(())
    }

    fn capture_full_page(&mut self, output: &Path) -> CaptureResult<()> {
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.record(format!("capture:{}", file_name));

        if self.fail_capture {
            return Err(CaptureError::Harness("mock capture failed".to_string()));
        }

        let url = self
            .current_url
            .as_deref()
            .ok_or_else(|| CaptureError::Navigation("capture before navigation".to_string()))?;
        let img = self.render(url);
        img.save(output)
            .map_err(|e| CaptureError::Harness(format!("failed to write capture: {}", e)))?;
        Ok(())
    }

    fn open_isolated(&mut self) -> CaptureResult<Box<dyn PageDriver>> {
        self.record("isolated_context");
        // Fresh page state; only the test-observability log is shared.
        let mut isolated = MockPageDriver::new();
        isolated.calls = Arc::clone(&self.calls);
        isolated.content_height = self.content_height;
        isolated.dimensions = self.dimensions;
        isolated.hidden_markers = self.hidden_markers.clone();
        Ok(Box::new(isolated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_render_deterministic() {
        let driver = MockPageDriver::new();
        let a = driver.render("https://example.com");
        let b = driver.render("https://example.com");
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_mock_render_differs_by_url() {
        let driver = MockPageDriver::new();
        let a = driver.render("https://example.com/a");
        let b = driver.render("https://example.com/b");
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_mock_capture_requires_navigation() {
        let mut driver = MockPageDriver::new();
        let err = driver
            .capture_full_page(Path::new("never-written.png"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Navigation(_)));
    }

    #[test]
    fn test_mock_records_calls() {
        let mut driver = MockPageDriver::new();
        driver
            .navigate("https://example.com", &SuppressionPolicy::default())
            .unwrap();
        driver.wait_ms(100);
        driver.scroll_to_bottom().unwrap();
        let calls = driver.calls();
        assert_eq!(calls[0], "navigate:https://example.com:suppress=true");
        assert_eq!(calls[1], "wait:100");
        assert_eq!(calls[2], "scroll_bottom");
    }

    #[test]
    fn test_isolated_context_shares_log_not_state() {
        let mut driver = MockPageDriver::new();
        driver
            .navigate("https://example.com", &SuppressionPolicy::default())
            .unwrap();

        let mut isolated = driver.open_isolated().unwrap();
        // The isolated context has no current page of its own.
        let err = isolated
            .capture_full_page(Path::new("never-written.png"))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Navigation(_)));

        let calls = driver.calls();
        assert!(calls.contains(&"isolated_context".to_string()));
        assert!(calls.iter().any(|c| c.starts_with("capture:")));
    }

    #[test]
    fn test_hidden_marker_reported_invisible() {
        let mut driver = MockPageDriver::new();
        driver.hidden_markers.insert("footer".to_string());
        assert!(driver.is_visible("body").unwrap());
        assert!(!driver.is_visible("footer").unwrap());
    }
}
