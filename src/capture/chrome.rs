//! Chrome-backed page driver over the DevTools Protocol.
//!
//! Owns a tokio runtime and blocks on CDP futures, so the capture pipeline
//! stays a single synchronous thread of control. Layout normalization and
//! height metrics are performed with small injected scripts; the full-page
//! raster comes from the CDP screenshot primitive.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::js_protocol::runtime::EventExceptionThrown;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::driver::PageDriver;
use super::types::{CaptureError, CaptureResult, SuppressionPolicy};
use crate::viewport::Viewport;

/// Max of the DOM height metrics, robust to quirks-mode height reporting.
const CONTENT_HEIGHT_JS: &str = r#"
(function() {
  const body = document.body;
  const html = document.documentElement;
  return Math.max(
    body.scrollHeight,
    body.offsetHeight,
    html.clientHeight,
    html.scrollHeight,
    html.offsetHeight
  );
})()
"#;

/// Reflow a viewport-fixed header into normal flow and collapse its height,
/// so an incremental-scroll capture does not render it once per segment.
const FLATTEN_HEADER_JS: &str = r#"
(function() {
  const header = document.body.querySelector('header');
  if (header) {
    header.setAttribute('data-page-vision-flattened', '1');
    header.style.position = 'relative';
    header.style.height = '0';
  }
})()
"#;

const HIDE_SCROLLBARS_JS: &str = r#"
(function() {
  const style = document.createElement('style');
  style.id = 'page-vision-hide-scrollbars';
  style.textContent = `
    html, body {
      overflow: hidden !important;
      overflow-x: hidden !important;
      overflow-y: hidden !important;
    }
    ::-webkit-scrollbar {
      display: none !important;
      width: 0 !important;
      height: 0 !important;
    }
  `;
  document.head.appendChild(style);
})()
"#;

const RESTORE_LAYOUT_JS: &str = r#"
(function() {
  const header = document.body.querySelector('header[data-page-vision-flattened]');
  if (header) {
    header.removeAttribute('style');
    header.removeAttribute('data-page-vision-flattened');
  }
  const style = document.getElementById('page-vision-hide-scrollbars');
  if (style) {
    style.remove();
  }
})()
"#;

/// Page driver backed by a headless Chrome instance.
pub struct ChromeDriver {
    runtime: Arc<Runtime>,
    browser: Browser,
    page: Page,
    viewport: Viewport,
    page_errors: Arc<Mutex<Vec<String>>>,
    suppress_page_errors: bool,
}

impl ChromeDriver {
    /// Launch a headless browser sized to the viewport class.
    pub fn launch(viewport: Viewport) -> CaptureResult<Self> {
        let runtime = Runtime::new().map_err(CaptureError::Io)?;
        Self::launch_with_runtime(Arc::new(runtime), viewport)
    }

    /// Launch a browser on an existing runtime. Used when opening isolated
    /// contexts, which get their own browser but share the executor.
    fn launch_with_runtime(runtime: Arc<Runtime>, viewport: Viewport) -> CaptureResult<Self> {
        let (width, height) = viewport.dimensions();
        let config = BrowserConfig::builder()
            .window_size(width, height)
            .build()
            .map_err(CaptureError::Harness)?;

        let (browser, mut handler) = runtime
            .block_on(Browser::launch(config))
            .map_err(|e| CaptureError::Harness(format!("failed to launch browser: {}", e)))?;

        // Drive the CDP connection for the lifetime of the browser.
        runtime.spawn(async move { while handler.next().await.is_some() {} });

        let page = runtime
            .block_on(browser.new_page("about:blank"))
            .map_err(|e| CaptureError::Harness(format!("failed to open page: {}", e)))?;

        Ok(Self {
            runtime,
            browser,
            page,
            viewport,
            page_errors: Arc::new(Mutex::new(Vec::new())),
            suppress_page_errors: true,
        })
    }

    fn evaluate(&self, js: &str) -> CaptureResult<chromiumoxide::js::EvaluationResult> {
        self.runtime
            .block_on(self.page.evaluate(js))
            .map_err(|e| CaptureError::Harness(format!("script evaluation failed: {}", e)))
    }

    /// Register the exception listener for the current navigation according
    /// to the policy: suppressed errors are logged and dropped, otherwise
    /// they are collected and surfaced before the capture.
    fn register_exception_listener(&mut self, policy: &SuppressionPolicy) -> CaptureResult<()> {
        self.suppress_page_errors = policy.suppress_page_errors;
        self.page_errors.lock().expect("error log poisoned").clear();

        let mut events = self
            .runtime
            .block_on(self.page.event_listener::<EventExceptionThrown>())
            .map_err(|e| CaptureError::Harness(format!("failed to listen for exceptions: {}", e)))?;

        let errors = Arc::clone(&self.page_errors);
        let suppress = policy.suppress_page_errors;
        self.runtime.spawn(async move {
            while let Some(event) = events.next().await {
                let text = event.exception_details.text.clone();
                if suppress {
                    warn!(error = %text, "ignoring uncaught page exception");
                } else {
                    errors.lock().expect("error log poisoned").push(text);
                }
            }
        });
        Ok(())
    }

    fn check_page_errors(&self) -> CaptureResult<()> {
        if self.suppress_page_errors {
            return Ok(());
        }
        let errors = self.page_errors.lock().expect("error log poisoned");
        if let Some(first) = errors.first() {
            return Err(CaptureError::Navigation(format!(
                "uncaught page exception: {}",
                first
            )));
        }
        Ok(())
    }
}

impl PageDriver for ChromeDriver {
    fn navigate(&mut self, url: &str, policy: &SuppressionPolicy) -> CaptureResult<()> {
        self.register_exception_listener(policy)?;
        debug!(url, "navigating");

        self.runtime
            .block_on(async {
                self.page.goto(url).await?;
                self.page.wait_for_navigation().await?;
                Ok::<_, chromiumoxide::error::CdpError>(())
            })
            .map_err(|e| CaptureError::Navigation(format!("failed to load {}: {}", url, e)))
    }

    fn wait_ms(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    fn is_visible(&mut self, selector: &str) -> CaptureResult<bool> {
        let js = format!(
            r#"
            (function() {{
              const el = document.querySelector('{}');
              if (!el) return false;
              const rect = el.getBoundingClientRect();
              const style = window.getComputedStyle(el);
              return rect.width > 0 && rect.height > 0
                && style.display !== 'none' && style.visibility !== 'hidden';
            }})()
            "#,
            selector
        );
        self.evaluate(&js)?
            .into_value::<bool>()
            .map_err(|e| CaptureError::Harness(format!("visibility check failed: {}", e)))
    }

    fn scroll_to(&mut self, y: u64) -> CaptureResult<()> {
        self.evaluate(&format!("window.scrollTo(0, {})", y))?;
        Ok(())
    }

    fn scroll_to_top(&mut self) -> CaptureResult<()> {
        self.evaluate("window.scrollTo(0, 0)")?;
        Ok(())
    }

    fn scroll_to_bottom(&mut self) -> CaptureResult<()> {
        // Overshoot so bottom-anchored lazy loaders see the scroll cross them.
        self.evaluate("window.scrollTo(0, document.body.scrollHeight + 300)")?;
        Ok(())
    }

    fn content_height(&mut self) -> CaptureResult<u64> {
        let height = self
            .evaluate(CONTENT_HEIGHT_JS)?
            .into_value::<f64>()
            .map_err(|e| CaptureError::Harness(format!("height metric failed: {}", e)))?;
        Ok(height.max(0.0) as u64)
    }

    fn flatten_sticky_header(&mut self) -> CaptureResult<()> {
        self.evaluate(FLATTEN_HEADER_JS)?;
        Ok(())
    }

    fn hide_scrollbars(&mut self) -> CaptureResult<()> {
        self.evaluate(HIDE_SCROLLBARS_JS)?;
        Ok(())
    }

    fn restore_layout(&mut self) -> CaptureResult<()> {
        self.evaluate(RESTORE_LAYOUT_JS)?;
        Ok(())
    }

    fn capture_full_page(&mut self, output: &Path) -> CaptureResult<()> {
        self.check_page_errors()?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();

        self.runtime
            .block_on(self.page.save_screenshot(params, output))
            .map_err(|e| CaptureError::Harness(format!("screenshot failed: {}", e)))?;
        debug!(output = %output.display(), "full-page capture written");
        Ok(())
    }

    fn open_isolated(&mut self) -> CaptureResult<Box<dyn PageDriver>> {
        // A whole separate browser: no cookies, storage or in-memory state
        // shared with the context that spawned it.
        let driver = ChromeDriver::launch_with_runtime(Arc::clone(&self.runtime), self.viewport)?;
        Ok(Box::new(driver))
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        let _ = self.runtime.block_on(self.browser.close());
        let _ = self.runtime.block_on(self.browser.wait());
    }
}
