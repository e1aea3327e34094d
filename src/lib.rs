//! Page Vision - Visual regression testing for live web pages.
//!
//! This crate provides:
//! - Deterministic full-page capture that defeats lazy-loading and sticky layout
//! - Pixel-level comparison of baseline/candidate captures with per-viewport thresholds
//! - Collision-free artifact naming derived from (brand, page type, viewport)
//! - A mock page driver for testing the pipeline without a browser
//!
//! # Example
//!
//! ```rust,no_run
//! use page_vision::capture::{CaptureController, MockPageDriver};
//! use page_vision::viewport::Viewport;
//!
//! let controller = CaptureController::for_viewport(Viewport::Mobile);
//! let mut driver = MockPageDriver::new();
//! controller
//!     .capture(&mut driver, "https://example.com", std::path::Path::new("page.png"))
//!     .unwrap();
//! ```

pub mod capture;
pub mod compare;
pub mod config;
pub mod diff;
pub mod namespace;
pub mod runner;
pub mod viewport;

// Re-export capture types and drivers
pub use capture::{
    CaptureController, CaptureError, CaptureResult, ChromeDriver, MockPageDriver,
    OriginCaptureArgs, PageDriver, StabilizationConfig, SuppressionPolicy,
};

// Re-export comparison engine
pub use compare::{ComparisonFailure, ComparisonResult, compare};

// Re-export artifact namespace management
pub use namespace::{
    ArtifactSet, CaptureIdentity, Role, clear_artifacts, ensure_compare_dir, sanitize,
};

// Re-export runner types
pub use runner::{RunConfig, RunResult, ViewportVerdict, run};

// Re-export viewport presets
pub use viewport::Viewport;
