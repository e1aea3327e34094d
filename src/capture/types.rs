// Core types for the capture pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Error types for capture operations
#[derive(Debug)]
pub enum CaptureError {
    /// Page failed to reach a visible/stable state within its bounded wait
    Navigation(String),

    /// Failure in the underlying automation harness
    Harness(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Navigation(msg) => write!(f, "Navigation error: {}", msg),
            CaptureError::Harness(msg) => write!(f, "Harness error: {}", msg),
            CaptureError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::Navigation(_) => None,
            CaptureError::Harness(_) => None,
            CaptureError::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io(err)
    }
}

/// Policy for handling unrelated page script errors during navigation.
///
/// Passed explicitly to every navigation rather than installed as an ambient
/// hook, so isolated execution contexts receive it as part of their argument
/// bundle. Third-party origins routinely throw script errors (analytics, ads)
/// that must not fail a capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionPolicy {
    /// Whether uncaught page script errors are swallowed (and logged) instead
    /// of surfacing as capture failures.
    pub suppress_page_errors: bool,
}

impl Default for SuppressionPolicy {
    fn default() -> Self {
        Self {
            suppress_page_errors: true,
        }
    }
}

impl SuppressionPolicy {
    /// Surface page script errors as capture failures.
    pub fn strict() -> Self {
        Self {
            suppress_page_errors: false,
        }
    }
}

/// Immutable argument bundle for a capture inside an isolated browsing context.
///
/// A cross-origin candidate capture runs in a context that shares no mutable
/// state with the controller that spawned it; everything it needs is carried
/// here, serializable, constructed once by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginCaptureArgs {
    /// URL to navigate to inside the isolated context
    pub url: String,

    /// Output path for the full-page capture
    pub output: PathBuf,

    /// Settle delay class for the viewport being captured (milliseconds)
    pub settle_delay_ms: u64,

    /// Structural markers that must be visible before capture
    pub markers: Vec<String>,

    /// Script-error suppression policy to re-register inside the context
    pub policy: SuppressionPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_policy_default_suppresses() {
        assert!(SuppressionPolicy::default().suppress_page_errors);
        assert!(!SuppressionPolicy::strict().suppress_page_errors);
    }

    #[test]
    fn test_origin_capture_args_round_trip() {
        let args = OriginCaptureArgs {
            url: "https://candidate.example".to_string(),
            output: PathBuf::from("/tmp/modified-acme-home-mobile.png"),
            settle_delay_ms: 5000,
            markers: vec!["body".to_string(), "footer".to_string()],
            policy: SuppressionPolicy::default(),
        };
        let json = serde_json::to_string(&args).unwrap();
        let back: OriginCaptureArgs = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, args.url);
        assert_eq!(back.settle_delay_ms, 5000);
        assert_eq!(back.markers, args.markers);
    }
}
