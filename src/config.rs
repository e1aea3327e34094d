//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for Page Vision. The URL
//! and identity variable names are a fixed external contract shared with the
//! CI jobs that drive regression runs.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `BASE_URL` | Base URL context for the run (informational) | empty |
//! | `URL_1` | Baseline origin | required |
//! | `URL_2` | Candidate origin | required |
//! | `Brandcode` | Brand code for artifact naming | empty |
//! | `PageType` | Page type for artifact naming | empty |
//! | `PAGE_VISION_ROOT` | Artifact root directory | `./screenshots` |
//! | `PAGE_VISION_SPEC_ID` | Spec directory under the root | `regression` |
//! | `PAGE_VISION_THRESHOLD_DESKTOP` | Desktop mismatch tolerance [0,1] | `0.1` |
//! | `PAGE_VISION_THRESHOLD_TABLET` | Tablet mismatch tolerance [0,1] | `0.1` |
//! | `PAGE_VISION_THRESHOLD_MOBILE` | Mobile mismatch tolerance [0,1] | `0.1` |

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::viewport::Viewport;

// ============================================================================
// Default Values
// ============================================================================

/// Default artifact root directory
pub const DEFAULT_ROOT: &str = "./screenshots";

/// Default spec identifier
pub const DEFAULT_SPEC_ID: &str = "regression";

/// Default per-viewport mismatch threshold (fraction, [0,1])
pub const DEFAULT_THRESHOLD: f64 = 0.1;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the base URL (informational)
pub const ENV_BASE_URL: &str = "BASE_URL";

/// Environment variable for the baseline origin
pub const ENV_BASELINE_URL: &str = "URL_1";

/// Environment variable for the candidate origin
pub const ENV_CANDIDATE_URL: &str = "URL_2";

/// Environment variable for the brand code
pub const ENV_BRAND: &str = "Brandcode";

/// Environment variable for the page type
pub const ENV_PAGE_TYPE: &str = "PageType";

/// Environment variable for the artifact root
pub const ENV_ROOT: &str = "PAGE_VISION_ROOT";

/// Environment variable for the spec identifier
pub const ENV_SPEC_ID: &str = "PAGE_VISION_SPEC_ID";

/// Environment variables for per-viewport thresholds
pub const ENV_THRESHOLD_DESKTOP: &str = "PAGE_VISION_THRESHOLD_DESKTOP";
pub const ENV_THRESHOLD_TABLET: &str = "PAGE_VISION_THRESHOLD_TABLET";
pub const ENV_THRESHOLD_MOBILE: &str = "PAGE_VISION_THRESHOLD_MOBILE";

// ============================================================================
// Errors
// ============================================================================

/// Error types for configuration failures
#[derive(Debug)]
pub enum ConfigError {
    /// A required environment value is absent
    MissingVar(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(name) => {
                write!(f, "Environment variable {} is required", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Configuration (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for Page Vision
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin URLs for the run
    pub urls: UrlSettings,
    /// Brand/page-type identity for artifact naming
    pub identity: IdentitySettings,
    /// Artifact storage layout
    pub artifacts: ArtifactSettings,
    /// Per-viewport mismatch thresholds
    pub thresholds: ThresholdSettings,
}

/// Origin URL settings
#[derive(Debug, Clone)]
pub struct UrlSettings {
    /// Base URL context (informational, may be empty)
    pub base_url: Option<String>,
    /// Baseline origin (required at run start)
    pub baseline: Option<String>,
    /// Candidate origin (required at run start)
    pub candidate: Option<String>,
}

/// Brand and page-type identity settings
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// Brand code (sanitized downstream)
    pub brand: String,
    /// Page type (sanitized downstream)
    pub page_type: String,
}

/// Artifact storage settings
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    /// Root directory for all artifacts
    pub root: PathBuf,
    /// Spec identifier (directory under the root)
    pub spec_id: String,
}

/// Per-viewport mismatch thresholds as fractions in [0,1]
#[derive(Debug, Clone)]
pub struct ThresholdSettings {
    pub desktop: f64,
    pub tablet: f64,
    pub mobile: f64,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            urls: UrlSettings::from_env(),
            identity: IdentitySettings::from_env(),
            artifacts: ArtifactSettings::from_env(),
            thresholds: ThresholdSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            urls: UrlSettings::defaults(),
            identity: IdentitySettings::defaults(),
            artifacts: ArtifactSettings::defaults(),
            thresholds: ThresholdSettings::defaults(),
        }
    }

    /// Both origin URLs, or a fatal configuration error.
    ///
    /// Raised before any browser interaction so a misconfigured run never
    /// reaches the network.
    pub fn require_urls(&self) -> Result<(String, String), ConfigError> {
        let baseline = self
            .urls
            .baseline
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingVar(ENV_BASELINE_URL))?;
        let candidate = self
            .urls
            .candidate
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingVar(ENV_CANDIDATE_URL))?;
        Ok((baseline, candidate))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl UrlSettings {
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_BASE_URL).ok(),
            baseline: env::var(ENV_BASELINE_URL).ok(),
            candidate: env::var(ENV_CANDIDATE_URL).ok(),
        }
    }

    pub fn defaults() -> Self {
        Self {
            base_url: None,
            baseline: None,
            candidate: None,
        }
    }
}

impl IdentitySettings {
    pub fn from_env() -> Self {
        Self {
            brand: env::var(ENV_BRAND).unwrap_or_default(),
            page_type: env::var(ENV_PAGE_TYPE).unwrap_or_default(),
        }
    }

    pub fn defaults() -> Self {
        Self {
            brand: String::new(),
            page_type: String::new(),
        }
    }
}

impl ArtifactSettings {
    pub fn from_env() -> Self {
        Self {
            root: env::var(ENV_ROOT)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_ROOT)),
            spec_id: env::var(ENV_SPEC_ID).unwrap_or_else(|_| DEFAULT_SPEC_ID.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            spec_id: DEFAULT_SPEC_ID.to_string(),
        }
    }
}

impl ThresholdSettings {
    pub fn from_env() -> Self {
        Self {
            desktop: read_threshold(ENV_THRESHOLD_DESKTOP),
            tablet: read_threshold(ENV_THRESHOLD_TABLET),
            mobile: read_threshold(ENV_THRESHOLD_MOBILE),
        }
    }

    pub fn defaults() -> Self {
        Self {
            desktop: DEFAULT_THRESHOLD,
            tablet: DEFAULT_THRESHOLD,
            mobile: DEFAULT_THRESHOLD,
        }
    }

    /// Threshold for a viewport class. Thresholds are per-viewport, not
    /// global: acceptable pixel drift differs by layout density.
    pub fn for_viewport(&self, viewport: Viewport) -> f64 {
        match viewport {
            Viewport::Desktop => self.desktop,
            Viewport::Tablet => self.tablet,
            Viewport::Mobile => self.mobile,
        }
    }
}

fn read_threshold(var: &str) -> f64 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|t| (0.0..=1.0).contains(t))
        .unwrap_or(DEFAULT_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.artifacts.root, PathBuf::from(DEFAULT_ROOT));
        assert_eq!(config.artifacts.spec_id, DEFAULT_SPEC_ID);
        assert_eq!(config.thresholds.desktop, DEFAULT_THRESHOLD);
        assert!(config.urls.baseline.is_none());
    }

    #[test]
    fn test_require_urls_missing_is_fatal() {
        let config = Config::defaults();
        let err = config.require_urls().unwrap_err();
        assert!(err.to_string().contains(ENV_BASELINE_URL));
    }

    #[test]
    fn test_require_urls_present() {
        let mut config = Config::defaults();
        config.urls.baseline = Some("https://a.example".to_string());
        config.urls.candidate = Some("https://b.example".to_string());
        let (baseline, candidate) = config.require_urls().unwrap();
        assert_eq!(baseline, "https://a.example");
        assert_eq!(candidate, "https://b.example");
    }

    #[test]
    fn test_empty_url_counts_as_missing() {
        let mut config = Config::defaults();
        config.urls.baseline = Some(String::new());
        config.urls.candidate = Some("https://b.example".to_string());
        assert!(config.require_urls().is_err());
    }

    #[test]
    fn test_threshold_per_viewport() {
        let thresholds = ThresholdSettings {
            desktop: 0.05,
            tablet: 0.2,
            mobile: 0.1,
        };
        assert_eq!(thresholds.for_viewport(Viewport::Desktop), 0.05);
        assert_eq!(thresholds.for_viewport(Viewport::Tablet), 0.2);
        assert_eq!(thresholds.for_viewport(Viewport::Mobile), 0.1);
    }
}
