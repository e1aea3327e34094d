//! Artifact namespace management.
//!
//! Maps a (brand, page type, viewport) capture identity to a stable directory
//! and file-name scheme, and manages scoped cleanup of stale artifacts. The
//! layout is an external contract other tooling depends on:
//!
//! `<root>/<spec_id>/compare/{original,modified,diff}-<brand>-<page_type>-<viewport>.png`

use std::fs;
use std::path::{Path, PathBuf};

use crate::viewport::Viewport;

/// Role of a capture within an artifact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Baseline,
    Candidate,
}

impl Role {
    /// The literal file-name prefix for this role.
    pub const fn prefix(self) -> &'static str {
        match self {
            Role::Baseline => "original",
            Role::Candidate => "modified",
        }
    }
}

/// Sanitize a string for use in artifact file names.
///
/// Lower-cases, replaces every character outside `[a-z0-9-]` with `-`,
/// collapses runs of `-` into one, and strips leading/trailing `-`.
/// Idempotent: sanitizing a sanitized string yields the same string.
pub fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_hyphen = false;
    for ch in s.to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '-'
        };
        if ch == '-' {
            if last_hyphen || out.is_empty() {
                continue;
            }
            last_hyphen = true;
        } else {
            last_hyphen = false;
        }
        out.push(ch);
    }
    if out.ends_with('-') {
        out.pop();
    }
    out
}

/// The (brand, page type, viewport) key under which artifacts are grouped.
///
/// Brand and page type are sanitized at construction, so every derived path
/// is filesystem-safe. Immutable for the duration of a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureIdentity {
    brand: String,
    page_type: String,
    viewport: Viewport,
}

impl CaptureIdentity {
    pub fn new(brand: &str, page_type: &str, viewport: Viewport) -> Self {
        Self {
            brand: sanitize(brand),
            page_type: sanitize(page_type),
            viewport,
        }
    }

    pub fn brand(&self) -> &str {
        &self.brand
    }

    pub fn page_type(&self) -> &str {
        &self.page_type
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Base name shared by all artifacts for this identity.
    pub fn base_name(&self) -> String {
        format!("{}-{}-{}", self.brand, self.page_type, self.viewport.name())
    }
}

/// The baseline, candidate and diff paths for one capture identity.
///
/// All three share the same containing directory and base-name suffix; only
/// the role prefix differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub baseline: PathBuf,
    pub candidate: PathBuf,
    pub diff: PathBuf,
}

impl ArtifactSet {
    /// Resolve the artifact paths for an identity under `<root>/<spec_id>/compare/`.
    pub fn resolve(root: &Path, spec_id: &str, identity: &CaptureIdentity) -> Self {
        let dir = compare_dir(root, spec_id);
        let base = identity.base_name();
        Self {
            baseline: dir.join(format!("original-{}.png", base)),
            candidate: dir.join(format!("modified-{}.png", base)),
            diff: dir.join(format!("diff-{}.png", base)),
        }
    }

    /// Path for a capture role.
    pub fn path_for(&self, role: Role) -> &Path {
        match role {
            Role::Baseline => &self.baseline,
            Role::Candidate => &self.candidate,
        }
    }
}

/// The compare directory for a spec.
pub fn compare_dir(root: &Path, spec_id: &str) -> PathBuf {
    root.join(spec_id).join("compare")
}

/// Create the compare directory tree if absent. Idempotent.
pub fn ensure_compare_dir(root: &Path, spec_id: &str) -> std::io::Result<PathBuf> {
    let dir = compare_dir(root, spec_id);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Remove stale `.png` artifacts matching the (brand, page type, viewport)
/// pattern under the spec's compare directory.
///
/// Deletion is scoped: artifacts belonging to a different viewport or a
/// different brand/page-type pair are left untouched. When brand and page
/// type are both empty the pattern falls back to the viewport alone. If the
/// directory does not exist yet, creating it satisfies the call.
///
/// Returns the number of files removed.
pub fn clear_artifacts(
    root: &Path,
    spec_id: &str,
    viewport: Viewport,
    brand: &str,
    page_type: &str,
) -> std::io::Result<usize> {
    let dir = compare_dir(root, spec_id);

    let sanitized_brand = sanitize(brand);
    let sanitized_page_type = sanitize(page_type);
    let pattern = if !sanitized_brand.is_empty() && !sanitized_page_type.is_empty() {
        format!("-{}-{}-{}", sanitized_brand, sanitized_page_type, viewport.name())
    } else {
        format!("-{}", viewport.name())
    };

    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        return Ok(0);
    }

    tracing::debug!(pattern = %pattern, dir = %dir.display(), "clearing stale artifacts");

    let mut removed = 0;
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.ends_with(".png") && name.contains(&pattern) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_basic() {
        assert_eq!(sanitize("H&M"), "h-m");
        assert_eq!(sanitize("Home Page"), "home-page");
        assert_eq!(sanitize("already-clean"), "already-clean");
    }

    #[test]
    fn test_sanitize_collapses_and_trims() {
        assert_eq!(sanitize("--a//b..c--"), "a-b-c");
        assert_eq!(sanitize("&&&"), "");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for s in ["H&M", "Home Page", "a  b", "---", "", "MiXeD_case.123"] {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_sanitize_output_alphabet() {
        for s in ["H&M", "a b c", "ümlaut", "x--y", "!@#$%"] {
            let out = sanitize(s);
            assert!(
                out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "unexpected char in {:?}",
                out
            );
            assert!(!out.starts_with('-') && !out.ends_with('-'));
        }
    }

    #[test]
    fn test_base_name_deterministic() {
        let a = CaptureIdentity::new("H&M", "Home Page", Viewport::Mobile);
        let b = CaptureIdentity::new("H&M", "Home Page", Viewport::Mobile);
        assert_eq!(a.base_name(), b.base_name());
        assert_eq!(a.base_name(), "h-m-home-page-mobile");
    }

    #[test]
    fn test_artifact_set_paths() {
        let identity = CaptureIdentity::new("Acme", "Landing", Viewport::Desktop);
        let set = ArtifactSet::resolve(Path::new("/shots"), "regression", &identity);
        let dir = Path::new("/shots/regression/compare");
        assert_eq!(set.baseline, dir.join("original-acme-landing-desktop.png"));
        assert_eq!(set.candidate, dir.join("modified-acme-landing-desktop.png"));
        assert_eq!(set.diff, dir.join("diff-acme-landing-desktop.png"));
        assert_eq!(set.path_for(Role::Baseline), set.baseline.as_path());
        assert_eq!(set.path_for(Role::Candidate), set.candidate.as_path());
    }

    #[test]
    fn test_ensure_compare_dir_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let first = ensure_compare_dir(tmp.path(), "spec").unwrap();
        let second = ensure_compare_dir(tmp.path(), "spec").unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn test_clear_artifacts_scoped_to_viewport() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_compare_dir(tmp.path(), "spec").unwrap();
        for name in [
            "original-acme-home-desktop.png",
            "original-acme-home-tablet.png",
            "original-acme-home-mobile.png",
        ] {
            fs::write(dir.join(name), b"png").unwrap();
        }

        let removed =
            clear_artifacts(tmp.path(), "spec", Viewport::Tablet, "acme", "home").unwrap();
        assert_eq!(removed, 1);
        assert!(dir.join("original-acme-home-desktop.png").exists());
        assert!(!dir.join("original-acme-home-tablet.png").exists());
        assert!(dir.join("original-acme-home-mobile.png").exists());
    }

    #[test]
    fn test_clear_artifacts_scoped_to_brand() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_compare_dir(tmp.path(), "spec").unwrap();
        fs::write(dir.join("diff-acme-home-mobile.png"), b"png").unwrap();
        fs::write(dir.join("diff-other-home-mobile.png"), b"png").unwrap();

        let removed =
            clear_artifacts(tmp.path(), "spec", Viewport::Mobile, "acme", "home").unwrap();
        assert_eq!(removed, 1);
        assert!(dir.join("diff-other-home-mobile.png").exists());
    }

    #[test]
    fn test_clear_artifacts_viewport_fallback_pattern() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_compare_dir(tmp.path(), "spec").unwrap();
        fs::write(dir.join("original-acme-home-mobile.png"), b"png").unwrap();
        fs::write(dir.join("original-acme-home-desktop.png"), b"png").unwrap();

        // Empty brand/page type falls back to matching the viewport alone.
        let removed = clear_artifacts(tmp.path(), "spec", Viewport::Mobile, "", "").unwrap();
        assert_eq!(removed, 1);
        assert!(dir.join("original-acme-home-desktop.png").exists());
    }

    #[test]
    fn test_clear_artifacts_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let removed =
            clear_artifacts(tmp.path(), "spec", Viewport::Desktop, "acme", "home").unwrap();
        assert_eq!(removed, 0);
        assert!(compare_dir(tmp.path(), "spec").is_dir());
    }

    #[test]
    fn test_clear_artifacts_ignores_non_png() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ensure_compare_dir(tmp.path(), "spec").unwrap();
        fs::write(dir.join("notes-acme-home-mobile.txt"), b"keep").unwrap();

        let removed =
            clear_artifacts(tmp.path(), "spec", Viewport::Mobile, "acme", "home").unwrap();
        assert_eq!(removed, 0);
        assert!(dir.join("notes-acme-home-mobile.txt").exists());
    }
}
