//! Viewport presets for regression runs.
//!
//! The three viewport classes are fixed by the test suite, not derived at
//! runtime. Each class carries its own settle delay: wider layouts load more
//! content and need a longer wait before they can be considered stable.

use serde::{Deserialize, Serialize};

/// A viewport class with fixed dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewport {
    Desktop,
    Tablet,
    Mobile,
}

impl Viewport {
    /// All viewport classes in run order.
    pub const ALL: [Viewport; 3] = [Viewport::Desktop, Viewport::Tablet, Viewport::Mobile];

    /// The viewport name used in artifact file names.
    ///
    /// Drawn from a fixed enum, so it is never sanitized.
    pub const fn name(self) -> &'static str {
        match self {
            Viewport::Desktop => "desktop",
            Viewport::Tablet => "tablet",
            Viewport::Mobile => "mobile",
        }
    }

    /// Browser window dimensions (width, height) in pixels.
    pub const fn dimensions(self) -> (u32, u32) {
        match self {
            Viewport::Desktop => (1280, 800),
            Viewport::Tablet => (768, 1024),
            Viewport::Mobile => (375, 667),
        }
    }

    /// Fixed settle delay after navigation, in milliseconds.
    ///
    /// Tablet layouts get the longest delay: at that width many sites serve
    /// the desktop asset set into a narrower, slower-settling layout.
    pub const fn settle_delay_ms(self) -> u64 {
        match self {
            Viewport::Desktop => 6000,
            Viewport::Tablet => 8000,
            Viewport::Mobile => 5000,
        }
    }

    /// Parse a viewport name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "desktop" => Some(Viewport::Desktop),
            "tablet" => Some(Viewport::Tablet),
            "mobile" => Some(Viewport::Mobile),
            _ => None,
        }
    }
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_names() {
        assert_eq!(Viewport::Desktop.name(), "desktop");
        assert_eq!(Viewport::Tablet.name(), "tablet");
        assert_eq!(Viewport::Mobile.name(), "mobile");
    }

    #[test]
    fn test_viewport_from_name() {
        assert_eq!(Viewport::from_name("tablet"), Some(Viewport::Tablet));
        assert_eq!(Viewport::from_name("MOBILE"), Some(Viewport::Mobile));
        assert_eq!(Viewport::from_name("watch"), None);
    }

    #[test]
    fn test_viewport_dimensions() {
        assert_eq!(Viewport::Desktop.dimensions(), (1280, 800));
        assert_eq!(Viewport::Tablet.dimensions(), (768, 1024));
        assert_eq!(Viewport::Mobile.dimensions(), (375, 667));
    }

    #[test]
    fn test_tablet_has_longest_settle_delay() {
        assert!(Viewport::Tablet.settle_delay_ms() > Viewport::Desktop.settle_delay_ms());
        assert!(Viewport::Tablet.settle_delay_ms() > Viewport::Mobile.settle_delay_ms());
    }
}
