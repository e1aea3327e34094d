//! Pixel-level diffing of two raster captures.
//!
//! Compares on luminance by default (color drift between rendering
//! environments is noise for layout regressions) and produces a diff raster
//! that shows differing pixels in red over a dimmed grayscale base. Images of
//! unequal dimensions are compared over the union canvas, with pixels outside
//! either image counted as mismatched.

use image::{Rgba, RgbaImage};
use std::path::Path;

/// Result type for diff operations
pub type DiffResult<T> = Result<T, DiffError>;

/// Error types for diff operations
#[derive(Debug)]
pub enum DiffError {
    /// Image could not be decoded
    Decode(String),

    /// Image could not be encoded/written
    Encode(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for DiffError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffError::Decode(msg) => write!(f, "Decode error: {}", msg),
            DiffError::Encode(msg) => write!(f, "Encode error: {}", msg),
            DiffError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiffError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiffError {
    fn from(err: std::io::Error) -> Self {
        DiffError::Io(err)
    }
}

/// Configuration for pixel diffing
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Compare luminance only, ignoring hue differences
    pub ignore_colors: bool,
    /// Per-channel (or luma) tolerance before a pixel counts as different
    pub tolerance: u8,
    /// Whether to build the diff raster
    pub generate_diff_image: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            ignore_colors: true,
            tolerance: 0,
            generate_diff_image: true,
        }
    }
}

/// Outcome of diffing two images
#[derive(Debug, Clone)]
pub struct PixelDiff {
    /// Percentage of differing pixels over the union canvas (0.0-100.0)
    pub mismatch_percent: f64,
    /// Total pixels compared
    pub total_pixels: u64,
    /// Pixels that differ
    pub different_pixels: u64,
    /// Whether both images had identical dimensions
    pub dimensions_match: bool,
    /// Diff raster (red highlights over dimmed grayscale), if generated
    pub diff_image: Option<RgbaImage>,
}

fn luma(px: &Rgba<u8>) -> f64 {
    0.2126 * f64::from(px[0]) + 0.7152 * f64::from(px[1]) + 0.0722 * f64::from(px[2])
}

fn pixels_differ(a: &Rgba<u8>, b: &Rgba<u8>, config: &DiffConfig) -> bool {
    let tolerance = f64::from(config.tolerance);
    if config.ignore_colors {
        (luma(a) - luma(b)).abs() > tolerance
    } else {
        let dr = (i16::from(a[0]) - i16::from(b[0])).unsigned_abs();
        let dg = (i16::from(a[1]) - i16::from(b[1])).unsigned_abs();
        let db = (i16::from(a[2]) - i16::from(b[2])).unsigned_abs();
        u16::from(config.tolerance) < dr.max(dg).max(db)
    }
}

/// Compare two images and compute the mismatch percentage plus diff raster.
pub fn diff_images(baseline: &RgbaImage, candidate: &RgbaImage, config: &DiffConfig) -> PixelDiff {
    let width = baseline.width().max(candidate.width());
    let height = baseline.height().max(candidate.height());
    let dimensions_match = baseline.dimensions() == candidate.dimensions();
    let total_pixels = u64::from(width) * u64::from(height);

    let mut diff_image = if config.generate_diff_image {
        Some(RgbaImage::new(width, height))
    } else {
        None
    };

    let mut different_pixels = 0u64;

    for y in 0..height {
        for x in 0..width {
            let base_px = baseline.get_pixel_checked(x, y);
            let cand_px = candidate.get_pixel_checked(x, y);

            let is_different = match (base_px, cand_px) {
                (Some(a), Some(b)) => pixels_differ(a, b, config),
                // Outside one image: size drift counts as mismatch.
                _ => true,
            };

            if is_different {
                different_pixels += 1;
            }

            if let Some(ref mut diff) = diff_image {
                let out = if is_different {
                    Rgba([255, 0, 0, 255])
                } else {
                    let reference = base_px.or(cand_px).copied().unwrap_or(Rgba([0, 0, 0, 255]));
                    let gray = (luma(&reference) * 0.4) as u8;
                    Rgba([gray, gray, gray, 255])
                };
                diff.put_pixel(x, y, out);
            }
        }
    }

    let mismatch_percent = if total_pixels > 0 {
        (different_pixels as f64 / total_pixels as f64) * 100.0
    } else {
        0.0
    };

    PixelDiff {
        mismatch_percent,
        total_pixels,
        different_pixels,
        dimensions_match,
        diff_image,
    }
}

/// Load a PNG from disk into an RGBA image.
pub fn load_png(path: &Path) -> DiffResult<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| DiffError::Decode(format!("failed to open {}: {}", path.display(), e)))?;
    Ok(img.to_rgba8())
}

/// Write an RGBA image to disk as PNG.
pub fn save_png(img: &RgbaImage, path: &Path) -> DiffResult<()> {
    img.save(path)
        .map_err(|e| DiffError::Encode(format!("failed to write {}: {}", path.display(), e)))
}
