//! Preview sizing: aspect-preserving shrink to a bounded canvas.
//!
//! Every downstream operation (render, segment, forecast) works on the
//! preview, never the original upload, so the bound here caps the pixel
//! count for the whole request path. Shrink only — a small upload keeps its
//! native size.

use image::RgbaImage;
use image::imageops::FilterType;

/// Default maximum edge for generated previews, in pixels.
pub const DEFAULT_MAX_EDGE: u32 = 1024;

/// Calculate the shrink-to-fit dimensions for a source raster.
///
/// Both output edges are ≤ `max_edge`, aspect ratio preserved within
/// rounding, and never enlarged. Degenerate rounding to zero is pinned to 1.
pub fn fit_dimensions(source: (u32, u32), max_edge: u32) -> (u32, u32) {
    let (w, h) = source;
    let longer = w.max(h);
    if longer <= max_edge {
        return (w, h);
    }
    let ratio = max_edge as f64 / longer as f64;
    (
        ((w as f64 * ratio).round() as u32).max(1),
        ((h as f64 * ratio).round() as u32).max(1),
    )
}

/// Downsample a canonical raster so both edges fit within `max_edge`,
/// using Lanczos3. Returns a clone when no resize is needed.
pub fn shrink_to_fit(img: &RgbaImage, max_edge: u32) -> RgbaImage {
    let (w, h) = fit_dimensions(img.dimensions(), max_edge);
    if (w, h) == img.dimensions() {
        return img.clone();
    }
    image::imageops::resize(img, w, h, FilterType::Lanczos3)
}
