//! Format-dispatched decoding of uploads into the canonical raster.
//!
//! Every supported format lands in the same place: an 8-bit RGBA
//! [`image::RgbaImage`] whose visual "up" is up, no matter what the camera
//! wrote into the container. Format quirks stay inside this module.

use super::{hdr, orientation};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use thiserror::Error;

/// Upload extensions the service accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["dng", "exr", "png", "jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Image(String),
    #[error("EXR decode failed: {0}")]
    Exr(String),
    #[error("RAW decode failed: {0}")]
    Raw(String),
    #[error("RAW decoding support is not compiled in (enable the `raw` feature)")]
    RawUnavailable,
}

/// Extract the lowercased extension from a client filename if it is one of
/// [`ALLOWED_EXTENSIONS`]. Filenames without a dot are rejected.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Decode a stored upload into the canonical raster.
///
/// The extension is the one declared at upload time, not re-sniffed from the
/// file. Unknown extensions fall back to the standard codec path, which
/// covers renamed PNGs and JPEGs.
pub fn decode_any(path: &Path, ext: &str) -> Result<RgbaImage, DecodeError> {
    match ext {
        "dng" => decode_raw(path),
        "exr" => hdr::decode_exr(path),
        _ => decode_standard(path),
    }
}

/// PNG/JPEG path: standard codec decode, EXIF orientation transform, RGBA.
fn decode_standard(path: &Path) -> Result<RgbaImage, DecodeError> {
    let bytes = std::fs::read(path)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| DecodeError::Image(format!("Failed to decode {}: {e}", path.display())))?;
    let tag = orientation::exif_orientation(&bytes);
    Ok(orientation::apply_orientation(img, tag).to_rgba8())
}

/// DNG path: demosaic with camera white balance and a fixed output curve,
/// 8 bits per channel, no automatic brightness scaling.
#[cfg(feature = "raw")]
fn decode_raw(path: &Path) -> Result<RgbaImage, DecodeError> {
    let developed = imagepipe::simple_decode_8bit(path, 0, 0).map_err(DecodeError::Raw)?;
    let rgb = image::RgbImage::from_raw(
        developed.width as u32,
        developed.height as u32,
        developed.data,
    )
    .ok_or_else(|| DecodeError::Raw("developed buffer size mismatch".into()))?;
    Ok(DynamicImage::ImageRgb8(rgb).to_rgba8())
}

#[cfg(not(feature = "raw"))]
fn decode_raw(_path: &Path) -> Result<RgbaImage, DecodeError> {
    Err(DecodeError::RawUnavailable)
}
