//! EXIF orientation handling for PNG/JPEG uploads.
//!
//! The canonical raster is always visual-up: the stored orientation tag is
//! read from the container bytes and the matching transpose is applied
//! exactly once, before any resize or hook sees the pixels.

use image::DynamicImage;
use std::io::Cursor;

/// Read the EXIF Orientation tag (1-8) from raw container bytes.
///
/// Returns 1 (upright) when there is no EXIF segment, no orientation field,
/// or a malformed value. JPEG is the common carrier; the reader also handles
/// the PNG eXIf chunk, so the same path serves both upload formats.
pub fn exif_orientation(container_bytes: &[u8]) -> u16 {
    let mut cursor = Cursor::new(container_bytes);
    match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(|v| v as u16)
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Apply an EXIF orientation value so the result is visually upright.
///
/// Mapping per the EXIF spec:
/// - 1 = upright, nothing to do
/// - 2 = mirrored horizontally
/// - 3 = rotated 180
/// - 4 = mirrored vertically
/// - 5 = mirrored, on its side
/// - 6 = rotated 90 CW
/// - 7 = mirrored, on its far side
/// - 8 = rotated 270 CW
///
/// 0 is invalid but relatively common in the wild; it and any out-of-range
/// value are treated as upright.
pub fn apply_orientation(img: DynamicImage, orientation: u16) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
