//! OpenEXR decode and tone-mapping to an 8-bit preview.
//!
//! EXR stores linear-light f32/f16 samples with no upper bound, so getting a
//! displayable raster takes an exposure decision. The pipeline here:
//!
//! 1. Decode all channels at f32 depth (`exr` crate).
//! 2. Reorder named channels to RGB(A); a single-channel source is
//!    replicated across all three color channels.
//! 3. Sanitize: NaN → 0, +∞ → 1, −∞ → 0.
//! 4. Exposure reference = 99.5th percentile of every sample, clamped to a
//!    minimum of 1.0 so division is always safe.
//! 5. Normalize, clip to [0,1], apply inverse display gamma (1/2.2),
//!    quantize to u8.
//!
//! Steps 3-5 are pure functions over flat sample buffers and are unit tested
//! without any files.

use super::decode::DecodeError;
use exr::prelude::*;
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::result::Result;

/// Percentile of all samples used as the exposure reference.
pub const EXPOSURE_PERCENTILE: f32 = 99.5;

/// Display gamma applied after normalization (as 1/gamma exponent).
const DISPLAY_GAMMA: f32 = 2.2;

/// Decode an EXR file into an orientation-neutral 8-bit RGBA raster.
pub fn decode_exr(path: &Path) -> Result<RgbaImage, DecodeError> {
    let exr_image = read_all_flat_layers_from_file(path)
        .map_err(|e| DecodeError::Exr(format!("failed to read {}: {e}", path.display())))?;
    let layer = exr_image
        .layer_data
        .first()
        .ok_or_else(|| DecodeError::Exr("file contains no layers".into()))?;

    let width = layer.size.width();
    let height = layer.size.height();
    let pixel_count = width * height;

    let channels: Vec<(String, Vec<f32>)> = layer
        .channel_data
        .list
        .iter()
        .map(|channel| {
            (
                channel.name.to_string(),
                channel.sample_data.values_as_f32().collect(),
            )
        })
        .collect();

    let (mut flat, has_alpha) = planes_to_interleaved(&channels, pixel_count)?;
    tonemap(&mut flat);

    let stride = if has_alpha { 4 } else { 3 };
    let mut out = RgbaImage::new(width as u32, height as u32);
    for (i, pixel) in out.pixels_mut().enumerate() {
        let base = i * stride;
        let alpha = if has_alpha { quantize(flat[base + 3]) } else { 255 };
        *pixel = Rgba([
            quantize(flat[base]),
            quantize(flat[base + 1]),
            quantize(flat[base + 2]),
            alpha,
        ]);
    }
    Ok(out)
}

/// Assemble named channel planes into an interleaved RGB(A) buffer.
///
/// The exr crate yields channels sorted by name (A, B, G, R), so RGB files
/// are reordered by lookup. A source with a single channel of any name
/// (luminance, depth) is replicated to all three color channels.
fn planes_to_interleaved(
    channels: &[(String, Vec<f32>)],
    pixel_count: usize,
) -> Result<(Vec<f32>, bool), DecodeError> {
    let find = |wanted: &str| {
        channels
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, plane)| plane)
    };

    let (r, g, b) = match (find("R"), find("G"), find("B")) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ if channels.len() == 1 => {
            let only = &channels[0].1;
            (only, only, only)
        }
        _ => {
            let names: Vec<&str> = channels.iter().map(|(n, _)| n.as_str()).collect();
            return Err(DecodeError::Exr(format!(
                "unsupported channel layout: [{}]",
                names.join(", ")
            )));
        }
    };
    let alpha = find("A");

    for plane in [Some(r), Some(g), Some(b), alpha].into_iter().flatten() {
        if plane.len() != pixel_count {
            return Err(DecodeError::Exr(format!(
                "channel has {} samples, expected {pixel_count}",
                plane.len()
            )));
        }
    }

    let stride = if alpha.is_some() { 4 } else { 3 };
    let mut flat = vec![0.0f32; pixel_count * stride];
    for i in 0..pixel_count {
        flat[i * stride] = r[i];
        flat[i * stride + 1] = g[i];
        flat[i * stride + 2] = b[i];
        if let Some(a) = alpha {
            flat[i * stride + 3] = a[i];
        }
    }
    Ok((flat, alpha.is_some()))
}

/// Replace non-finite samples: NaN → 0, +∞ → 1, −∞ → 0.
pub fn sanitize(values: &mut [f32]) {
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        } else if *v == f32::INFINITY {
            *v = 1.0;
        } else if *v == f32::NEG_INFINITY {
            *v = 0.0;
        }
    }
}

/// Percentile with linear interpolation between ranks. Input need not be
/// sorted; an empty slice yields 0.
pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let rank = (pct as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Sanitize, normalize by the exposure reference, clip, and apply display
/// gamma. The reference is clamped to ≥1.0 so division is always defined.
pub fn tonemap(values: &mut [f32]) {
    sanitize(values);
    let reference = percentile(values, EXPOSURE_PERCENTILE).max(1.0);
    for v in values.iter_mut() {
        *v = (*v / reference).clamp(0.0, 1.0).powf(1.0 / DISPLAY_GAMMA);
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        assert!((percentile(&values, 99.5) - 99.5).abs() < 1e-4);
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 100.0);
    }

    #[test]
    fn percentile_of_single_value() {
        assert_eq!(percentile(&[3.5], 99.5), 3.5);
    }

    #[test]
    fn sanitize_replaces_non_finite() {
        let mut values = [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.25];
        sanitize(&mut values);
        assert_eq!(values, [0.0, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn tonemap_constant_half_uses_unit_reference() {
        // p99.5 of a constant 0.5 buffer is 0.5, clamped up to 1.0, so the
        // output is 0.5^(1/2.2).
        let mut values = vec![0.5f32; 64];
        tonemap(&mut values);
        let expected = 0.5f32.powf(1.0 / 2.2);
        for v in values {
            assert!((v - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn tonemap_output_is_finite_and_clipped() {
        let mut values = vec![f32::NAN, f32::INFINITY, -3.0, 2_000_000.0, 0.5];
        tonemap(&mut values);
        for v in values {
            assert!(v.is_finite());
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn single_channel_replicates_to_rgb() {
        let channels = vec![("Y".to_string(), vec![0.25f32; 4])];
        let (flat, has_alpha) = planes_to_interleaved(&channels, 4).unwrap();
        assert!(!has_alpha);
        assert_eq!(flat.len(), 12);
        assert!(flat.iter().all(|&v| v == 0.25));
    }

    #[test]
    fn sorted_channel_names_are_reordered() {
        // exrs sorts alphabetically: B, G, R
        let channels = vec![
            ("B".to_string(), vec![3.0f32]),
            ("G".to_string(), vec![2.0f32]),
            ("R".to_string(), vec![1.0f32]),
        ];
        let (flat, has_alpha) = planes_to_interleaved(&channels, 1).unwrap();
        assert!(!has_alpha);
        assert_eq!(flat, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn alpha_plane_is_carried() {
        let channels = vec![
            ("A".to_string(), vec![0.5f32]),
            ("B".to_string(), vec![3.0f32]),
            ("G".to_string(), vec![2.0f32]),
            ("R".to_string(), vec![1.0f32]),
        ];
        let (flat, has_alpha) = planes_to_interleaved(&channels, 1).unwrap();
        assert!(has_alpha);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 0.5]);
    }

    #[test]
    fn two_unnamed_channels_are_rejected() {
        let channels = vec![
            ("U".to_string(), vec![0.0f32]),
            ("V".to_string(), vec![0.0f32]),
        ];
        assert!(planes_to_interleaved(&channels, 1).is_err());
    }

    #[test]
    fn plane_length_mismatch_is_rejected() {
        let channels = vec![("Y".to_string(), vec![0.0f32; 3])];
        assert!(planes_to_interleaved(&channels, 4).is_err());
    }

    #[test]
    fn decode_written_exr_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("flat.exr");
        write_rgba_file(&path, 4, 3, |_x, _y| (0.5f32, 0.5f32, 0.5f32, 1.0f32)).unwrap();

        let img = decode_exr(&path).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        let expected = (0.5f32.powf(1.0 / 2.2) * 255.0) as u8;
        let px = img.get_pixel(0, 0);
        assert_eq!(px[0], expected);
        assert_eq!(px[1], expected);
        assert_eq!(px[2], expected);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn decode_sanitizes_non_finite_samples() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("wild.exr");
        write_rgba_file(&path, 4, 2, |x, _y| {
            if x == 0 {
                (f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 1.0f32)
            } else {
                (0.5f32, 0.5f32, 0.5f32, 1.0f32)
            }
        })
        .unwrap();

        let img = decode_exr(&path).unwrap();
        let px = img.get_pixel(0, 0);
        // NaN → 0, +∞ → 1 (→ full white after the unit reference), −∞ → 0
        assert_eq!(px[0], 0);
        assert_eq!(px[1], 255);
        assert_eq!(px[2], 0);
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = decode_exr(std::path::Path::new("/nonexistent/sky.exr"));
        assert!(matches!(result, Err(DecodeError::Exr(_))));
    }
}
