//! Image ingestion — every upload becomes the same canonical raster.
//!
//! | Input | Path |
//! |---|---|
//! | **PNG / JPEG** | `image` crate decode + EXIF orientation transform |
//! | **DNG** | `imagepipe` demosaic (camera WB, fixed curve, 8-bit), behind the `raw` feature |
//! | **EXR** | `exr` decode at f32 + percentile exposure tone-mapping |
//! | **anything else** | PNG/JPEG path as a fallback |
//!
//! The module guarantees the output is always 8-bit RGBA with visual-up
//! orientation. The split:
//! - **decode**: extension dispatch and the standard/RAW paths
//! - **orientation**: EXIF tag read + the 8-case transpose
//! - **hdr**: EXR reading and the tone-mapping math (pure, unit testable)
//! - **preview**: bounded aspect-preserving shrink for persisted previews

pub mod decode;
pub mod hdr;
pub mod orientation;
pub mod preview;

pub use decode::{ALLOWED_EXTENSIONS, DecodeError, allowed_extension, decode_any};
pub use preview::{DEFAULT_MAX_EDGE, fit_dimensions, shrink_to_fit};
