//! Black-box solar analysis hooks.
//!
//! The three algorithms — hemispherical orientation render, sky
//! segmentation, energy forecast — are supplied by a separate component.
//! This module owns only their boundary: the [`SkyEngine`] trait, the
//! parameter/result types, and the distinction between "no implementation
//! bound" and "implementation blew up". The gateway dispatches on whichever
//! variant is wired in at startup; absence is a value, never a panic.
//!
//! The shipped variant is [`UnimplementedEngine`], which reports every hook
//! as unsupported and lets the HTTP layer apply its documented fallbacks.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Camera orientation in degrees. No range constraints are imposed; absent
/// request fields default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrientationAngles {
    pub azimuth: f64,
    pub zenith: f64,
    pub roll: f64,
}

/// A user click in canvas-normalized coordinates: each axis in [0,1]
/// relative to the preview width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AperturePoint {
    pub x: f64,
    pub y: f64,
}

/// Geographic site attached to a forecast, when the model knows one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub lat: f64,
    pub lon: f64,
}

/// Result of the energy forecast hook. Optional fields are permitted and
/// omitted from the JSON payload when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub annual_kwh: f64,
    pub unit: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<Site>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// No implementation is bound for this hook. Expected absence — the
    /// gateway maps it to a fallback (or 501 for forecasts), not a 500.
    #[error("not implemented")]
    NotSupported,
    /// The bound implementation failed.
    #[error("{0}")]
    Failed(String),
}

/// Strategy interface for the algorithm hooks.
///
/// Implementations are synchronous and called once per request; outputs must
/// be deterministic for identical inputs.
pub trait SkyEngine: Send + Sync {
    /// Project the preview as seen from the given orientation. Output is a
    /// square image sized for the UI canvas.
    fn orientation_render(
        &self,
        image: &RgbaImage,
        angles: OrientationAngles,
    ) -> Result<RgbaImage, EngineError>;

    /// Segment the visible sky bounded by three aperture clicks. Output is
    /// an RGBA mask with the same dimensions as the input: sky pixels
    /// opaque, everything else transparent.
    fn sky_segment(
        &self,
        image: &RgbaImage,
        points: &[AperturePoint; 3],
    ) -> Result<RgbaImage, EngineError>;

    /// Forecast annual solar energy for the scene. Points are passed through
    /// as supplied for aperture context.
    fn forecast_energy(
        &self,
        image: &RgbaImage,
        angles: OrientationAngles,
        points: &[AperturePoint],
    ) -> Result<ForecastReport, EngineError>;
}

/// The "nothing is bound" strategy variant: every hook reports
/// [`EngineError::NotSupported`].
pub struct UnimplementedEngine;

impl SkyEngine for UnimplementedEngine {
    fn orientation_render(
        &self,
        _image: &RgbaImage,
        _angles: OrientationAngles,
    ) -> Result<RgbaImage, EngineError> {
        Err(EngineError::NotSupported)
    }

    fn sky_segment(
        &self,
        _image: &RgbaImage,
        _points: &[AperturePoint; 3],
    ) -> Result<RgbaImage, EngineError> {
        Err(EngineError::NotSupported)
    }

    fn forecast_energy(
        &self,
        _image: &RgbaImage,
        _angles: OrientationAngles,
        _points: &[AperturePoint],
    ) -> Result<ForecastReport, EngineError> {
        Err(EngineError::NotSupported)
    }
}
