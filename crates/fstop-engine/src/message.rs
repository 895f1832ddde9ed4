//! The request/response message shape at the engine boundary.
//!
//! The UI/store layer talks to the engine exclusively through these types:
//! a request carries a correlation id, an asset identity, and one operation;
//! the response echoes the id so the receiver can discard anything that was
//! superseded while in flight.
//!
//! Parameters arrive unvalidated (normalized floats, filter names) and are
//! checked at submission, before any work is dispatched.

use std::fmt;

use serde::{Deserialize, Serialize};

use fstop_core::decode::SourceFormat;
use fstop_core::transform::{CropRect, InterpolationFilter, RotationSpec, ValidationError};
use fstop_core::{Adjustments, ClippingMap, Histogram, PixelBuffer, ToneCurve};

use crate::error::EngineError;

/// Monotonically increasing correlation id, unique per engine instance.
pub type RequestId = u64;

/// Opaque identity of the asset an edit applies to.
///
/// The engine never interprets this beyond equality and hashing; it is
/// whatever key the catalog layer uses for the photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Unvalidated crop parameters as they arrive over the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropParams {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropParams {
    /// Validate into a [`CropRect`].
    pub fn validate(&self) -> Result<CropRect, ValidationError> {
        CropRect::new(self.left, self.top, self.width, self.height)
    }
}

/// Unvalidated rotation parameters as they arrive over the boundary.
///
/// The filter travels as its protocol name (`"nearest"`, `"bilinear"`,
/// `"lanczos3"`); unknown names are rejected at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationParams {
    pub angle_degrees: f64,
    pub filter: String,
}

impl RotationParams {
    pub fn new(angle_degrees: f64, filter: &str) -> Self {
        Self {
            angle_degrees,
            filter: filter.to_string(),
        }
    }

    /// Validate into a [`RotationSpec`].
    pub fn validate(&self) -> Result<RotationSpec, ValidationError> {
        let filter = InterpolationFilter::from_name(&self.filter)?;
        Ok(RotationSpec::new(self.angle_degrees, filter))
    }
}

/// Pixel source for a full edit render.
#[derive(Debug, Clone)]
pub enum EditSource {
    /// Encoded bytes that need decoding first.
    Encoded { bytes: Vec<u8>, format: SourceFormat },
    /// An already-decoded buffer, transferred into the engine.
    Pixels(PixelBuffer),
}

/// One operation the engine can execute for an asset.
#[derive(Debug, Clone)]
pub enum EditOp {
    /// Decode encoded bytes into a pixel buffer.
    Decode { bytes: Vec<u8>, format: SourceFormat },
    /// Rotate around the image center, expanding the canvas.
    ApplyRotation {
        buffer: PixelBuffer,
        rotation: RotationParams,
    },
    /// Crop with normalized coordinates.
    ApplyCrop {
        buffer: PixelBuffer,
        crop: CropParams,
    },
    /// Apply the tonal adjustment chain.
    ApplyAdjustments {
        buffer: PixelBuffer,
        adjustments: Adjustments,
    },
    /// Apply a tone curve.
    ApplyToneCurve {
        buffer: PixelBuffer,
        curve: ToneCurve,
    },
    /// Compute histogram and clipping map.
    ComputeHistogram { buffer: PixelBuffer },
    /// The full per-edit pipeline: decode (if needed), combined
    /// rotate+crop, preview downscale, adjustments, tone curve, analysis.
    RenderEdit {
        source: EditSource,
        rotation: Option<RotationParams>,
        crop: Option<CropParams>,
        adjustments: Adjustments,
        curve: ToneCurve,
        /// Downscale the transformed image to fit this edge before the
        /// tonal stages, keeping interactive renders cheap.
        preview_max_edge: Option<u32>,
    },
}

impl EditOp {
    /// Check every parameter that can be rejected without touching pixels.
    ///
    /// Runs at submission so invalid requests never reach a worker.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EditOp::ApplyRotation { rotation, .. } => {
                rotation.validate()?;
            }
            EditOp::ApplyCrop { crop, .. } => {
                crop.validate()?;
            }
            EditOp::RenderEdit { rotation, crop, .. } => {
                if let Some(rotation) = rotation {
                    rotation.validate()?;
                }
                if let Some(crop) = crop {
                    crop.validate()?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Boundary-protocol name of the stage, for logs and error context.
    pub fn stage_name(&self) -> &'static str {
        match self {
            EditOp::Decode { .. } => "decode",
            EditOp::ApplyRotation { .. } => "apply-rotation",
            EditOp::ApplyCrop { .. } => "apply-crop",
            EditOp::ApplyAdjustments { .. } => "apply-adjustments",
            EditOp::ApplyToneCurve { .. } => "apply-tone-curve",
            EditOp::ComputeHistogram { .. } => "compute-histogram",
            EditOp::RenderEdit { .. } => "render-edit",
        }
    }
}

/// Histogram and clipping results for one analysis pass.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub histogram: Histogram,
    pub clipping: ClippingMap,
    /// OR of all pixels' shadow bits.
    pub has_shadow_clip: bool,
    /// OR of all pixels' highlight bits.
    pub has_highlight_clip: bool,
}

/// Successful result of an [`EditOp`].
#[derive(Debug, Clone)]
pub enum EditOutcome {
    /// A transformed or decoded image.
    Image(PixelBuffer),
    /// Analysis of an unchanged image.
    Analysis(AnalysisReport),
    /// A full render: displayable image plus its analysis.
    Rendered {
        image: PixelBuffer,
        analysis: AnalysisReport,
    },
}

/// Response delivered for a request, tagged with the same correlation id.
#[derive(Debug)]
pub struct Response {
    pub id: RequestId,
    pub asset: AssetId,
    pub outcome: Result<EditOutcome, EngineError>,
}

/// Lifecycle of a request inside the engine.
///
/// `Superseded` is terminal and entered as soon as a newer request for the
/// same asset is issued; the superseded computation may still run, but its
/// response is discarded on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Queued,
    Decoding,
    Transforming,
    Adjusting,
    Analyzing,
    Delivered,
    Superseded,
}
