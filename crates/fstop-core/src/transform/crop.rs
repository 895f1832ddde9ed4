//! Image cropping with validated, normalized coordinates.
//!
//! Crop rectangles are expressed in the range 0.0 to 1.0 relative to the
//! image they apply to, making them independent of pixel dimensions. Unlike
//! the rest of the transform parameters, a crop rectangle is validated at
//! construction: the pipeline never sees an out-of-bounds rectangle.
//!
//! # Coordinate System
//!
//! - (0.0, 0.0) = top-left corner
//! - (1.0, 1.0) = bottom-right corner
//! - width/height are relative to the target image's dimensions

use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::buffer::PixelBuffer;

/// A validated crop rectangle in normalized coordinates.
///
/// Invariants, enforced by [`CropRect::new`]: `left >= 0`, `top >= 0`,
/// `width > 0`, `height > 0`, `left + width <= 1`, `top + height <= 1`.
/// The boundary case `left + width == 1.0` is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCrop", into = "RawCrop")]
pub struct CropRect {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

/// Unvalidated serde mirror of [`CropRect`].
#[derive(Serialize, Deserialize)]
struct RawCrop {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RawCrop> for CropRect {
    type Error = ValidationError;

    fn try_from(raw: RawCrop) -> Result<Self, Self::Error> {
        CropRect::new(raw.left, raw.top, raw.width, raw.height)
    }
}

impl From<CropRect> for RawCrop {
    fn from(rect: CropRect) -> Self {
        RawCrop {
            left: rect.left,
            top: rect.top,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl CropRect {
    /// Validate and construct a crop rectangle.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        let finite =
            left.is_finite() && top.is_finite() && width.is_finite() && height.is_finite();
        let in_bounds = left >= 0.0
            && top >= 0.0
            && width > 0.0
            && height > 0.0
            && left + width <= 1.0
            && top + height <= 1.0;

        if !(finite && in_bounds) {
            return Err(ValidationError::InvalidCropRectangle {
                left,
                top,
                width,
                height,
            });
        }

        Ok(Self {
            left,
            top,
            width,
            height,
        })
    }

    /// The whole-image crop.
    pub fn full() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// True when this crop keeps the entire image.
    pub fn is_full(&self) -> bool {
        self.left <= 0.0 && self.top <= 0.0 && self.width >= 1.0 && self.height >= 1.0
    }

    /// Resolve the rectangle to a pixel window on a concrete image size.
    ///
    /// Rounding can land a border exactly on the image edge, so the window
    /// is clamped to the image and never collapses below 1x1.
    pub(crate) fn pixel_window(&self, img_width: u32, img_height: u32) -> PixelWindow {
        let w = img_width as f64;
        let h = img_height as f64;

        let px_left = (self.left * w).round() as u32;
        let px_top = (self.top * h).round() as u32;
        let px_width = (self.width * w).round() as u32;
        let px_height = (self.height * h).round() as u32;

        let px_left = px_left.min(img_width.saturating_sub(1));
        let px_top = px_top.min(img_height.saturating_sub(1));
        let px_right = (px_left + px_width).min(img_width);
        let px_bottom = (px_top + px_height).min(img_height);

        PixelWindow {
            left: px_left,
            top: px_top,
            width: px_right.saturating_sub(px_left).max(1),
            height: px_bottom.saturating_sub(px_top).max(1),
        }
    }
}

/// A crop rectangle resolved to pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PixelWindow {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Apply a crop to an image.
///
/// Returns a new `PixelBuffer` containing only the cropped region. A full
/// crop returns a content-equal copy.
pub fn apply_crop(image: &PixelBuffer, rect: &CropRect) -> PixelBuffer {
    // Fast path: full crop returns a clone
    if rect.is_full() {
        return image.clone();
    }

    let win = rect.pixel_window(image.width, image.height);

    let mut output = vec![0u8; win.width as usize * win.height as usize * 4];
    let src_stride = image.width as usize * 4;
    let dst_stride = win.width as usize * 4;

    for y in 0..win.height as usize {
        let src_start = (win.top as usize + y) * src_stride + win.left as usize * 4;
        let dst_start = y * dst_stride;
        output[dst_start..dst_start + dst_stride]
            .copy_from_slice(&image.pixels[src_start..src_start + dst_stride]);
    }

    PixelBuffer {
        width: win.width,
        height: win.height,
        pixels: output,
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
