//! Image resizing for preview generation.
//!
//! Previews are what the editor actually displays; the full buffer only
//! exists for export. Both functions return new `PixelBuffer`s without
//! modifying the input.

use super::DecodeError;
use crate::buffer::PixelBuffer;
use crate::transform::InterpolationFilter;

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::CorruptData` if the source buffer is malformed or
/// the target dimensions are zero.
pub fn resize(
    image: &PixelBuffer,
    width: u32,
    height: u32,
    filter: InterpolationFilter,
) -> Result<PixelBuffer, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::CorruptData(
            "resize target has zero dimension".to_string(),
        ));
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgba_image = image
        .to_rgba_image()
        .ok_or_else(|| DecodeError::CorruptData("pixel buffer length mismatch".to_string()))?;

    let resized = image::imageops::resize(&rgba_image, width, height, filter.to_image_filter());

    Ok(PixelBuffer::from_rgba_image(resized))
}

/// Resize an image to fit within a maximum edge length, preserving aspect
/// ratio. Images already inside the bound are returned unchanged.
pub fn resize_to_fit(
    image: &PixelBuffer,
    max_edge: u32,
    filter: InterpolationFilter,
) -> Result<PixelBuffer, DecodeError> {
    if max_edge == 0 {
        return Err(DecodeError::CorruptData(
            "resize bound of zero".to_string(),
        ));
    }

    let (src_width, src_height) = (image.width, image.height);

    if src_width <= max_edge && src_height <= max_edge {
        return Ok(image.clone());
    }

    let (new_width, new_height) = calculate_fit_dimensions(src_width, src_height, max_edge);

    resize(image, new_width, new_height, filter)
}

/// Calculate dimensions to fit within max_edge while preserving aspect ratio.
fn calculate_fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = width as f64 / height as f64;

    if width >= height {
        let new_width = max_edge;
        let new_height = ((max_edge as f64 / ratio).round() as u32).max(1);
        (new_width, new_height)
    } else {
        let new_height = max_edge;
        let new_width = ((max_edge as f64 * ratio).round() as u32).max(1);
        (new_width, new_height)
    }
}
