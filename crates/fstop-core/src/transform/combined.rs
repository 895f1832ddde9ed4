//! The combined rotate+crop pass.
//!
//! When an edit carries both a rotation and a crop, materializing the full
//! rotated canvas just to throw most of it away is wasted work. This pass
//! inverse-maps only the destination pixels that survive the crop, while
//! producing output pixel-identical to rotating first and cropping second.
//!
//! The equivalence holds because the crop window and the per-pixel sampling
//! share their implementations with [`apply_crop`] and [`apply_rotation`]:
//! the same destination coordinate always produces the same sample.

use super::crop::{apply_crop, CropRect};
use super::rotation::{compute_rotated_bounds, sample, InverseRotation};
use super::RotationSpec;
use crate::buffer::PixelBuffer;

/// Apply rotation and crop as one pass.
///
/// Rotation is always applied before crop; the crop rectangle is interpreted
/// against the *rotated* canvas. With a zero angle and no crop this is an
/// identity transform returning a content-equal buffer.
pub fn transform(
    image: &PixelBuffer,
    rotation: &RotationSpec,
    crop: Option<&CropRect>,
) -> PixelBuffer {
    if rotation.is_identity() {
        return match crop {
            None => image.clone(),
            Some(rect) => apply_crop(image, rect),
        };
    }

    let (rot_w, rot_h) = compute_rotated_bounds(image.width, image.height, rotation.angle_degrees);
    let map = InverseRotation::new(image.width, image.height, rot_w, rot_h, rotation.angle_degrees);

    let win = crop
        .map(|rect| rect.pixel_window(rot_w, rot_h))
        .unwrap_or(super::crop::PixelWindow {
            left: 0,
            top: 0,
            width: rot_w,
            height: rot_h,
        });

    let mut output = vec![0u8; win.width as usize * win.height as usize * 4];

    for out_y in 0..win.height {
        for out_x in 0..win.width {
            // Position of this output pixel on the rotated canvas
            let dst_x = win.left + out_x;
            let dst_y = win.top + out_y;

            let (src_x, src_y) = map.source_pos(dst_x, dst_y);
            let pixel = sample(image, src_x, src_y, rotation.filter);

            let idx = (out_y as usize * win.width as usize + out_x as usize) * 4;
            output[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    PixelBuffer {
        width: win.width,
        height: win.height,
        pixels: output,
    }
}
