//! Row-stride alignment for texture↔buffer copies.
//!
//! GPU texture-to-buffer copies require `bytes_per_row` to be a multiple of
//! 256 (`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`) on every supported backend.
//! Violating it is a hard device-level validation failure, not something
//! recoverable in software, so every boundary crossing goes through this
//! module: buffers are sized with [`align_row_stride`] before the copy and
//! the padding is removed with [`strip_padding`] before a buffer re-enters
//! the pipeline.

use fstop_core::PixelBuffer;

use super::ComputeBackendError;

/// Required row-stride alignment for texture-to-buffer copies, in bytes.
pub const ROW_STRIDE_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Round a natural row size up to the smallest aligned stride.
///
/// `align_row_stride(n) == ceil(n / 256) * 256`.
#[inline]
pub fn align_row_stride(natural_bytes_per_row: u32) -> u32 {
    natural_bytes_per_row.div_ceil(ROW_STRIDE_ALIGN) * ROW_STRIDE_ALIGN
}

/// Total size in bytes of a padded readback buffer for the given image size.
#[inline]
pub fn padded_len(width: u32, height: u32) -> usize {
    align_row_stride(width * 4) as usize * height as usize
}

/// Expand a tightly packed buffer into one with aligned row strides.
///
/// Returns the padded bytes and the stride used. Padding bytes are zero.
pub fn pad_rows(image: &PixelBuffer) -> (Vec<u8>, u32) {
    let natural = image.bytes_per_row() as usize;
    let aligned = align_row_stride(image.bytes_per_row()) as usize;

    let mut padded = vec![0u8; aligned * image.height as usize];
    for row in 0..image.height as usize {
        let src = row * natural;
        let dst = row * aligned;
        padded[dst..dst + natural].copy_from_slice(&image.pixels[src..src + natural]);
    }

    (padded, aligned as u32)
}

/// Remove per-row padding from a readback buffer.
///
/// Copies each row's real `width * 4` bytes into a tightly packed
/// [`PixelBuffer`]. When the stride already equals the natural row size
/// this degenerates to an identity copy.
///
/// # Errors
///
/// `ComputeBackendError::AlignmentViolation` when the stride is not a
/// multiple of the required alignment, is smaller than the natural row
/// size, or the padded buffer is too small for the stated layout.
pub fn strip_padding(
    padded: &[u8],
    width: u32,
    height: u32,
    aligned_bytes_per_row: u32,
) -> Result<PixelBuffer, ComputeBackendError> {
    let natural = width * 4;

    if aligned_bytes_per_row % ROW_STRIDE_ALIGN != 0 || aligned_bytes_per_row < natural {
        return Err(ComputeBackendError::AlignmentViolation {
            bytes_per_row: aligned_bytes_per_row,
            natural,
        });
    }

    let stride = aligned_bytes_per_row as usize;
    if padded.len() < stride * height as usize {
        return Err(ComputeBackendError::AlignmentViolation {
            bytes_per_row: aligned_bytes_per_row,
            natural,
        });
    }

    let natural = natural as usize;
    let mut pixels = vec![0u8; natural * height as usize];
    for row in 0..height as usize {
        let src = row * stride;
        let dst = row * natural;
        pixels[dst..dst + natural].copy_from_slice(&padded[src..src + natural]);
    }

    Ok(PixelBuffer::new(width, height, pixels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterned(width: u32, height: u32) -> PixelBuffer {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for i in 0..(width * height * 4) {
            pixels.push((i % 251) as u8);
        }
        PixelBuffer::new(width, height, pixels)
    }

    #[test]
    fn test_align_row_stride() {
        assert_eq!(align_row_stride(1), 256);
        assert_eq!(align_row_stride(255), 256);
        assert_eq!(align_row_stride(256), 256);
        assert_eq!(align_row_stride(257), 512);
        assert_eq!(align_row_stride(1024), 1024);
    }

    #[test]
    fn test_align_3017px_row() {
        // 3017 px * 4 bytes = 12068 natural -> 12288 aligned
        assert_eq!(align_row_stride(3017 * 4), 12288);
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(64, 10), 256 * 10); // 256 natural, already aligned
        assert_eq!(padded_len(65, 10), 512 * 10);
    }

    #[test]
    fn test_round_trip_unaligned_width() {
        let img = patterned(3017, 2);
        let (padded, stride) = pad_rows(&img);

        assert_eq!(stride, 12288);
        assert_eq!(padded.len(), 12288 * 2);

        let back = strip_padding(&padded, 3017, 2, stride).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_round_trip_aligned_width_is_noop_stride() {
        // 64 px * 4 = 256 bytes: natural stride is already aligned
        let img = patterned(64, 3);
        let (padded, stride) = pad_rows(&img);

        assert_eq!(stride, img.bytes_per_row());
        assert_eq!(padded, img.pixels);

        let back = strip_padding(&padded, 64, 3, stride).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_round_trip_tiny_image() {
        let img = patterned(1, 1);
        let (padded, stride) = pad_rows(&img);
        assert_eq!(stride, 256);
        let back = strip_padding(&padded, 1, 1, stride).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn test_strip_rejects_unaligned_stride() {
        let padded = vec![0u8; 300 * 2];
        let result = strip_padding(&padded, 64, 2, 300);
        assert!(matches!(
            result,
            Err(ComputeBackendError::AlignmentViolation { .. })
        ));
    }

    #[test]
    fn test_strip_rejects_stride_below_natural() {
        // 100 px needs 400 bytes; 256 is aligned but too small
        let padded = vec![0u8; 256 * 2];
        let result = strip_padding(&padded, 100, 2, 256);
        assert!(matches!(
            result,
            Err(ComputeBackendError::AlignmentViolation { .. })
        ));
    }

    #[test]
    fn test_strip_rejects_short_buffer() {
        let padded = vec![0u8; 256];
        let result = strip_padding(&padded, 1, 2, 256);
        assert!(matches!(
            result,
            Err(ComputeBackendError::AlignmentViolation { .. })
        ));
    }

    #[test]
    fn test_padding_bytes_are_ignored() {
        let img = patterned(2, 2);
        let (mut padded, stride) = pad_rows(&img);
        // Scribble over the padding region; the strip must not care
        for b in padded[8..256].iter_mut() {
            *b = 0xEE;
        }
        let back = strip_padding(&padded, 2, 2, stride).unwrap();
        assert_eq!(back, img);
    }
}
