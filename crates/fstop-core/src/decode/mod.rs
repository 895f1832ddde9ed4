//! Image decoding pipeline for fstop.
//!
//! This module turns encoded source bytes into [`PixelBuffer`]s:
//! - JPEG and PNG decoding with EXIF orientation correction
//! - Embedded preview extraction from TIFF-based RAW files (fast path)
//! - Full RAW decoding with superpixel demosaicing (quality path)
//! - Resizing for thumbnails and previews
//!
//! # Performance Strategy
//!
//! For RAW files the caller chooses between two paths:
//! - **Fast path**: extract the embedded JPEG preview for immediate display
//! - **Quality path**: decode the sensor mosaic, trading latency for fidelity
//!
//! The choice is explicit in the request ([`RawFidelity`]); the decoder never
//! silently downgrades.

mod jpeg;
mod preview;
mod raw;
mod resize;
mod types;

pub use jpeg::{decode_jpeg, decode_png, get_orientation};
pub use preview::{decode_raw_preview, extract_raw_preview, is_raw_container};
pub use raw::decode_raw_full;
pub use resize::{resize, resize_to_fit};
pub use types::{DecodeError, Orientation, RawFidelity, SourceFormat};

use crate::buffer::PixelBuffer;

const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];
const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];

/// Decode encoded source bytes into a pixel buffer.
///
/// The container magic is checked against the stated `format` before any
/// parsing: a mismatch is an [`DecodeError::UnsupportedFormat`], while a
/// structurally recognized file that fails pixel extraction is
/// [`DecodeError::CorruptData`]. No side effects beyond allocation.
pub fn decode(bytes: &[u8], format: SourceFormat) -> Result<PixelBuffer, DecodeError> {
    match format {
        SourceFormat::Jpeg => {
            if !bytes.starts_with(&JPEG_MAGIC) {
                return Err(DecodeError::UnsupportedFormat);
            }
            decode_jpeg(bytes)
        }
        SourceFormat::Png => {
            if !bytes.starts_with(&PNG_MAGIC) {
                return Err(DecodeError::UnsupportedFormat);
            }
            decode_png(bytes)
        }
        SourceFormat::Raw { fidelity } => {
            if !is_raw_container(bytes) {
                return Err(DecodeError::UnsupportedFormat);
            }
            match fidelity {
                RawFidelity::EmbeddedPreview => decode_raw_preview(bytes),
                RawFidelity::FullResolution => decode_raw_full(bytes),
            }
        }
    }
}
