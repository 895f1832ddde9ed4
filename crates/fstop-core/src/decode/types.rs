//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The container or codec is not recognized for the requested format.
    #[error("Unsupported or unrecognized image format")]
    UnsupportedFormat,

    /// The container parsed structurally but pixel extraction failed.
    #[error("Corrupt image data: {0}")]
    CorruptData(String),
}

/// How much fidelity to extract from a RAW file.
///
/// RAW decoding is a two-path trade-off: the embedded JPEG preview is fast
/// (tens of milliseconds) but limited to what the camera rendered, while a
/// full sensor decode is slow but works from the actual mosaic data. The
/// caller must pick one explicitly; the decoder never infers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RawFidelity {
    /// Extract and decode the embedded JPEG preview (fast path).
    #[default]
    EmbeddedPreview,
    /// Decode the sensor mosaic with superpixel demosaicing (quality path).
    FullResolution,
}

/// Source container format for the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// TIFF-based camera RAW file (e.g. Sony ARW).
    Raw {
        /// Which decode path to take; see [`RawFidelity`].
        fidelity: RawFidelity,
    },
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Returns true if this orientation swaps width and height dimensions.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90CW
                | Orientation::Transverse
                | Orientation::Rotate270CW
        )
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}
