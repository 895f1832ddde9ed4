//! Geometric transforms: rotation, crop, and the combined pass.
//!
//! The pipeline order is fixed: rotation always runs before crop, and crop
//! coordinates are interpreted against the rotated canvas. Users straighten
//! first, then frame.

mod combined;
mod crop;
mod rotation;

pub use combined::transform;
pub use crop::{apply_crop, CropRect};
pub use rotation::{apply_rotation, compute_rotated_bounds};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors for transform parameters rejected before any pixel work happens.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Crop rectangle violates the normalized-bounds contract.
    #[error(
        "Invalid crop rectangle: left={left}, top={top}, width={width}, height={height}"
    )]
    InvalidCropRectangle {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },

    /// Interpolation filter name is not recognized.
    #[error("Invalid rotation filter: {0:?}")]
    InvalidRotationFilter(String),
}

/// Interpolation filter for sampling operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationFilter {
    /// Nearest neighbor - fastest, blocky output.
    Nearest,
    /// Bilinear interpolation - the preview default.
    #[default]
    Bilinear,
    /// Lanczos3 - the high-quality tier, best edge fidelity, slowest.
    Lanczos3,
}

impl InterpolationFilter {
    /// Parse a filter from its boundary-protocol name.
    ///
    /// Unknown names are rejected rather than defaulted; a typo'd quality
    /// tier should fail loudly, not silently degrade an export.
    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        match name {
            "nearest" => Ok(InterpolationFilter::Nearest),
            "bilinear" => Ok(InterpolationFilter::Bilinear),
            "lanczos3" => Ok(InterpolationFilter::Lanczos3),
            other => Err(ValidationError::InvalidRotationFilter(other.to_string())),
        }
    }

    /// Convert to the image crate's FilterType for resize operations.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            InterpolationFilter::Nearest => image::imageops::FilterType::Nearest,
            InterpolationFilter::Bilinear => image::imageops::FilterType::Triangle,
            InterpolationFilter::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Rotation parameters for a transform pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationSpec {
    /// Rotation angle in degrees (positive = counter-clockwise).
    pub angle_degrees: f64,
    /// Sampling strategy for the inverse mapping.
    pub filter: InterpolationFilter,
}

impl RotationSpec {
    pub fn new(angle_degrees: f64, filter: InterpolationFilter) -> Self {
        Self {
            angle_degrees,
            filter,
        }
    }

    /// True when the rotation is a no-op (angle effectively zero).
    pub fn is_identity(&self) -> bool {
        self.angle_degrees.abs() < 0.001
    }
}

impl Default for RotationSpec {
    fn default() -> Self {
        Self {
            angle_degrees: 0.0,
            filter: InterpolationFilter::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_from_name() {
        assert_eq!(
            InterpolationFilter::from_name("nearest").unwrap(),
            InterpolationFilter::Nearest
        );
        assert_eq!(
            InterpolationFilter::from_name("bilinear").unwrap(),
            InterpolationFilter::Bilinear
        );
        assert_eq!(
            InterpolationFilter::from_name("lanczos3").unwrap(),
            InterpolationFilter::Lanczos3
        );
    }

    #[test]
    fn test_filter_from_name_rejects_unknown() {
        let err = InterpolationFilter::from_name("cubic").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidRotationFilter("cubic".to_string())
        );
        assert!(InterpolationFilter::from_name("").is_err());
        assert!(InterpolationFilter::from_name("Bilinear").is_err());
    }

    #[test]
    fn test_filter_type_conversion() {
        assert!(matches!(
            InterpolationFilter::Nearest.to_image_filter(),
            image::imageops::FilterType::Nearest
        ));
        assert!(matches!(
            InterpolationFilter::Bilinear.to_image_filter(),
            image::imageops::FilterType::Triangle
        ));
        assert!(matches!(
            InterpolationFilter::Lanczos3.to_image_filter(),
            image::imageops::FilterType::Lanczos3
        ));
    }

    #[test]
    fn test_rotation_spec_identity() {
        assert!(RotationSpec::default().is_identity());
        assert!(RotationSpec::new(0.0005, InterpolationFilter::Bilinear).is_identity());
        assert!(!RotationSpec::new(5.0, InterpolationFilter::Bilinear).is_identity());
    }
}
