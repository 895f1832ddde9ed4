//! Tonal adjustment algorithms.
//!
//! Applies the ten sliders to RGBA pixel data. Alpha is never touched.
//!
//! ## Adjustment Order
//!
//! The composition order is fixed and part of the contract: sliders do not
//! commute once each step clamps to the displayable range, so reordering
//! them changes the output.
//!
//! 1. Exposure
//! 2. Contrast
//! 3. Temperature
//! 4. Tint
//! 5. Highlights
//! 6. Shadows
//! 7. Whites
//! 8. Blacks
//! 9. Saturation
//! 10. Vibrance
//!
//! Every step's result is clamped to [0, 1] before the next step runs;
//! the final value maps back to [0, 255] with no wraparound possible.

use crate::luminance::luminance;
use crate::Adjustments;

/// Apply all adjustments to an image's pixel data in place.
///
/// # Arguments
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `adjustments` - The slider values to apply
pub fn apply_adjustments(pixels: &mut [u8], adjustments: &Adjustments) {
    // Early exit if no adjustments
    if adjustments.is_default() {
        return;
    }

    for chunk in pixels.chunks_exact_mut(4) {
        let mut r = chunk[0] as f32 / 255.0;
        let mut g = chunk[1] as f32 / 255.0;
        let mut b = chunk[2] as f32 / 255.0;

        (r, g, b) = clamped(apply_exposure(r, g, b, adjustments.exposure));
        (r, g, b) = clamped(apply_contrast(r, g, b, adjustments.contrast));
        (r, g, b) = clamped(apply_temperature(r, g, b, adjustments.temperature));
        (r, g, b) = clamped(apply_tint(r, g, b, adjustments.tint));

        let lum = luminance(r, g, b);
        (r, g, b) = clamped(apply_highlights(r, g, b, lum, adjustments.highlights));
        (r, g, b) = clamped(apply_shadows(r, g, b, lum, adjustments.shadows));
        (r, g, b) = clamped(apply_whites(r, g, b, adjustments.whites));
        (r, g, b) = clamped(apply_blacks(r, g, b, adjustments.blacks));
        (r, g, b) = clamped(apply_saturation(r, g, b, adjustments.saturation));
        (r, g, b) = clamped(apply_vibrance(r, g, b, adjustments.vibrance));

        chunk[0] = (r * 255.0) as u8;
        chunk[1] = (g * 255.0) as u8;
        chunk[2] = (b * 255.0) as u8;
        // chunk[3] (alpha) passes through
    }
}

/// Clamp all three channels to the displayable range.
#[inline]
fn clamped((r, g, b): (f32, f32, f32)) -> (f32, f32, f32) {
    (r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0))
}

/// Apply exposure adjustment.
///
/// Exposure is measured in stops (-5 to +5); each stop doubles or halves
/// the brightness: `output = input * 2^exposure`
#[inline]
fn apply_exposure(r: f32, g: f32, b: f32, exposure: f32) -> (f32, f32, f32) {
    if exposure == 0.0 {
        return (r, g, b);
    }
    let multiplier = 2.0_f32.powf(exposure);
    (r * multiplier, g * multiplier, b * multiplier)
}

/// Apply contrast adjustment.
///
/// Contrast ranges from -100 to +100, pivoting around middle gray:
/// `output = (input - 0.5) * (1 + contrast/100) + 0.5`
#[inline]
fn apply_contrast(r: f32, g: f32, b: f32, contrast: f32) -> (f32, f32, f32) {
    if contrast == 0.0 {
        return (r, g, b);
    }
    let factor = 1.0 + (contrast / 100.0);
    let midpoint = 0.5;
    (
        (r - midpoint) * factor + midpoint,
        (g - midpoint) * factor + midpoint,
        (b - midpoint) * factor + midpoint,
    )
}

/// Apply temperature (white balance) adjustment.
///
/// - Negative = warmer (more orange/red)
/// - Positive = cooler (more blue)
#[inline]
fn apply_temperature(r: f32, g: f32, b: f32, temperature: f32) -> (f32, f32, f32) {
    if temperature == 0.0 {
        return (r, g, b);
    }
    let shift = temperature / 100.0 * 0.3;
    if temperature < 0.0 {
        // Warmer: boost red, reduce blue
        (r * (1.0 + shift.abs()), g, b * (1.0 - shift.abs()))
    } else {
        // Cooler: reduce red, boost blue
        (r * (1.0 - shift), g, b * (1.0 + shift))
    }
}

/// Apply tint (green-magenta) adjustment.
///
/// - Negative = more green
/// - Positive = more magenta (red + blue)
#[inline]
fn apply_tint(r: f32, g: f32, b: f32, tint: f32) -> (f32, f32, f32) {
    if tint == 0.0 {
        return (r, g, b);
    }
    let shift = tint / 100.0 * 0.2;
    if tint < 0.0 {
        (r, g * (1.0 + shift.abs()), b)
    } else {
        (r * (1.0 + shift), g * (1.0 - shift), b * (1.0 + shift))
    }
}

/// Smooth interpolation: 0 for x <= edge0, 1 for x >= edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Apply highlights adjustment, affecting bright areas (luminance > 0.5).
#[inline]
fn apply_highlights(r: f32, g: f32, b: f32, lum: f32, highlights: f32) -> (f32, f32, f32) {
    if highlights == 0.0 {
        return (r, g, b);
    }
    let highlight_mask = smoothstep(0.5, 1.0, lum);
    let adjustment = (highlights / 100.0) * highlight_mask;

    if highlights < 0.0 {
        let factor = 1.0 + adjustment; // adjustment is negative
        (r * factor, g * factor, b * factor)
    } else {
        let boost = adjustment * 0.5;
        (r + boost, g + boost, b + boost)
    }
}

/// Apply shadows adjustment, affecting dark areas (luminance < 0.5).
#[inline]
fn apply_shadows(r: f32, g: f32, b: f32, lum: f32, shadows: f32) -> (f32, f32, f32) {
    if shadows == 0.0 {
        return (r, g, b);
    }
    let shadow_mask = smoothstep(0.5, 0.0, lum);
    let adjustment = (shadows / 100.0) * shadow_mask;

    if shadows < 0.0 {
        let factor = 1.0 + adjustment; // adjustment is negative
        (r * factor, g * factor, b * factor)
    } else {
        let boost = adjustment * 0.5;
        (r + boost, g + boost, b + boost)
    }
}

/// Apply whites adjustment, affecting the brightest pixels (any channel > 0.9).
#[inline]
fn apply_whites(r: f32, g: f32, b: f32, whites: f32) -> (f32, f32, f32) {
    if whites == 0.0 {
        return (r, g, b);
    }
    let max_channel = r.max(g).max(b);
    if max_channel > 0.9 {
        let factor = 1.0 + (whites / 100.0) * 0.3;
        (r * factor, g * factor, b * factor)
    } else {
        (r, g, b)
    }
}

/// Apply blacks adjustment, affecting the darkest pixels (any channel < 0.1).
#[inline]
fn apply_blacks(r: f32, g: f32, b: f32, blacks: f32) -> (f32, f32, f32) {
    if blacks == 0.0 {
        return (r, g, b);
    }
    let min_channel = r.min(g).min(b);
    if min_channel < 0.1 {
        let factor = 1.0 + (blacks / 100.0) * 0.2;
        (r * factor, g * factor, b * factor)
    } else {
        (r, g, b)
    }
}

/// Apply saturation adjustment around the luminance axis.
#[inline]
fn apply_saturation(r: f32, g: f32, b: f32, saturation: f32) -> (f32, f32, f32) {
    if saturation == 0.0 {
        return (r, g, b);
    }
    let gray = luminance(r, g, b);
    let factor = 1.0 + (saturation / 100.0);
    (
        gray + (r - gray) * factor,
        gray + (g - gray) * factor,
        gray + (b - gray) * factor,
    )
}

/// Apply vibrance adjustment.
///
/// Like saturation, but protects already-saturated colors and skin tones
/// (R > G > B) for a more natural effect.
#[inline]
fn apply_vibrance(r: f32, g: f32, b: f32, vibrance: f32) -> (f32, f32, f32) {
    if vibrance == 0.0 {
        return (r, g, b);
    }

    // Current saturation (simplified HSV S)
    let max_c = r.max(g).max(b);
    let min_c = r.min(g).min(b);
    let current_sat = if max_c > 0.0 {
        (max_c - min_c) / max_c
    } else {
        0.0
    };

    let is_skin = r > g && g > b && (r - g) > 0.06;
    let skin_protection = if is_skin { 0.5 } else { 1.0 };
    let saturation_protection = 1.0 - current_sat;

    let effective_vibrance = vibrance * skin_protection * saturation_protection;
    apply_saturation(r, g, b, effective_vibrance)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create a single RGBA pixel.
    fn pixel(r: u8, g: u8, b: u8) -> Vec<u8> {
        vec![r, g, b, 255]
    }

    /// Helper to apply adjustments and return the resulting pixel data.
    fn apply(pixels: &[u8], adj: &Adjustments) -> Vec<u8> {
        let mut result = pixels.to_vec();
        apply_adjustments(&mut result, adj);
        result
    }

    // ===== Identity Tests =====

    #[test]
    fn test_identity_no_adjustments() {
        let pixels = pixel(128, 64, 192);
        let adj = Adjustments::default();
        let result = apply(&pixels, &adj);
        assert_eq!(
            result, pixels,
            "Default adjustments should not change pixels"
        );
    }

    #[test]
    fn test_identity_black_and_white() {
        let adj = Adjustments::default();
        assert_eq!(apply(&pixel(0, 0, 0), &adj), pixel(0, 0, 0));
        assert_eq!(apply(&pixel(255, 255, 255), &adj), pixel(255, 255, 255));
    }

    #[test]
    fn test_alpha_passes_through() {
        let pixels = vec![100, 100, 100, 42];
        let mut adj = Adjustments::default();
        adj.exposure = 1.5;
        let result = apply(&pixels, &adj);
        assert_eq!(result[3], 42, "Alpha must never be adjusted");
    }

    // ===== Exposure Tests =====

    #[test]
    fn test_exposure_positive_one_stop() {
        let pixels = pixel(64, 64, 64);
        let mut adj = Adjustments::default();
        adj.exposure = 1.0; // +1 stop = 2x brightness
        let result = apply(&pixels, &adj);
        assert_eq!(&result[..3], &[128, 128, 128]);
    }

    #[test]
    fn test_exposure_negative_one_stop() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.exposure = -1.0;
        let result = apply(&pixels, &adj);
        assert_eq!(&result[..3], &[64, 64, 64]);
    }

    #[test]
    fn test_exposure_clips_at_white() {
        let pixels = pixel(200, 200, 200);
        let mut adj = Adjustments::default();
        adj.exposure = 2.0; // 4x brightness
        let result = apply(&pixels, &adj);
        assert_eq!(&result[..3], &[255, 255, 255]);
    }

    // ===== Contrast Tests =====

    #[test]
    fn test_contrast_positive() {
        let pixels = vec![64, 64, 64, 255, 128, 128, 128, 255, 192, 192, 192, 255];
        let mut adj = Adjustments::default();
        adj.contrast = 100.0;
        let result = apply(&pixels, &adj);
        assert!(result[0] < 64, "Dark pixel should get darker");
        assert!(
            (result[4] as i32 - 128).abs() < 5,
            "Mid pixel should stay near middle"
        );
        assert_eq!(result[8], 255, "Bright pixel should clip at white");
    }

    #[test]
    fn test_contrast_negative() {
        let pixels = vec![0, 0, 0, 255, 255, 255, 255, 255];
        let mut adj = Adjustments::default();
        adj.contrast = -50.0;
        let result = apply(&pixels, &adj);
        assert!(result[0] > 0, "Black should move toward gray");
        assert!(result[4] < 255, "White should move toward gray");
    }

    // ===== Temperature / Tint Tests =====

    #[test]
    fn test_temperature_warm() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.temperature = -100.0;
        let result = apply(&pixels, &adj);
        assert!(result[0] > 128, "Red should increase for warm");
        assert!(result[2] < 128, "Blue should decrease for warm");
    }

    #[test]
    fn test_temperature_cool() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.temperature = 100.0;
        let result = apply(&pixels, &adj);
        assert!(result[0] < 128, "Red should decrease for cool");
        assert!(result[2] > 128, "Blue should increase for cool");
    }

    #[test]
    fn test_tint_green() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.tint = -100.0;
        let result = apply(&pixels, &adj);
        assert!(result[1] > 128, "Green should increase");
        assert_eq!(result[0], 128, "Red should stay same");
        assert_eq!(result[2], 128, "Blue should stay same");
    }

    #[test]
    fn test_tint_magenta() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.tint = 100.0;
        let result = apply(&pixels, &adj);
        assert!(result[0] > 128, "Red should increase for magenta");
        assert!(result[1] < 128, "Green should decrease for magenta");
        assert!(result[2] > 128, "Blue should increase for magenta");
    }

    // ===== Saturation / Vibrance Tests =====

    #[test]
    fn test_saturation_increase() {
        let pixels = pixel(200, 128, 100);
        let mut adj = Adjustments::default();
        adj.saturation = 50.0;
        let result = apply(&pixels, &adj);
        let orig_diff = (200 - 100) as i32;
        let new_diff = (result[0] as i32 - result[2] as i32).abs();
        assert!(new_diff > orig_diff, "Color difference should increase");
    }

    #[test]
    fn test_saturation_desaturate() {
        let pixels = pixel(200, 128, 100);
        let mut adj = Adjustments::default();
        adj.saturation = -100.0;
        let result = apply(&pixels, &adj);
        // Should become grayscale (all channels roughly equal)
        let avg = (result[0] as i32 + result[1] as i32 + result[2] as i32) / 3;
        assert!((result[0] as i32 - avg).abs() < 5);
        assert!((result[1] as i32 - avg).abs() < 5);
        assert!((result[2] as i32 - avg).abs() < 5);
    }

    #[test]
    fn test_vibrance_protects_saturated() {
        let saturated = pixel(255, 0, 0);
        let mut adj = Adjustments::default();
        adj.vibrance = 100.0;
        let result = apply(&saturated, &adj);
        assert_eq!(result[0], 255, "Red should stay at max");
        assert!(result[1] < 30, "Green should stay low");
        assert!(result[2] < 30, "Blue should stay low");
    }

    #[test]
    fn test_vibrance_boosts_desaturated() {
        let muted = pixel(140, 130, 120);
        let mut adj = Adjustments::default();
        adj.vibrance = 100.0;
        let result = apply(&muted, &adj);
        let orig_diff = 140 - 120;
        let new_diff = result[0] as i32 - result[2] as i32;
        assert!(
            new_diff > orig_diff,
            "Color difference should increase for muted colors"
        );
    }

    // ===== Highlights/Shadows/Whites/Blacks Tests =====

    #[test]
    fn test_highlights_only_affects_bright() {
        let dark = pixel(30, 30, 30);
        let mut adj = Adjustments::default();
        adj.highlights = 50.0;
        let result = apply(&dark, &adj);
        assert!(
            (result[0] as i32 - 30).abs() < 5,
            "Dark pixels should not change much"
        );
    }

    #[test]
    fn test_shadows_only_affects_dark() {
        let bright = pixel(220, 220, 220);
        let mut adj = Adjustments::default();
        adj.shadows = 50.0;
        let result = apply(&bright, &adj);
        assert!(
            (result[0] as i32 - 220).abs() < 5,
            "Bright pixels should not change much"
        );
    }

    #[test]
    fn test_whites_clips_at_max() {
        let almost_white = pixel(240, 240, 240);
        let mut adj = Adjustments::default();
        adj.whites = 100.0;
        let result = apply(&almost_white, &adj);
        assert_eq!(result[0], 255, "Should clip at white");
    }

    #[test]
    fn test_blacks_affects_dark_only() {
        let almost_black = pixel(20, 20, 20);
        let mut adj = Adjustments::default();
        adj.blacks = 50.0;
        let result_dark = apply(&almost_black, &adj);
        assert!(result_dark[0] > 20, "Dark pixel should brighten");

        let mid_gray = pixel(128, 128, 128);
        let result_mid = apply(&mid_gray, &adj);
        assert_eq!(result_mid[0], 128, "Mid-gray should not change");
    }

    // ===== Composition order =====

    #[test]
    fn test_order_sensitivity_under_clamping() {
        // Exposure-then-contrast differs from contrast-then-exposure once
        // exposure pushes a channel into the clamp. Evidence that the fixed
        // order is a real contract, not a style choice.
        let mut strong = Adjustments::default();
        strong.exposure = 3.0;
        strong.contrast = -80.0;

        let result = apply(&pixel(180, 180, 180), &strong);

        // With the fixed order: exposure clips to 1.0, then negative
        // contrast pulls back toward the midpoint.
        assert!(result[0] < 255);
        assert!(result[0] > 128);
    }

    // ===== Robustness =====

    #[test]
    fn test_extreme_values_stay_in_range() {
        let mut adj = Adjustments::default();
        adj.exposure = 5.0;
        adj.contrast = 100.0;
        adj.temperature = 100.0;
        adj.tint = 100.0;
        adj.highlights = 100.0;
        adj.shadows = 100.0;
        adj.whites = 100.0;
        adj.blacks = 100.0;
        adj.vibrance = 100.0;
        adj.saturation = 100.0;

        for start in [pixel(0, 0, 0), pixel(128, 128, 128), pixel(255, 255, 255)] {
            let result = apply(&start, &adj);
            assert_eq!(result.len(), 4);
        }
    }

    #[test]
    fn test_all_negative_extreme() {
        let pixels = pixel(128, 128, 128);
        let mut adj = Adjustments::default();
        adj.exposure = -5.0;
        adj.contrast = -100.0;
        adj.temperature = -100.0;
        adj.tint = -100.0;
        adj.highlights = -100.0;
        adj.shadows = -100.0;
        adj.whites = -100.0;
        adj.blacks = -100.0;
        adj.vibrance = -100.0;
        adj.saturation = -100.0;
        let result = apply(&pixels, &adj);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_multiple_pixels() {
        let mut pixels = vec![
            255, 0, 0, 255, // Red
            0, 255, 0, 255, // Green
            0, 0, 255, 255, // Blue
            128, 128, 128, 255, // Gray
        ];
        let mut adj = Adjustments::default();
        adj.saturation = -100.0;
        apply_adjustments(&mut pixels, &adj);

        // All should be grayscale now
        assert!((pixels[0] as i32 - pixels[1] as i32).abs() < 10);
        assert!((pixels[4] as i32 - pixels[5] as i32).abs() < 10);
        assert!((pixels[8] as i32 - pixels[9] as i32).abs() < 10);
    }

    #[test]
    fn test_empty_pixels() {
        let mut pixels: Vec<u8> = vec![];
        let adj = Adjustments::default();
        apply_adjustments(&mut pixels, &adj);
        assert!(pixels.is_empty());
    }

    #[test]
    fn test_incomplete_pixel_ignored() {
        // 6 bytes = 1 complete RGBA pixel + 2 byte remainder
        let mut pixels = vec![128, 128, 128, 255, 64, 64];
        let mut adj = Adjustments::default();
        adj.exposure = 1.0;
        apply_adjustments(&mut pixels, &adj);
        assert_eq!(pixels[0], 255); // Brightened and clamped
        assert_eq!(pixels[4], 64); // Remainder unchanged
        assert_eq!(pixels[5], 64);
    }
}
