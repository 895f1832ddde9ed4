//! Histogram and clipping analysis over RGBA pixel data.
//!
//! One pass over the buffer produces both the per-channel histogram that
//! drives the edit view and the per-pixel clipping map that drives the
//! shadow/highlight warning overlays.
//!
//! # Clipping bit layout
//!
//! Each pixel gets one byte with six bits in use:
//!
//! ```text
//! bit 0..2  shadow clip    (channel == 0)   for R, G, B
//! bit 3..5  highlight clip (channel == 255) for R, G, B
//! ```
//!
//! Any subset of the six bits may be set on a single pixel. This layout is
//! a wire format: downstream consumers unpack it, so it must not change.

use crate::luminance::luminance_u8;
use crate::Histogram;

/// Shadow clip flag for the red channel.
pub const CLIP_SHADOW_R: u8 = 1 << 0;
/// Shadow clip flag for the green channel.
pub const CLIP_SHADOW_G: u8 = 1 << 1;
/// Shadow clip flag for the blue channel.
pub const CLIP_SHADOW_B: u8 = 1 << 2;
/// Highlight clip flag for the red channel.
pub const CLIP_HIGHLIGHT_R: u8 = 1 << 3;
/// Highlight clip flag for the green channel.
pub const CLIP_HIGHLIGHT_G: u8 = 1 << 4;
/// Highlight clip flag for the blue channel.
pub const CLIP_HIGHLIGHT_B: u8 = 1 << 5;

const SHADOW_BITS: u8 = CLIP_SHADOW_R | CLIP_SHADOW_G | CLIP_SHADOW_B;
const HIGHLIGHT_BITS: u8 = CLIP_HIGHLIGHT_R | CLIP_HIGHLIGHT_G | CLIP_HIGHLIGHT_B;

/// Per-pixel clipping classification for one analysis pass.
///
/// Produced fresh by [`analyze`]; never mutated, only replaced.
#[derive(Debug, Clone)]
pub struct ClippingMap {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// One flag byte per pixel, row-major; see the module docs for layout.
    pub flags: Vec<u8>,
    any_shadow: bool,
    any_highlight: bool,
}

impl ClippingMap {
    /// True when any pixel clips any channel at the shadow end.
    pub fn has_shadow_clipping(&self) -> bool {
        self.any_shadow
    }

    /// True when any pixel clips any channel at the highlight end.
    pub fn has_highlight_clipping(&self) -> bool {
        self.any_highlight
    }
}

/// Compute histogram and clipping map in a single pass.
///
/// # Arguments
/// * `pixels` - RGBA pixel data (4 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Performance
/// Single pass, O(n) in the pixel count; constant extra memory beyond the
/// one-byte-per-pixel clipping map.
pub fn analyze(pixels: &[u8], width: u32, height: u32) -> (Histogram, ClippingMap) {
    let mut hist = Histogram::new();
    let pixel_count = width as usize * height as usize;
    let mut flags = Vec::with_capacity(pixel_count);
    let mut any_shadow = false;
    let mut any_highlight = false;

    let expected_len = pixel_count * 4;
    debug_assert!(
        pixels.len() == expected_len,
        "Pixel data size mismatch. Expected {}, got {}",
        expected_len,
        pixels.len()
    );

    for chunk in pixels.chunks_exact(4) {
        let r = chunk[0];
        let g = chunk[1];
        let b = chunk[2];

        hist.red[r as usize] += 1;
        hist.green[g as usize] += 1;
        hist.blue[b as usize] += 1;
        hist.luminance[luminance_u8(r, g, b) as usize] += 1;

        let mut code = 0u8;
        if r == 0 {
            code |= CLIP_SHADOW_R;
        }
        if g == 0 {
            code |= CLIP_SHADOW_G;
        }
        if b == 0 {
            code |= CLIP_SHADOW_B;
        }
        if r == 255 {
            code |= CLIP_HIGHLIGHT_R;
        }
        if g == 255 {
            code |= CLIP_HIGHLIGHT_G;
        }
        if b == 255 {
            code |= CLIP_HIGHLIGHT_B;
        }

        any_shadow |= code & SHADOW_BITS != 0;
        any_highlight |= code & HIGHLIGHT_BITS != 0;
        flags.push(code);
    }

    (
        hist,
        ClippingMap {
            width,
            height,
            flags,
            any_shadow,
            any_highlight,
        },
    )
}

/// Map a clipping code to its warning-overlay color.
///
/// Total over all 64 codes. Code 0 means no overlay. Highlight clipping is
/// painted in the color of the clipped channels themselves (R+G clipped →
/// yellow, all three → white); shadow clipping is painted in the complement
/// of the clipped channels (only R clipped → cyan, all three → black).
/// When a pixel clips at both ends, the highlight overlay wins.
pub fn overlay_color(code: u8) -> Option<[u8; 3]> {
    let code = code & (SHADOW_BITS | HIGHLIGHT_BITS);
    if code == 0 {
        return None;
    }

    let highlight = (code >> 3) & 0b111;
    if highlight != 0 {
        return Some([
            if highlight & 0b001 != 0 { 255 } else { 0 },
            if highlight & 0b010 != 0 { 255 } else { 0 },
            if highlight & 0b100 != 0 { 255 } else { 0 },
        ]);
    }

    let shadow = code & 0b111;
    Some([
        if shadow & 0b001 != 0 { 0 } else { 255 },
        if shadow & 0b010 != 0 { 0 } else { 255 },
        if shadow & 0b100 != 0 { 0 } else { 255 },
    ])
}
