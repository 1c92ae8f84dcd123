//! Projection of section colours onto the pixel buffer.
//!
//! Rendering is a pure function of (section entry, colour) onto the buffer;
//! it never touches the section store.

use log::{debug, warn};
use rgb::RGB8;

use crate::error::{Error, Result};
use crate::palette::{LedSection, Palette};
use crate::sections::SectionColorMap;

/// Hardware flush boundary: pushes a full frame to the strip.
pub trait LedOutput {
    fn show(&mut self, pixels: &[RGB8]) -> Result<()>;
}

/// Scale a (possibly fractional) channel value and round once.
///
/// The result is clamped to `[0, 255]`, so out-of-range inputs never wrap.
#[inline]
#[must_use]
pub fn scale_channel(value: f32, factor: f32) -> u8 {
    // Clamped to [0, 255] before the cast, so no truncation or sign loss.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let scaled = (value * factor).round().clamp(0.0, 255.0) as u8;
    scaled
}

/// Scale every channel of `color` by `factor`.
#[must_use]
pub fn scale(color: RGB8, factor: f32) -> RGB8 {
    RGB8::new(
        scale_channel(f32::from(color.r), factor),
        scale_channel(f32::from(color.g), factor),
        scale_channel(f32::from(color.b), factor),
    )
}

/// Per-channel correction for common WS2812 strips (FastLED `TypicalLEDStrip`).
pub const TYPICAL_LED_STRIP: RGB8 = RGB8::new(255, 176, 240);

/// Scale each channel by `correction / 256`, rounding down; 255 passes the
/// channel through untouched.
#[must_use]
pub fn correct(color: RGB8, correction: RGB8) -> RGB8 {
    fn channel(value: u8, k: u8) -> u8 {
        // At most 255 * 256 >> 8 == 255
        #[allow(clippy::cast_possible_truncation)]
        let corrected = ((u16::from(value) * (u16::from(k) + 1)) >> 8) as u8;
        corrected
    }
    RGB8::new(
        channel(color.r, correction.r),
        channel(color.g, correction.g),
        channel(color.b, correction.b),
    )
}

/// Linear blend of one channel, left unrounded.
#[inline]
#[must_use]
pub fn lerp_channel(start: u8, end: u8, ratio: f32) -> f32 {
    let start = f32::from(start);
    start + (f32::from(end) - start) * ratio
}

fn fill(pixels: &mut [RGB8], name: &str, section: &LedSection, color: RGB8) {
    let Some(max_index) = pixels.len().checked_sub(1) else {
        return;
    };
    if section.first() > max_index {
        warn!(
            "Section '{name}' starts at {} beyond strip length {}",
            section.first(),
            pixels.len()
        );
        return;
    }
    let last = section.last().min(max_index);
    pixels[section.first()..=last].fill(color);
}

/// Write `color`, scaled by the section's brightness, over the section's range.
pub fn apply_section(
    palette: &Palette,
    pixels: &mut [RGB8],
    section: &str,
    color: RGB8,
) -> Result<()> {
    let entry = palette.section_of(section)?;
    fill(pixels, section, entry, scale(color, entry.brightness()));
    Ok(())
}

/// Write the blend of `start` and `end` at `ratio` over the section's range.
///
/// The interpolated channels are scaled by brightness and rounded in one step.
pub fn apply_blend(
    palette: &Palette,
    pixels: &mut [RGB8],
    section: &str,
    start: RGB8,
    end: RGB8,
    ratio: f32,
) -> Result<()> {
    let entry = palette.section_of(section)?;
    let factor = entry.brightness();
    let color = RGB8::new(
        scale_channel(lerp_channel(start.r, end.r, ratio), factor),
        scale_channel(lerp_channel(start.g, end.g, ratio), factor),
        scale_channel(lerp_channel(start.b, end.b, ratio), factor),
    );
    fill(pixels, section, entry, color);
    Ok(())
}

/// Render every entry of `map`. Unknown sections or colours are logged and
/// skipped; the skipped entries are returned.
pub fn apply_all(palette: &Palette, pixels: &mut [RGB8], map: &SectionColorMap) -> Vec<Error> {
    let mut skipped = Vec::new();
    for (section, color_name) in map {
        let result = palette
            .color_of(color_name)
            .and_then(|color| apply_section(palette, pixels, section, color));
        match result {
            Ok(()) => debug!("Rendered section '{section}' as '{color_name}'"),
            Err(e) => {
                warn!("Skipping section '{section}': {e}");
                skipped.push(e);
            }
        }
    }
    skipped
}
