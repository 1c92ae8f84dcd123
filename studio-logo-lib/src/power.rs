//! Power-budget brightness limiting.
//!
//! Estimates the strip's draw for a frame using a per-channel milliwatt model
//! for WS2812-class pixels, and scales the global brightness down so the
//! frame stays within a volts x milliamps budget.

use rgb::RGB8;

/// Draw of one fully lit red channel, in mW at 5 V.
const RED_MW: u32 = 16 * 5;
const GREEN_MW: u32 = 11 * 5;
const BLUE_MW: u32 = 15 * 5;
/// Quiescent draw of one dark pixel.
const DARK_MW: u32 = 5;

/// Supply limit for the whole strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerBudget {
    pub volts: u32,
    pub milliamps: u32,
}

impl PowerBudget {
    #[must_use]
    pub const fn new(volts: u32, milliamps: u32) -> Self {
        Self { volts, milliamps }
    }

    #[must_use]
    pub const fn max_milliwatts(&self) -> u32 {
        self.volts.saturating_mul(self.milliamps)
    }
}

impl Default for PowerBudget {
    /// 5 V at 1 A.
    fn default() -> Self {
        Self::new(5, 1000)
    }
}

/// Estimated draw of `pixels` at full brightness, in mW.
#[must_use]
pub fn estimate_milliwatts(pixels: &[RGB8]) -> u32 {
    let lit: u32 = pixels
        .iter()
        .map(|p| u32::from(p.r) * RED_MW + u32::from(p.g) * GREEN_MW + u32::from(p.b) * BLUE_MW)
        .sum::<u32>()
        >> 8;
    let count = u32::try_from(pixels.len()).unwrap_or(u32::MAX);
    lit.saturating_add(DARK_MW.saturating_mul(count))
}

/// Highest brightness (at most `target`) that keeps `pixels` within `budget`.
#[must_use]
pub fn max_brightness(pixels: &[RGB8], target: u8, budget: PowerBudget) -> u8 {
    let requested = u64::from(estimate_milliwatts(pixels)) * u64::from(target) / 256;
    let max = u64::from(budget.max_milliwatts());
    if requested <= max {
        return target;
    }
    // requested > max, so the quotient is below target and fits in u8
    u8::try_from(u64::from(target) * max / requested).unwrap_or(target)
}
