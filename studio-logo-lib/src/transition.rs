//! Timed linear blends between two colour sets.
//!
//! A transition runs as a blocking, cooperative frame loop: measure elapsed
//! time, render every section at the matching blend ratio, flush, then sleep
//! a fixed step. The final frame always lands exactly on the end colours.

use log::{debug, warn};
use rgb::RGB8;

use crate::palette::Palette;
use crate::render::{apply_blend, apply_section, LedOutput};

/// Duration of a rotation blend.
pub const DEFAULT_DURATION_MS: u64 = 500;

/// Sleep between frames.
pub const DEFAULT_FRAME_STEP_MS: u64 = 5;

/// Time source for the frame loop.
///
/// `sleep_ms` must let the surrounding runtime run (yield, not spin).
pub trait FrameClock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&mut self, ms: u64);
}

/// One section moving from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub section: String,
    pub start: RGB8,
    pub end: RGB8,
}

/// Summary of a finished transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionStats {
    /// Frames flushed, including the final end-colour frame.
    pub frames: u32,
    pub elapsed_ms: u64,
}

/// A set of transitions sharing one duration, rendered one frame at a time.
#[derive(Debug, Clone, Copy)]
pub struct Tween<'a> {
    transitions: &'a [Transition],
    duration_ms: u64,
}

impl<'a> Tween<'a> {
    #[must_use]
    pub const fn new(transitions: &'a [Transition], duration_ms: u64) -> Self {
        Self {
            transitions,
            duration_ms,
        }
    }

    /// Blend ratio in `[0, 1)` for `elapsed_ms`, or `None` once finished.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self, elapsed_ms: u64) -> Option<f32> {
        if elapsed_ms >= self.duration_ms {
            return None;
        }
        Some(elapsed_ms as f32 / self.duration_ms as f32)
    }

    /// Render the frame for `elapsed_ms` into `pixels`.
    ///
    /// Returns `true` when this was the final frame (end colours applied).
    pub fn frame(&self, palette: &Palette, pixels: &mut [RGB8], elapsed_ms: u64) -> bool {
        let ratio = self.ratio(elapsed_ms);
        for t in self.transitions {
            let result = match ratio {
                Some(r) => apply_blend(palette, pixels, &t.section, t.start, t.end, r),
                None => apply_section(palette, pixels, &t.section, t.end),
            };
            if let Err(e) = result {
                debug!("Transition frame skipped section '{}': {e}", t.section);
            }
        }
        ratio.is_none()
    }
}

/// Runs tweens against a clock and an output.
pub struct TransitionEngine<'a, O, C> {
    palette: &'a Palette,
    output: &'a mut O,
    clock: &'a mut C,
    step_ms: u64,
}

impl<'a, O: LedOutput, C: FrameClock> TransitionEngine<'a, O, C> {
    pub fn new(palette: &'a Palette, output: &'a mut O, clock: &'a mut C) -> Self {
        Self {
            palette,
            output,
            clock,
            step_ms: DEFAULT_FRAME_STEP_MS,
        }
    }

    /// Sleep between frames; clamped to at least 1 ms so the loop always
    /// makes progress.
    #[must_use]
    pub fn with_step_ms(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms.max(1);
        self
    }

    /// Blend every transition over `duration_ms`, blocking until done.
    pub fn run(
        &mut self,
        pixels: &mut [RGB8],
        transitions: &[Transition],
        duration_ms: u64,
    ) -> TransitionStats {
        // Resolve sections once so a bad entry is reported once, not per frame
        let valid: Vec<Transition> = transitions
            .iter()
            .filter(|t| match self.palette.section_of(&t.section) {
                Ok(_) => true,
                Err(e) => {
                    warn!("Dropping transition: {e}");
                    false
                }
            })
            .cloned()
            .collect();
        let tween = Tween::new(&valid, duration_ms);

        let start = self.clock.now_ms();
        let mut frames: u32 = 0;
        loop {
            let elapsed_ms = self.clock.now_ms().saturating_sub(start);
            let finished = tween.frame(self.palette, pixels, elapsed_ms);
            if let Err(e) = self.output.show(pixels) {
                warn!("Transition frame not shown: {e}");
            }
            frames = frames.saturating_add(1);

            if finished {
                debug!(
                    "Transition of {} sections done: {frames} frames in {elapsed_ms}ms",
                    valid.len()
                );
                return TransitionStats { frames, elapsed_ms };
            }
            self.clock.sleep_ms(self.step_ms);
        }
    }
}
