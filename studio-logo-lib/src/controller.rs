//! Mode dispatch: owns the section state and drives rendering, rotation and
//! persistence from inbound messages and periodic ticks.

use log::{debug, info, warn};
use rgb::RGB8;

use crate::control::{ControlMessage, PaletteUpdate};
use crate::error::Error;
use crate::palette::Palette;
use crate::persistence::{KeyValueStore, Persistence};
use crate::render::{apply_all, LedOutput};
use crate::rotation::next_assignment;
use crate::sections::SectionStore;
use crate::transition::{FrameClock, TransitionEngine, DEFAULT_DURATION_MS, DEFAULT_FRAME_STEP_MS};

/// Time between ticks.
pub const DEFAULT_INTERVAL_MS: u64 = 10_000;

/// Known mode values. Anything else is stored as-is and makes ticks no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ApplyStartupPalette = 0,
    RestorePersisted = 1,
    RotateClockwise = 2,
    RotateAntiClockwise = 3,
}

impl Mode {
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::ApplyStartupPalette),
            1 => Some(Self::RestorePersisted),
            2 => Some(Self::RotateClockwise),
            3 => Some(Self::RotateAntiClockwise),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub interval_ms: u64,
    /// Length of a rotation blend.
    pub duration_ms: u64,
    pub frame_step_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            duration_ms: DEFAULT_DURATION_MS,
            frame_step_ms: DEFAULT_FRAME_STEP_MS,
        }
    }
}

/// Everything the controller mutates while running.
#[derive(Debug, Clone)]
pub struct ControllerState {
    palette: Palette,
    sections: SectionStore,
    mode: u8,
    pixels: Vec<RGB8>,
}

impl ControllerState {
    #[must_use]
    pub fn new(palette: Palette, strip_len: usize) -> Self {
        if strip_len < palette.min_strip_len() {
            warn!(
                "Strip has {strip_len} LEDs but sections need {}, output will be clipped",
                palette.min_strip_len()
            );
        }
        Self {
            palette,
            sections: SectionStore::new(),
            mode: 0,
            pixels: vec![RGB8::default(); strip_len],
        }
    }

    #[must_use]
    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    #[must_use]
    pub const fn sections(&self) -> &SectionStore {
        &self.sections
    }

    /// Raw mode value, known or not.
    #[must_use]
    pub const fn mode(&self) -> u8 {
        self.mode
    }

    #[must_use]
    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    StartupApplied,
    Restored { restored: usize },
    Rotated { frames: u32, skipped: usize },
    /// Mode value with no behaviour; nothing rendered.
    Idle { mode: u8 },
}

pub struct Controller<S, O, C> {
    state: ControllerState,
    persistence: Persistence<S>,
    output: O,
    clock: C,
    timing: Timing,
}

impl<S: KeyValueStore, O: LedOutput, C: FrameClock> Controller<S, O, C> {
    pub fn new(state: ControllerState, store: S, output: O, clock: C) -> Self {
        Self {
            state,
            persistence: Persistence::new(store),
            output,
            clock,
            timing: Timing::default(),
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub const fn state(&self) -> &ControllerState {
        &self.state
    }

    pub const fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub const fn output(&self) -> &O {
        &self.output
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    pub const fn timing(&self) -> Timing {
        self.timing
    }

    /// Restore the stored mode and show the startup palette.
    pub fn startup(&mut self) {
        self.state.mode = self.persistence.load_mode();
        self.state
            .sections
            .replace_all(self.state.palette.startup_palette());
        self.render();
        info!("Controller started in mode {}", self.state.mode);
    }

    /// Apply an inbound message. Returns every recovered problem; none of
    /// them stop the rest of the message from being applied.
    pub fn handle(&mut self, message: ControlMessage) -> Vec<Error> {
        match message {
            ControlMessage::Mode(mode) => self.set_mode(mode),
            ControlMessage::Palette(update) => self.apply_palette(update),
        }
    }

    /// Run the behaviour for the current mode once.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(mode) = Mode::from_u8(self.state.mode) else {
            debug!("Mode {} has no behaviour, idling", self.state.mode);
            return TickOutcome::Idle {
                mode: self.state.mode,
            };
        };
        match mode {
            Mode::ApplyStartupPalette => {
                self.state
                    .sections
                    .replace_all(self.state.palette.startup_palette());
                self.render();
                TickOutcome::StartupApplied
            }
            Mode::RestorePersisted => {
                let hydration = self
                    .persistence
                    .hydrate(&self.state.palette, &mut self.state.sections);
                self.render();
                TickOutcome::Restored {
                    restored: hydration.restored,
                }
            }
            Mode::RotateClockwise => self.rotate(false),
            Mode::RotateAntiClockwise => self.rotate(true),
        }
    }

    fn set_mode(&mut self, mode: u8) -> Vec<Error> {
        if Mode::from_u8(mode).is_none() {
            warn!("Mode {mode} is not a known mode, ticks will do nothing");
        }
        self.state.mode = mode;
        match self.persistence.save_mode(mode) {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!("Mode {mode} applied but not saved: {e}");
                vec![e]
            }
        }
    }

    fn apply_palette(&mut self, update: PaletteUpdate) -> Vec<Error> {
        let mut problems = update.malformed;
        let mut changed = false;

        for (section, color) in update.assignments {
            if !self.state.palette.has_color(&color) {
                let e = Error::unknown_color(&color);
                warn!("Ignoring '{section}': {e}");
                problems.push(e);
                continue;
            }
            if !self.state.palette.has_section(&section) {
                let e = Error::unknown_section(&section);
                warn!("Ignoring colour '{color}': {e}");
                problems.push(e);
                continue;
            }
            if self.state.sections.get(&section).is_ok_and(|c| c == color) {
                continue;
            }
            info!("Section '{section}' set to '{color}'");
            self.state.sections.set(section, color);
            changed = true;
        }

        if changed {
            if let Err(e) = self.persistence.save_sections(self.state.sections.as_map()) {
                warn!("Palette applied but not saved: {e}");
                problems.push(e);
            }
        } else {
            debug!("Palette message changed nothing");
        }
        problems
    }

    fn rotate(&mut self, anti_clockwise: bool) -> TickOutcome {
        // Sections that do not move still follow the map
        self.paint();
        let rotation = next_assignment(
            &self.state.palette,
            self.state.sections.as_map(),
            anti_clockwise,
        );

        let stats = TransitionEngine::new(&self.state.palette, &mut self.output, &mut self.clock)
            .with_step_ms(self.timing.frame_step_ms)
            .run(
                &mut self.state.pixels,
                &rotation.transitions,
                self.timing.duration_ms,
            );

        self.state.sections.replace_all(rotation.assignment);
        if let Err(e) = self.persistence.save_sections(self.state.sections.as_map()) {
            warn!("Rotation not saved: {e}");
        }
        info!(
            "Rotated {} sections {} in {} frames",
            rotation.transitions.len(),
            if anti_clockwise { "anti-clockwise" } else { "clockwise" },
            stats.frames
        );
        TickOutcome::Rotated {
            frames: stats.frames,
            skipped: rotation.skipped.len(),
        }
    }

    fn paint(&mut self) {
        let skipped = apply_all(
            &self.state.palette,
            &mut self.state.pixels,
            self.state.sections.as_map(),
        );
        if !skipped.is_empty() {
            debug!("{} sections not rendered", skipped.len());
        }
    }

    fn render(&mut self) {
        self.paint();
        if let Err(e) = self.output.show(&self.state.pixels) {
            warn!("Frame not shown: {e}");
        }
    }
}

/// Fires once every `interval_ms` of a millisecond clock that may wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickScheduler {
    interval_ms: u64,
    last_ms: u64,
}

impl TickScheduler {
    /// First tick is due one interval after `now_ms`.
    #[must_use]
    pub const fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_ms: now_ms,
        }
    }

    /// True (and the interval restarts) once `now_ms - last >= interval`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms.wrapping_sub(self.last_ms) >= self.interval_ms {
            self.last_ms = now_ms;
            return true;
        }
        false
    }

    /// Time until the next tick is due.
    #[must_use]
    pub const fn remaining(&self, now_ms: u64) -> u64 {
        self.interval_ms
            .saturating_sub(now_ms.wrapping_sub(self.last_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{decode_palette, Topics};
    use crate::palette::{LEFT_EAR, RIGHT_EAR, SECTION_01, SECTION_02, STRIP_LEN};
    use crate::persistence::MODE_KEY;
    use crate::testing::{ManualClock, MemoryStore, RecordingOutput};

    type TestController = Controller<MemoryStore, RecordingOutput, ManualClock>;

    fn controller_with(store: MemoryStore) -> TestController {
        let state = ControllerState::new(Palette::studio_logo().unwrap(), STRIP_LEN);
        Controller::new(state, store, RecordingOutput::default(), ManualClock::default())
    }

    fn controller() -> TestController {
        controller_with(MemoryStore::new())
    }

    fn started() -> TestController {
        let mut c = controller();
        c.startup();
        c
    }

    fn color_of(c: &TestController, section: &str) -> String {
        c.state().sections().get(section).unwrap().to_string()
    }

    #[test]
    fn mode_values() {
        for raw in 0..=3 {
            assert_eq!(Mode::from_u8(raw).map(Mode::as_u8), Some(raw));
        }
        assert_eq!(Mode::from_u8(4), None);
        assert_eq!(Mode::from_u8(255), None);
    }

    #[test]
    fn startup_shows_startup_palette() {
        let c = started();
        assert_eq!(c.state().mode(), 0);
        assert_eq!(c.output().frames.len(), 1);

        let frame = c.output().last_frame().unwrap();
        assert_eq!(frame[0], RGB8::new(0, 0, 64));
        assert_eq!(frame[8], RGB8::new(0, 64, 0));
        // rightEar lighterGreen, leftEar orange, both at full brightness
        assert_eq!(frame[16], RGB8::new(20, 255, 20));
        assert_eq!(frame[34], RGB8::new(255, 165, 0));
        assert_eq!(frame[43], RGB8::new(32, 0, 32));
    }

    #[test]
    fn startup_restores_stored_mode() {
        let mut store = MemoryStore::new();
        store.set_u8(MODE_KEY, 3).unwrap();
        store.commit().unwrap();
        let mut c = controller_with(store);
        c.startup();
        assert_eq!(c.state().mode(), 3);
    }

    #[test]
    fn startup_survives_failing_output() {
        let state = ControllerState::new(Palette::studio_logo().unwrap(), STRIP_LEN);
        let mut c = Controller::new(
            state,
            MemoryStore::new(),
            RecordingOutput::failing(),
            ManualClock::default(),
        );
        c.startup();
        assert_eq!(c.state().pixels()[0], RGB8::new(0, 0, 64));
    }

    #[test]
    fn mode_zero_tick_is_not_persisted() {
        let mut c = started();
        assert_eq!(c.tick(), TickOutcome::StartupApplied);
        assert_eq!(c.output().frames.len(), 2);
        assert_eq!(c.persistence().store().commits(), 0);
    }

    #[test]
    fn mode_message_is_persisted() {
        let mut c = started();
        assert!(c.handle(ControlMessage::Mode(2)).is_empty());
        assert_eq!(c.state().mode(), 2);
        assert_eq!(c.persistence().load_mode(), 2);
    }

    #[test]
    fn unknown_mode_idles() {
        let mut c = started();
        c.handle(ControlMessage::Mode(9));
        assert_eq!(c.tick(), TickOutcome::Idle { mode: 9 });
        assert_eq!(c.output().frames.len(), 1);
    }

    #[test]
    fn mode_applied_when_store_fails() {
        let mut c = started();
        c.persistence.store_mut().set_unavailable(true);
        let problems = c.handle(ControlMessage::Mode(1));
        assert_eq!(problems.len(), 1);
        assert_eq!(c.state().mode(), 1);
    }

    #[test]
    fn single_field_palette_changes_one_section() {
        let mut c = started();
        let before = c.state().sections().snapshot_all();
        let update = decode_palette(br#"{"section01":"red"}"#).unwrap();

        let problems = c.handle(ControlMessage::Palette(update));

        // The six absent fields are reported, not applied
        assert_eq!(problems.len(), 6);
        assert_eq!(color_of(&c, SECTION_01), "red");
        for (section, color) in &before {
            if section != SECTION_01 {
                assert_eq!(&color_of(&c, section), color);
            }
        }
        assert_eq!(c.persistence().store().commits(), 1);
        assert_eq!(c.persistence().store().committed_keys().len(), 7);
    }

    #[test]
    fn palette_unknown_colour_is_skipped() {
        let mut c = started();
        let update = decode_palette(br#"{"section01":"magenta","section02":"white"}"#).unwrap();
        let problems = c.handle(ControlMessage::Palette(update));

        assert!(problems.contains(&Error::unknown_color("magenta")));
        assert_eq!(color_of(&c, SECTION_01), "blue");
        assert_eq!(color_of(&c, SECTION_02), "white");
    }

    #[test]
    fn unchanged_palette_is_not_persisted() {
        let mut c = started();
        let update = decode_palette(br#"{"section01":"blue","leftEar":"orange"}"#).unwrap();
        c.handle(ControlMessage::Palette(update));
        assert_eq!(c.persistence().store().commits(), 0);
    }

    #[test]
    fn restore_mode_hydrates_and_renders() {
        let mut store = MemoryStore::new();
        store.set_str(SECTION_01, "white").unwrap();
        store.set_str(LEFT_EAR, "purple").unwrap();
        store.commit().unwrap();
        let mut c = controller_with(store);
        c.startup();
        c.handle(ControlMessage::Mode(1));

        assert_eq!(c.tick(), TickOutcome::Restored { restored: 2 });
        assert_eq!(color_of(&c, SECTION_01), "white");
        assert_eq!(color_of(&c, SECTION_02), "green");
        let frame = c.output().last_frame().unwrap();
        assert_eq!(frame[0], RGB8::new(64, 64, 64));
        assert_eq!(frame[34], RGB8::new(128, 0, 128));
    }

    #[test]
    fn clockwise_tick_end_to_end() {
        let mut c = started();
        let ears = (color_of(&c, LEFT_EAR), color_of(&c, RIGHT_EAR));
        c.handle(ControlMessage::Mode(2));

        let outcome = c.tick();

        assert_eq!(
            outcome,
            TickOutcome::Rotated {
                frames: 101,
                skipped: 0
            }
        );
        let expected = ["green", "yellow", "red", "purple", "blue"];
        for (section, color) in c.state().palette().main_sections().iter().zip(expected) {
            assert_eq!(color_of(&c, section), color);
        }
        assert_eq!((color_of(&c, LEFT_EAR), color_of(&c, RIGHT_EAR)), ears);

        // Startup frame plus the blend
        assert_eq!(c.output().frames.len(), 102);
        let frames = &c.output().frames;
        assert_eq!(frames[1][0], RGB8::new(0, 0, 64));
        assert_eq!(frames[101][0], RGB8::new(0, 64, 0));
        assert_eq!(frames[101][16], RGB8::new(20, 255, 20));

        let mut restored = SectionStore::new();
        c.persistence()
            .hydrate(c.state().palette(), &mut restored);
        assert_eq!(&restored.snapshot_all(), c.state().sections().as_map());
    }

    #[test]
    fn anti_clockwise_tick() {
        let mut c = started();
        c.handle(ControlMessage::Mode(3));
        c.tick();
        assert_eq!(color_of(&c, SECTION_01), "purple");
        assert_eq!(color_of(&c, SECTION_02), "blue");
    }

    #[test]
    fn rotation_skips_colour_outside_ring() {
        let mut c = started();
        let update = decode_palette(br#"{"section02":"white"}"#).unwrap();
        c.handle(ControlMessage::Palette(update));
        c.handle(ControlMessage::Mode(2));

        let outcome = c.tick();
        assert!(matches!(outcome, TickOutcome::Rotated { skipped: 1, .. }));
        assert_eq!(color_of(&c, SECTION_02), "white");
        assert_eq!(color_of(&c, SECTION_01), "green");
    }

    #[test]
    fn palette_change_during_rotation_reaches_leds() {
        let mut c = started();
        c.handle(ControlMessage::Mode(2));
        let update = decode_palette(br#"{"leftEar":"white","section02":"white"}"#).unwrap();
        c.handle(ControlMessage::Palette(update));

        for _ in 0..3 {
            c.tick();
        }

        assert_eq!(color_of(&c, LEFT_EAR), "white");
        assert_eq!(color_of(&c, SECTION_02), "white");
        let frame = c.output().last_frame().unwrap();
        // Ears at full brightness, main sections at quarter
        assert_eq!(frame[34], RGB8::new(255, 255, 255));
        assert_eq!(frame[8], RGB8::new(64, 64, 64));
        assert_eq!(frame[15], RGB8::new(64, 64, 64));
    }

    #[test]
    fn custom_timing_shortens_blend() {
        let mut c = started().with_timing(Timing {
            interval_ms: 1000,
            duration_ms: 100,
            frame_step_ms: 10,
        });
        c.handle(ControlMessage::Mode(2));
        assert_eq!(
            c.tick(),
            TickOutcome::Rotated {
                frames: 11,
                skipped: 0
            }
        );
    }

    #[test]
    fn messages_route_through_topics() {
        let mut c = started();
        let topics = Topics::default();
        let message = topics
            .decode("studio-logo/mode", br#"{"mode":2}"#)
            .unwrap()
            .unwrap();
        c.handle(message);
        assert_eq!(c.state().mode(), 2);
    }

    #[test]
    fn scheduler_interval() {
        let mut s = TickScheduler::new(10_000, 0);
        assert!(!s.due(9_999));
        assert_eq!(s.remaining(9_999), 1);
        assert!(s.due(10_000));
        assert!(!s.due(10_001));
        assert_eq!(s.remaining(10_001), 9_999);
        assert!(s.due(25_000));
        assert_eq!(s.remaining(25_000), 10_000);
    }

    #[test]
    fn scheduler_wraps() {
        let start = u64::MAX - 5;
        let mut s = TickScheduler::new(10_000, start);
        assert!(!s.due(start.wrapping_add(9_999)));
        assert!(s.due(start.wrapping_add(10_000)));
    }
}
