//! Colour engine for the studio logo sign
//!
//! This library holds everything that decides what the sign shows: the palette
//! registry, the per-section colour map, brightness-scaled rendering, ring
//! rotation with timed blends, persistence of mode and colours, and decoding of
//! control messages. It is hardware-agnostic; the firmware supplies the LED
//! output, key/value store and clock through the traits defined here.

pub use rgb::RGB8;

pub mod control;
pub mod controller;
pub mod error;
pub mod palette;
pub mod persistence;
pub mod power;
pub mod render;
pub mod rotation;
pub mod sections;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transition;

pub use control::{ControlMessage, PaletteUpdate, Topics};
pub use controller::{Controller, ControllerState, Mode, TickOutcome, TickScheduler, Timing};
pub use error::{Error, Result};
pub use palette::{LedSection, Palette, STRIP_LEN};
pub use persistence::{KeyValueStore, Persistence, StagedValue, WriteBatch};
pub use power::PowerBudget;
pub use render::LedOutput;
pub use sections::{SectionColorMap, SectionStore};
pub use transition::{FrameClock, Transition, TransitionStats};
