//! Palette registry: named colours, named LED sections and the fixed
//! rotation orders.
//!
//! The registry is built once and is read-only afterwards. Every colour name
//! stored anywhere else in the engine must resolve here.

use std::collections::HashMap;
use std::ops::RangeInclusive;

use indexmap::IndexMap;
use rgb::RGB8;

use crate::error::{Error, Result};
use crate::sections::SectionColorMap;

pub const SECTION_01: &str = "section01";
pub const SECTION_02: &str = "section02";
pub const SECTION_03: &str = "section03";
pub const SECTION_04: &str = "section04";
pub const SECTION_05: &str = "section05";
pub const LEFT_EAR: &str = "leftEar";
pub const RIGHT_EAR: &str = "rightEar";

/// Main ring sections in physical order.
pub const MAIN_SECTIONS: [&str; 5] = [SECTION_01, SECTION_02, SECTION_03, SECTION_04, SECTION_05];

/// Ear sections, left to right.
pub const EAR_SECTIONS: [&str; 2] = [LEFT_EAR, RIGHT_EAR];

/// Colour rotation order for the main ring.
pub const RING_ORDER: [&str; 5] = ["blue", "green", "yellow", "red", "purple"];

/// Ear colours, left to right.
pub const EAR_ORDER: [&str; 2] = ["orange", "lighterGreen"];

/// Number of pixels on the sign.
pub const STRIP_LEN: usize = 44;

const MAIN_BRIGHTNESS: f32 = 0.25;
const EAR_BRIGHTNESS: f32 = 1.0;

/// A contiguous run of pixels sharing one colour and brightness factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedSection {
    first: usize,
    last: usize,
    brightness: f32,
}

impl LedSection {
    /// `first..=last` is inclusive; `brightness` must lie in `[0.0, 1.0]`.
    pub fn new(first: usize, last: usize, brightness: f32) -> Result<Self> {
        if first > last {
            return Err(Error::invalid_palette(format!(
                "section range {first}..={last} is reversed"
            )));
        }
        if !(0.0..=1.0).contains(&brightness) {
            return Err(Error::invalid_palette(format!(
                "brightness {brightness} outside [0, 1]"
            )));
        }
        Ok(Self {
            first,
            last,
            brightness,
        })
    }

    #[must_use]
    pub const fn first(&self) -> usize {
        self.first
    }

    #[must_use]
    pub const fn last(&self) -> usize {
        self.last
    }

    #[must_use]
    pub const fn brightness(&self) -> f32 {
        self.brightness
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.last - self.first + 1
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub const fn range(&self) -> RangeInclusive<usize> {
        self.first..=self.last
    }

    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

/// Read-only lookup tables for colours, sections and rotation order.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: IndexMap<String, RGB8>,
    sections: IndexMap<String, LedSection>,
    ring: Vec<String>,
    /// Colour name -> index into `ring`, built once at construction.
    ring_positions: HashMap<String, usize>,
    main_sections: Vec<String>,
    ear_sections: Vec<String>,
    ear_order: Vec<String>,
}

impl Palette {
    #[must_use]
    pub fn builder() -> PaletteBuilder {
        PaletteBuilder::default()
    }

    /// The registry for the studio logo sign.
    pub fn studio_logo() -> Result<Self> {
        Self::builder()
            .color("blue", RGB8::new(0, 0, 255))
            .color("green", RGB8::new(0, 255, 0))
            .color("lighterGreen", RGB8::new(20, 255, 20))
            .color("yellow", RGB8::new(255, 255, 0))
            .color("red", RGB8::new(255, 0, 0))
            .color("orange", RGB8::new(255, 165, 0))
            .color("purple", RGB8::new(128, 0, 128))
            .color("white", RGB8::new(255, 255, 255))
            .section(SECTION_01, LedSection::new(0, 7, MAIN_BRIGHTNESS)?)
            .section(SECTION_02, LedSection::new(8, 15, MAIN_BRIGHTNESS)?)
            .section(RIGHT_EAR, LedSection::new(16, 17, EAR_BRIGHTNESS)?)
            .section(SECTION_03, LedSection::new(18, 25, MAIN_BRIGHTNESS)?)
            .section(SECTION_04, LedSection::new(26, 33, MAIN_BRIGHTNESS)?)
            .section(LEFT_EAR, LedSection::new(34, 35, EAR_BRIGHTNESS)?)
            .section(SECTION_05, LedSection::new(36, 43, MAIN_BRIGHTNESS)?)
            .ring(&RING_ORDER)
            .main_sections(&MAIN_SECTIONS)
            .ears(&EAR_SECTIONS, &EAR_ORDER)
            .build()
    }

    pub fn color_of(&self, name: &str) -> Result<RGB8> {
        self.colors
            .get(name)
            .copied()
            .ok_or_else(|| Error::unknown_color(name))
    }

    pub fn section_of(&self, name: &str) -> Result<&LedSection> {
        self.sections
            .get(name)
            .ok_or_else(|| Error::unknown_section(name))
    }

    #[must_use]
    pub fn has_color(&self, name: &str) -> bool {
        self.colors.contains_key(name)
    }

    #[must_use]
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Position of `color` in the ring order, if it takes part in rotation.
    #[must_use]
    pub fn ring_position(&self, color: &str) -> Option<usize> {
        self.ring_positions.get(color).copied()
    }

    #[must_use]
    pub fn ring(&self) -> &[String] {
        &self.ring
    }

    #[must_use]
    pub fn main_sections(&self) -> &[String] {
        &self.main_sections
    }

    #[must_use]
    pub fn ear_sections(&self) -> &[String] {
        &self.ear_sections
    }

    #[must_use]
    pub fn ear_order(&self) -> &[String] {
        &self.ear_order
    }

    /// Section names in registry order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn color_names(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }

    /// Smallest strip length that holds every section.
    #[must_use]
    pub fn min_strip_len(&self) -> usize {
        self.sections
            .values()
            .map(|s| s.last() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Startup assignment: ring colours onto the main sections one to one,
    /// ear colours onto the ears.
    #[must_use]
    pub fn startup_palette(&self) -> SectionColorMap {
        self.main_sections
            .iter()
            .zip(&self.ring)
            .chain(self.ear_sections.iter().zip(&self.ear_order))
            .map(|(section, color)| (section.clone(), color.clone()))
            .collect()
    }
}

/// Collects registry entries and validates them in [`PaletteBuilder::build`].
#[derive(Debug, Default, Clone)]
pub struct PaletteBuilder {
    colors: IndexMap<String, RGB8>,
    sections: IndexMap<String, LedSection>,
    ring: Vec<String>,
    main_sections: Vec<String>,
    ear_sections: Vec<String>,
    ear_order: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

impl PaletteBuilder {
    #[must_use]
    pub fn color(mut self, name: &str, rgb: RGB8) -> Self {
        self.colors.insert(name.to_string(), rgb);
        self
    }

    #[must_use]
    pub fn section(mut self, name: &str, section: LedSection) -> Self {
        self.sections.insert(name.to_string(), section);
        self
    }

    #[must_use]
    pub fn ring(mut self, colors: &[&str]) -> Self {
        self.ring = owned(colors);
        self
    }

    #[must_use]
    pub fn main_sections(mut self, sections: &[&str]) -> Self {
        self.main_sections = owned(sections);
        self
    }

    #[must_use]
    pub fn ears(mut self, sections: &[&str], colors: &[&str]) -> Self {
        self.ear_sections = owned(sections);
        self.ear_order = owned(colors);
        self
    }

    pub fn build(self) -> Result<Palette> {
        let entries: Vec<_> = self.sections.iter().collect();
        for (i, (name_a, a)) in entries.iter().enumerate() {
            for (name_b, b) in &entries[i + 1..] {
                if a.overlaps(b) {
                    return Err(Error::invalid_palette(format!(
                        "sections '{name_a}' and '{name_b}' overlap"
                    )));
                }
            }
        }

        if self.ring.is_empty() {
            return Err(Error::invalid_palette("rotation ring is empty"));
        }
        if self.ring.len() != self.main_sections.len() {
            return Err(Error::invalid_palette(format!(
                "ring has {} colours for {} main sections",
                self.ring.len(),
                self.main_sections.len()
            )));
        }
        if self.ear_sections.len() != self.ear_order.len() {
            return Err(Error::invalid_palette(format!(
                "{} ear colours for {} ear sections",
                self.ear_order.len(),
                self.ear_sections.len()
            )));
        }

        for color in self.ring.iter().chain(&self.ear_order) {
            if !self.colors.contains_key(color) {
                return Err(Error::unknown_color(color));
            }
        }
        for section in self.main_sections.iter().chain(&self.ear_sections) {
            if !self.sections.contains_key(section) {
                return Err(Error::unknown_section(section));
            }
        }

        let mut ring_positions = HashMap::with_capacity(self.ring.len());
        for (i, color) in self.ring.iter().enumerate() {
            if ring_positions.insert(color.clone(), i).is_some() {
                return Err(Error::invalid_palette(format!(
                    "colour '{color}' appears twice in the ring"
                )));
            }
        }

        Ok(Palette {
            colors: self.colors,
            sections: self.sections,
            ring: self.ring,
            ring_positions,
            main_sections: self.main_sections,
            ear_sections: self.ear_sections,
            ear_order: self.ear_order,
        })
    }
}
