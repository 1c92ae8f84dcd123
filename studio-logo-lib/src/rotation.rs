//! Next-colour computation for the main ring.
//!
//! Each main section steps independently to its colour's successor (or
//! predecessor) in the ring order. Ears are not part of the ring and are
//! carried through unchanged.

use log::{debug, warn};

use crate::error::Error;
use crate::palette::Palette;
use crate::sections::SectionColorMap;
use crate::transition::Transition;

/// Result of one rotation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rotation {
    /// Full assignment after the step, non-ring sections included.
    pub assignment: SectionColorMap,
    /// One entry per section that actually moved.
    pub transitions: Vec<Transition>,
    /// Sections left unchanged because their colour could not be placed.
    pub skipped: Vec<Error>,
}

/// Ring index one step away from `index`.
///
/// The anti-clockwise wrap from 0 is explicit rather than relying on signed
/// modulo.
#[must_use]
pub const fn step(index: usize, len: usize, anti_clockwise: bool) -> usize {
    if anti_clockwise {
        if index == 0 {
            len - 1
        } else {
            index - 1
        }
    } else {
        (index + 1) % len
    }
}

/// Compute the assignment one rotation step away from `current`.
#[must_use]
pub fn next_assignment(palette: &Palette, current: &SectionColorMap, anti_clockwise: bool) -> Rotation {
    let ring = palette.ring();
    let mut rotation = Rotation {
        assignment: current.clone(),
        ..Rotation::default()
    };

    for section in palette.main_sections() {
        let Some(color) = current.get(section) else {
            let e = Error::unknown_section(section);
            warn!("Not rotating '{section}': {e}");
            rotation.skipped.push(e);
            continue;
        };
        let Some(index) = palette.ring_position(color) else {
            let e = Error::RotationLookupFailure {
                section: section.clone(),
                color: color.clone(),
            };
            warn!("Not rotating: {e}");
            rotation.skipped.push(e);
            continue;
        };

        let next = &ring[step(index, ring.len(), anti_clockwise)];
        // Ring colours are validated against the registry at build time
        let endpoints = palette
            .color_of(color)
            .and_then(|start| palette.color_of(next).map(|end| (start, end)));
        let (start, end) = match endpoints {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!("Not rotating '{section}': {e}");
                rotation.skipped.push(e);
                continue;
            }
        };

        debug!("Rotating '{section}' from '{color}' {start:?} to '{next}' {end:?}");
        rotation.transitions.push(Transition {
            section: section.clone(),
            start,
            end,
        });
        rotation.assignment.insert(section.clone(), next.clone());
    }

    rotation
}
