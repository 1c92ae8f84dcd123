//! Saving and restoring the mode and section colours.
//!
//! Layout: key `mode` holds a `u8`; each section name is a key holding its
//! colour name. Writes are grouped and closed with a single commit.

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::palette::Palette;
use crate::sections::{SectionColorMap, SectionStore};

pub const MODE_KEY: &str = "mode";

/// Mode used when nothing has been persisted yet.
pub const DEFAULT_MODE: u8 = 0;

/// Non-volatile key/value storage with an explicit commit boundary.
pub trait KeyValueStore {
    fn get_u8(&self, key: &str) -> Result<Option<u8>>;
    fn set_u8(&mut self, key: &str, value: u8) -> Result<()>;
    fn get_str(&self, key: &str) -> Result<Option<String>>;
    fn set_str(&mut self, key: &str, value: &str) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
}

/// A value waiting in a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedValue {
    U8(u8),
    Str(String),
}

/// Writes queued in order until a store flushes them.
///
/// A failed flush keeps the failing entry and everything behind it queued, so
/// the next commit retries them instead of leaving a partial group behind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    entries: Vec<(String, StagedValue)>,
}

impl WriteBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, key: &str, value: StagedValue) {
        self.entries.push((key.to_string(), value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand each entry to `write` in order. Returns how many were written.
    pub fn flush<F>(&mut self, mut write: F) -> Result<usize>
    where
        F: FnMut(&str, &StagedValue) -> Result<()>,
    {
        let failure = self
            .entries
            .iter()
            .enumerate()
            .find_map(|(i, (key, value))| write(key, value).err().map(|e| (i, e)));

        match failure {
            None => {
                let written = self.entries.len();
                self.entries.clear();
                Ok(written)
            }
            Some((written, e)) => {
                self.entries.drain(..written);
                warn!("{} writes left queued after: {e}", self.entries.len());
                Err(e)
            }
        }
    }
}

/// Outcome of [`Persistence::hydrate`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Hydration {
    /// Sections whose colour was restored.
    pub restored: usize,
    /// Sections with nothing stored; left unchanged.
    pub missing: usize,
    /// Entries that could not be used; left unchanged.
    pub errors: Vec<Error>,
}

pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn save_mode(&mut self, mode: u8) -> Result<()> {
        self.store.set_u8(MODE_KEY, mode)?;
        self.store.commit()?;
        info!("Saved mode {mode}");
        Ok(())
    }

    /// Stored mode, or [`DEFAULT_MODE`] if absent or unreadable.
    pub fn load_mode(&self) -> u8 {
        match self.store.get_u8(MODE_KEY) {
            Ok(Some(mode)) => {
                info!("Loaded mode {mode}");
                mode
            }
            Ok(None) => {
                info!("No stored mode, using {DEFAULT_MODE}");
                DEFAULT_MODE
            }
            Err(e) => {
                warn!("Failed to load mode: {e}, using {DEFAULT_MODE}");
                DEFAULT_MODE
            }
        }
    }

    /// Write every entry of `map`, then commit once.
    pub fn save_sections(&mut self, map: &SectionColorMap) -> Result<()> {
        for (section, color) in map {
            self.store.set_str(section, color)?;
            debug!("Staged '{section}' = '{color}'");
        }
        self.store.commit()?;
        info!("Saved {} section colours", map.len());
        Ok(())
    }

    /// Restore every registry section that has a stored, known colour.
    ///
    /// Sections with nothing stored keep their current value, as do entries
    /// naming a colour the registry does not know.
    pub fn hydrate(&self, palette: &Palette, sections: &mut SectionStore) -> Hydration {
        let mut outcome = Hydration::default();
        for section in palette.section_names() {
            match self.store.get_str(section) {
                Ok(Some(color)) if palette.has_color(&color) => {
                    debug!("Restored '{section}' = '{color}'");
                    sections.set(section, color);
                    outcome.restored += 1;
                }
                Ok(Some(color)) => {
                    let e = Error::unknown_color(&color);
                    warn!("Not restoring '{section}': {e}");
                    outcome.errors.push(e);
                }
                Ok(None) => {
                    debug!("Nothing stored for '{section}'");
                    outcome.missing += 1;
                }
                Err(e) => {
                    warn!("Failed to read '{section}': {e}");
                    outcome.errors.push(e);
                }
            }
        }
        info!(
            "Restored {} section colours ({} missing, {} errors)",
            outcome.restored,
            outcome.missing,
            outcome.errors.len()
        );
        outcome
    }
}
