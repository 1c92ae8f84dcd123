//! Current colour per section.
//!
//! This map is the source of truth for what the sign shows. The pixel buffer
//! is always re-derived from it and never read back.

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Section name -> colour name, in insertion order.
pub type SectionColorMap = IndexMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionStore {
    colors: SectionColorMap,
}

impl SectionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current colour of `section`. Unset sections are an error rather than a
    /// silent default.
    pub fn get(&self, section: &str) -> Result<&str> {
        self.colors
            .get(section)
            .map(String::as_str)
            .ok_or_else(|| Error::unknown_section(section))
    }

    pub fn set(&mut self, section: impl Into<String>, color: impl Into<String>) {
        self.colors.insert(section.into(), color.into());
    }

    #[must_use]
    pub fn snapshot_all(&self) -> SectionColorMap {
        self.colors.clone()
    }

    pub fn replace_all(&mut self, map: SectionColorMap) {
        self.colors = map;
    }

    /// Overwrite only the sections present in `map`.
    pub fn merge(&mut self, map: SectionColorMap) {
        self.colors.extend(map);
    }

    #[must_use]
    pub fn as_map(&self) -> &SectionColorMap {
        &self.colors
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.colors.iter().map(|(s, c)| (s.as_str(), c.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
