//! In-memory stand-ins for the hardware collaborators.
//!
//! Used by the unit tests and the host integration tests; nothing here touches
//! real hardware.

use std::cell::Cell;
use std::collections::HashMap;

use rgb::RGB8;

use crate::error::{Error, Result};
use crate::persistence::KeyValueStore;
use crate::render::LedOutput;
use crate::transition::FrameClock;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    U8(u8),
    Str(String),
}

/// Key/value store whose writes only become visible after [`commit`].
///
/// [`commit`]: KeyValueStore::commit
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: HashMap<String, Value>,
    staged: Vec<(String, Value)>,
    commits: usize,
    unavailable: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails while `unavailable` is set.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    #[must_use]
    pub const fn commits(&self) -> usize {
        self.commits
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty()
    }

    #[must_use]
    pub fn committed_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.committed.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check(&self) -> Result<()> {
        if self.unavailable {
            return Err(Error::PersistenceUnavailable {
                reason: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_u8(&self, key: &str) -> Result<Option<u8>> {
        self.check()?;
        match self.committed.get(key) {
            Some(Value::U8(v)) => Ok(Some(*v)),
            Some(Value::Str(_)) => Err(Error::PersistenceUnavailable {
                reason: format!("key '{key}' holds a string"),
            }),
            None => Ok(None),
        }
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<()> {
        self.check()?;
        self.staged.push((key.to_string(), Value::U8(value)));
        Ok(())
    }

    fn get_str(&self, key: &str) -> Result<Option<String>> {
        self.check()?;
        match self.committed.get(key) {
            Some(Value::Str(v)) => Ok(Some(v.clone())),
            Some(Value::U8(_)) => Err(Error::PersistenceUnavailable {
                reason: format!("key '{key}' holds a u8"),
            }),
            None => Ok(None),
        }
    }

    fn set_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.check()?;
        self.staged
            .push((key.to_string(), Value::Str(value.to_string())));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.check()?;
        self.committed.extend(self.staged.drain(..));
        self.commits += 1;
        Ok(())
    }
}

/// Output that keeps a copy of every frame it is shown.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    pub frames: Vec<Vec<RGB8>>,
    failing: bool,
}

impl RecordingOutput {
    /// An output whose every `show` fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            frames: Vec::new(),
            failing: true,
        }
    }

    #[must_use]
    pub fn last_frame(&self) -> Option<&[RGB8]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl LedOutput for RecordingOutput {
    fn show(&mut self, pixels: &[RGB8]) -> Result<()> {
        if self.failing {
            return Err(Error::OutputUnavailable {
                reason: "recording output set to fail".to_string(),
            });
        }
        self.frames.push(pixels.to_vec());
        Ok(())
    }
}

/// Virtual clock: time only moves when slept on (and, optionally, a fixed
/// amount on every read to model render latency).
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    tick_per_read: u64,
    pub slept_ms: u64,
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(now_ms: u64) -> Self {
        Self {
            now: Cell::new(now_ms),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tick_per_read(mut self, ms: u64) -> Self {
        self.tick_per_read = ms;
        self
    }

    pub fn advance(&mut self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl FrameClock for ManualClock {
    fn now_ms(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.tick_per_read);
        now
    }

    fn sleep_ms(&mut self, ms: u64) {
        self.slept_ms += ms;
        self.advance(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_hides_uncommitted_writes() {
        let mut store = MemoryStore::new();
        store.set_u8("mode", 2).unwrap();
        assert_eq!(store.get_u8("mode"), Ok(None));
        assert!(store.has_pending());

        store.commit().unwrap();
        assert_eq!(store.get_u8("mode"), Ok(Some(2)));
        assert_eq!(store.commits(), 1);
    }

    #[test]
    fn memory_store_type_mismatch() {
        let mut store = MemoryStore::new();
        store.set_str("mode", "two").unwrap();
        store.commit().unwrap();
        assert!(store.get_u8("mode").is_err());
    }

    #[test]
    fn unavailable_store_fails() {
        let mut store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(store.set_u8("mode", 1).is_err());
        assert!(store.commit().is_err());
    }
}
