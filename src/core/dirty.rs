//! Per-frame change tracking for stats.
//!
//! Consumers that mirror stats elsewhere poll [`Dirty::drain_changed`] once a
//! frame instead of hooking every write. Paths land in `changed` when a
//! recalculated stat produced a new value and in `modded` when a modifier was
//! attached or removed, regardless of whether the value moved.

use std::collections::BTreeSet;

/// Dirty-path bookkeeping for one character.
#[derive(Debug, Default, Clone)]
pub struct Dirty {
    changed: BTreeSet<String>,
    modded: BTreeSet<String>,
}

impl Dirty {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value change on `path`.
    pub fn mark_changed(&mut self, path: &str) {
        self.changed.insert(path.to_string());
    }

    /// Record a mod attach/detach on `path`.
    pub fn mark_modded(&mut self, path: &str) {
        self.modded.insert(path.to_string());
    }

    pub fn is_changed(&self, path: &str) -> bool {
        self.changed.contains(path)
    }

    pub fn is_modded(&self, path: &str) -> bool {
        self.modded.contains(path)
    }

    /// Take the changed set, leaving it empty.
    pub fn drain_changed(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.changed)
    }

    /// Take the modded set, leaving it empty.
    pub fn drain_modded(&mut self) -> BTreeSet<String> {
        std::mem::take(&mut self.modded)
    }

    pub fn clear(&mut self) {
        self.changed.clear();
        self.modded.clear();
    }
}
