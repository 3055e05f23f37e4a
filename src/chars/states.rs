//! Status flag bitmask with cause tracking.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

bitflags! {
    /// Status bits a combatant can carry while dots are active on it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StateFlags: u32 {
        const NO_ATTACK = 1;
        const NO_DEFEND = 2;
        const NO_SPELLS = 4;
        const CONFUSED = 8;
        const CHARMED = 16;
        const TAUNT = 32;
        const HIDE = 64;
        const DEFENSIVE = 128;
        const NO_ONEXPIRE = 256;
        const NO_ONDEATH = 512;
        const NO_ONHIT = 1024;
        const NO_ONMISS = 2048;

        const NO_ACT = Self::NO_ATTACK.bits() | Self::NO_DEFEND.bits() | Self::NO_SPELLS.bits();
        const IMMOBILE = Self::NO_ATTACK.bits() | Self::TAUNT.bits();
        const NO_COUNTER = Self::NO_ONHIT.bits() | Self::NO_ONMISS.bits();
    }
}

// Content JSON spells flag sets as `"NO_ATTACK | NO_SPELLS"`.
impl Serialize for StateFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for StateFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

impl StateFlags {
    /// Short label for event text.
    pub fn describe(self) -> &'static str {
        if self.contains(StateFlags::CONFUSED) {
            "confused"
        } else if self.contains(StateFlags::CHARMED) {
            "charmed"
        } else if self.contains(StateFlags::TAUNT) {
            "taunting"
        } else if self.contains(StateFlags::HIDE) {
            "hidden"
        } else if self.contains(StateFlags::DEFENSIVE) {
            "defensive"
        } else if self.intersects(StateFlags::NO_ACT) {
            "unable to act"
        } else {
            "afflicted"
        }
    }
}

/// Active status bits plus, per bit, the ordered list of dot ids that caused
/// it. A bit is set exactly while its cause list is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct States {
    #[serde(default, skip_serializing_if = "StateFlags::is_empty")]
    flags: StateFlags,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    causes: BTreeMap<u32, Vec<String>>,
}

impl States {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(&self) -> StateFlags {
        self.flags
    }

    pub fn has(&self, flags: StateFlags) -> bool {
        self.flags.intersects(flags)
    }

    /// Register a dot as the cause of every bit in `flags`.
    pub fn add(&mut self, dot_id: &str, flags: StateFlags) {
        for bit in flags.iter() {
            let list = self.causes.entry(bit.bits()).or_default();
            if !list.iter().any(|id| id == dot_id) {
                list.push(dot_id.to_string());
            }
            self.flags |= bit;
        }
    }

    /// Withdraw a dot from every bit it causes, clearing bits whose cause
    /// list drains empty.
    pub fn remove(&mut self, dot_id: &str) {
        let mut cleared = Vec::new();
        for (bit, list) in self.causes.iter_mut() {
            list.retain(|id| id != dot_id);
            if list.is_empty() {
                cleared.push(*bit);
            }
        }
        for bit in cleared {
            self.causes.remove(&bit);
            self.flags &= !StateFlags::from_bits_truncate(bit);
        }
    }

    /// The first dot blamed for any bit of `flags`, if one is set.
    pub fn cause_of(&self, flags: StateFlags) -> Option<&str> {
        for bit in flags.iter() {
            if let Some(first) = self.causes.get(&bit.bits()).and_then(|l| l.first()) {
                return Some(first.as_str());
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn clear(&mut self) {
        self.flags = StateFlags::empty();
        self.causes.clear();
    }
}
