//! Attack payloads and target selection descriptors.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::chars::dot::DotSpec;
use crate::values::modifier::ModBlock;
use crate::values::{is_false, is_zero, Amount};

bitflags! {
    /// Which roster slots an attack may target. Empty means the actor
    /// itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TargetFlags: u32 {
        const ALLY_LEADER = 1;
        const ALLY_MINIONS = 2;
        const ENEMY_LEADER = 4;
        const ENEMY_MINIONS = 8;
        const NOT_SELF = 16;
        const USE_MAX_COMBATANTS = 32;

        const ALLIES = Self::ALLY_LEADER.bits() | Self::ALLY_MINIONS.bits();
        const ENEMIES = Self::ENEMY_LEADER.bits() | Self::ENEMY_MINIONS.bits();
        const ALL = Self::ALLIES.bits() | Self::ENEMIES.bits();
    }
}

// Content JSON spells target masks as `"ENEMY_LEADER | ENEMY_MINIONS"`.
impl Serialize for TargetFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for TargetFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

impl TargetFlags {
    /// True when the selection can reach the opposing roster.
    pub fn hostile(self) -> bool {
        self.intersects(TargetFlags::ENEMIES)
    }

    /// True for the empty mask, which targets the actor itself.
    pub fn is_self(self) -> bool {
        self.is_empty()
    }
}

/// Dot-presence check used when reordering candidate targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffectedBy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// When set, a failed check excludes the candidate entirely instead of
    /// demoting it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub strict: bool,
}

/// Identity filter restricting which candidates an attack may touch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnlyFilter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// Roster position: the side's leader is 0, minions count from 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
}

/// Stat-driven target ordering for an attack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Stat path compared between candidates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stat: String,
    /// Sort descending (target the highest) instead of ascending.
    #[serde(default, skip_serializing_if = "is_false")]
    pub highest: bool,
    /// Compare current/max ratio instead of the raw value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub usepercentage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affectedby: Option<AffectedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notaffectedby: Option<AffectedBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<OnlyFilter>,
}

/// Resource costs keyed by pool name, e.g. `{ "mana": 10 }`.
pub type Cost = BTreeMap<String, f64>;

/// An attack, spell or triggered effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Damage kind, also the resist channel (`"fire"`, `"poison"`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing: Option<Amount>,
    /// Flat damage added on top of the attacker's per-kind bonus.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bonus: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub tohit: f64,
    #[serde(default, skip_serializing_if = "TargetFlags::is_empty")]
    pub targets: TargetFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targetspec: Option<TargetSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_targets: Option<usize>,
    /// Sub-hits resolved against their own targets when this attack lands.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hits: Vec<Attack>,
    /// How many times the sub-hit list repeats.
    #[serde(default = "one_u32", skip_serializing_if = "is_one_u32")]
    pub repeathits: u32,
    /// Dot applied to targets this attack connects with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot: Option<DotSpec>,
    /// Potency multipliers looked up on the attacker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potencies: Vec<String>,
    /// Connects without a hit roll and never counts as hostile contact.
    #[serde(default, skip_serializing_if = "is_false")]
    pub harmless: bool,
    /// Cannot be answered by thorns/reflect or on-miss counters.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unreflectable: bool,
    /// Skips the defender's defense curve.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nodefense: bool,
    /// Resolves silently: no action events are emitted for it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nologs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hit: Option<AttackList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_miss: Option<AttackList>,
    /// Mods applied to a target the attack connects with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ModBlock>,
    /// Mods granted to whoever acquires the carrying item; the item layer
    /// consumes these, combat only carries them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire: Option<ModBlock>,
}

fn one_u32() -> u32 {
    1
}

fn is_one_u32(v: &u32) -> bool {
    *v == 1
}

impl Default for Attack {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: String::new(),
            damage: None,
            healing: None,
            bonus: 0.0,
            tohit: 0.0,
            targets: TargetFlags::empty(),
            targetspec: None,
            max_targets: None,
            hits: Vec::new(),
            repeathits: 1,
            dot: None,
            potencies: Vec::new(),
            harmless: false,
            unreflectable: false,
            nodefense: false,
            nologs: false,
            cost: None,
            on_hit: None,
            on_miss: None,
            result: None,
            acquire: None,
        }
    }
}

impl Attack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Copy id, name, kind and targets onto sub-hits that leave them unset.
    /// Runs again for nested composites.
    pub fn propagate_to_hits(&mut self) {
        let (id, name, kind, targets) = (
            self.id.clone(),
            self.name.clone(),
            self.kind.clone(),
            self.targets,
        );
        for hit in &mut self.hits {
            if hit.id.is_empty() {
                hit.id = id.clone();
            }
            if hit.name.is_empty() {
                hit.name = name.clone();
            }
            if hit.kind.is_empty() {
                hit.kind = kind.clone();
            }
            if hit.targets.is_empty() {
                hit.targets = targets;
            }
            hit.propagate_to_hits();
        }
    }

    /// Expanded sub-hit sequence: the hit list repeated `repeathits` times.
    pub fn expanded_hits(&self) -> Vec<Attack> {
        let repeats = self.repeathits.max(1) as usize;
        let mut out = Vec::with_capacity(self.hits.len() * repeats);
        for _ in 0..repeats {
            out.extend(self.hits.iter().cloned());
        }
        out
    }
}

/// One attack or several; content writes either a single object or an array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttackList(pub Vec<Attack>);

impl AttackList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Attack> {
        self.0.iter_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attack> {
        self.0.iter()
    }

    /// Flatten for resolution: composites contribute their repeated sub-hit
    /// sequence, plain attacks contribute themselves `repeathits` times.
    pub fn expanded_hits(&self) -> Vec<Attack> {
        let mut out = Vec::new();
        for attack in &self.0 {
            if attack.hits.is_empty() {
                for _ in 0..attack.repeathits.max(1) {
                    out.push(attack.clone());
                }
            } else {
                out.extend(attack.expanded_hits());
            }
        }
        out
    }
}

impl From<Attack> for AttackList {
    fn from(attack: Attack) -> Self {
        Self(vec![attack])
    }
}

impl Serialize for AttackList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.0.len() == 1 {
            self.0[0].serialize(serializer)
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for AttackList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(Box<Attack>),
            Many(Vec<Attack>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(a) => AttackList(vec![*a]),
            Repr::Many(v) => AttackList(v),
        })
    }
}
