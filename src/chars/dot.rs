//! Damage-over-time effects and their payloads.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::chars::attack::AttackList;
use crate::chars::states::StateFlags;
use crate::core::constants::DOT_PERIOD_SECONDS;
use crate::values::expr::EvalContext;
use crate::values::modifier::ModBlock;
use crate::values::{is_false, is_zero, Amount, FValue};

/// Request to spawn combatants when a dot ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonSpec {
    pub id: String,
    #[serde(default = "one_count", skip_serializing_if = "is_one_count")]
    pub count: u32,
}

fn one_count() -> u32 {
    1
}

fn is_one_count(v: &u32) -> bool {
    *v == 1
}

/// What a dot does on a full tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DotEffect {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<AttackList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summon: Option<SummonSpec>,
}

impl DotEffect {
    pub fn is_empty(&self) -> bool {
        self.damage.is_none()
            && self.healing.is_none()
            && self.attack.is_none()
            && self.summon.is_none()
    }
}

/// Branching payload: `condition` picks between success and failure effects
/// on every full tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DotConditional {
    pub condition: FValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<DotEffect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<DotEffect>,
}

/// A timed effect attached to one combatant.
///
/// The accumulator gathers sub-second frame time; effects fire only when a
/// whole period has passed. Duration counts down one period per full tick
/// unless the dot is permanent; it expires on the tick that empties it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dot {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Damage kind, also the resist/immunity channel.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub perm: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    acc: f64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub level: f64,
    /// Percent-roll gate (`"25%"`) evaluated once when the dot is applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chance: Option<String>,
    /// State bits held on the owner while this dot is active.
    #[serde(default, skip_serializing_if = "StateFlags::is_empty")]
    pub flags: StateFlags,
    #[serde(flatten)]
    pub effect: DotEffect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<DotConditional>,
    /// Triggered when the owner lands a hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_hit: Option<AttackList>,
    /// Triggered when the owner is missed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_miss: Option<AttackList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_expire: Option<AttackList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_death: Option<AttackList>,
    /// Freeze damage/heal readings at apply time.
    #[serde(default, skip_serializing_if = "is_false")]
    pub applyinstanced: bool,
    /// Mods pushed onto the owner while the dot is active, keyed off the
    /// dot's id so they revert together.
    #[serde(default, rename = "mod", skip_serializing_if = "Option::is_none")]
    pub mods: Option<ModBlock>,
    /// Identifier of whatever granted the dot (attack, item, aura).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Handle of the combatant that applied it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applier: Option<u32>,
}

impl Default for Dot {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            kind: String::new(),
            tags: BTreeSet::new(),
            duration: 0.0,
            perm: false,
            acc: 0.0,
            level: 0.0,
            chance: None,
            flags: StateFlags::empty(),
            effect: DotEffect::default(),
            conditional: None,
            on_hit: None,
            on_miss: None,
            on_expire: None,
            on_death: None,
            applyinstanced: false,
            mods: None,
            source: String::new(),
            applier: None,
        }
    }
}

impl Dot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Advance the accumulator; returns true when a whole period elapsed.
    /// At most one full tick fires per call, surplus stays accumulated.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.acc += dt;
        if self.acc < DOT_PERIOD_SECONDS {
            return false;
        }
        self.acc -= DOT_PERIOD_SECONDS;
        if !self.perm {
            self.duration -= DOT_PERIOD_SECONDS;
        }
        true
    }

    /// True once the countdown is spent; checked after a full tick fires.
    pub fn expired(&self) -> bool {
        !self.perm && self.duration <= 0.0
    }

    /// Re-applied dots stretch the running countdown.
    pub fn extend(&mut self, duration: f64) {
        self.duration += duration;
    }

    /// The payload this tick delivers: the conditional branch when one is
    /// present, the flat effect otherwise.
    pub fn tick_effect(&mut self, ctx: &EvalContext, rng: &mut impl Rng) -> DotEffect {
        if let Some(cond) = self.conditional.as_mut() {
            let success = cond.condition.evaluate(ctx, rng) != 0.0;
            let branch = if success {
                cond.on_success.as_ref()
            } else {
                cond.on_failure.as_ref()
            };
            return branch.cloned().unwrap_or_default();
        }
        self.effect.clone()
    }

    /// Fill holes from a template: existing fields win, flags and tags
    /// union.
    pub fn merge_safe(&mut self, template: &Dot) {
        if self.name.is_empty() {
            self.name = template.name.clone();
        }
        if self.kind.is_empty() {
            self.kind = template.kind.clone();
        }
        self.flags |= template.flags;
        for tag in &template.tags {
            self.tags.insert(tag.clone());
        }
        if self.duration == 0.0 {
            self.duration = template.duration;
        }
        if self.level == 0.0 {
            self.level = template.level;
        }
        if self.chance.is_none() {
            self.chance = template.chance.clone();
        }
        if self.effect.damage.is_none() {
            self.effect.damage = template.effect.damage.clone();
        }
        if self.effect.healing.is_none() {
            self.effect.healing = template.effect.healing.clone();
        }
        if self.effect.attack.is_none() {
            self.effect.attack = template.effect.attack.clone();
        }
        if self.effect.summon.is_none() {
            self.effect.summon = template.effect.summon.clone();
        }
        if self.conditional.is_none() {
            self.conditional = template.conditional.clone();
        }
        if self.on_hit.is_none() {
            self.on_hit = template.on_hit.clone();
        }
        if self.on_miss.is_none() {
            self.on_miss = template.on_miss.clone();
        }
        if self.on_expire.is_none() {
            self.on_expire = template.on_expire.clone();
        }
        if self.on_death.is_none() {
            self.on_death = template.on_death.clone();
        }
        if self.mods.is_none() {
            self.mods = template.mods.clone();
        }
        self.perm = self.perm || template.perm;
        self.applyinstanced = self.applyinstanced || template.applyinstanced;
    }

    /// Freeze dynamic damage/heal readings into constants.
    pub fn instantiate(&mut self, ctx: &EvalContext, rng: &mut impl Rng) {
        if let Some(damage) = self.effect.damage.as_mut() {
            damage.instantiate(ctx, rng);
        }
        if let Some(healing) = self.effect.healing.as_mut() {
            healing.instantiate(ctx, rng);
        }
    }

    pub fn has_tag_overlap(&self, other: &Dot) -> bool {
        self.tags.iter().any(|t| other.tags.contains(t))
    }
}

/// How content names a dot: by template id or written out inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DotSpec {
    Id(String),
    Inline(Box<Dot>),
}
