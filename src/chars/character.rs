//! The combatant: pools, stats, active dots, status flags, and the
//! machinery that keeps them consistent while the battle ticks.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::chars::attack::{Attack, AttackList, TargetFlags};
use crate::chars::context::Context;
use crate::chars::dot::{Dot, DotSpec, SummonSpec};
use crate::chars::states::{StateFlags, States};
use crate::combat::events::{CombatEvent, EventSink};
use crate::combat::resolve::resist_multiplier;
use crate::core::constants::{DOT_ID_PREFIX, MOD_CASCADE_DEPTH, RESIST_CURVE_BASE};
use crate::core::Dirty;
use crate::data::GameData;
use crate::values::{is_zero, EvalContext, ModBlock, PointStat, Stat};

/// Which roster a combatant fights on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    #[default]
    Npc,
    Player,
}

impl Team {
    pub fn index(self) -> usize {
        match self {
            Team::Npc => 0,
            Team::Player => 1,
        }
    }

    pub fn other(self) -> Team {
        match self {
            Team::Npc => Team::Player,
            Team::Player => Team::Npc,
        }
    }
}

/// What produced a queued attack, for event labelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSource {
    /// The combatant's own swing.
    Turn,
    /// A damage-over-time payload, labelled with the dot's display name.
    Dot(String),
    /// An on-hit / on-miss / on-expire / on-death chain.
    Trigger(String),
    /// An item being used mid-battle.
    Item(String),
}

/// Work a character hands back to the battle loop during its update.
#[derive(Debug, Clone)]
pub enum Pending {
    Attacks {
        attacker: u32,
        attacks: Vec<Attack>,
        source: ActionSource,
    },
    Summon {
        owner: u32,
        spec: SummonSpec,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Char {
    /// Arena handle, unique within one battle.
    pub uid: u32,
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub team: Team,
    #[serde(skip_serializing_if = "is_zero")]
    pub level: f64,
    pub hp: PointStat,
    #[serde(skip_serializing_if = "PointStat::is_empty")]
    pub barrier: PointStat,
    pub tohit: Stat,
    pub defense: Stat,
    pub dodge: Stat,
    pub speed: Stat,
    /// Flat damage bonus per damage kind.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bonuses: BTreeMap<String, Stat>,
    /// Resistance per damage kind; negative values amplify.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resists: BTreeMap<String, Stat>,
    /// Damage-kind multipliers, neutral at 1.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub potencies: BTreeMap<String, Stat>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub immunities: BTreeSet<String>,
    #[serde(skip_serializing_if = "AttackList::is_empty")]
    pub attack: AttackList,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dots: Vec<Dot>,
    #[serde(skip_serializing_if = "States::is_empty")]
    pub states: States,
    #[serde(skip_serializing_if = "Context::is_empty")]
    pub context: Context,
    /// Attack timer; an action window opens each time it crosses 1.
    #[serde(skip_serializing_if = "is_zero")]
    timer: f64,
    #[serde(skip)]
    pub dirty: Dirty,
}

impl Default for Char {
    fn default() -> Self {
        Self::new("", "", 1.0)
    }
}

impl Char {
    pub fn new(id: impl Into<String>, name: impl Into<String>, hp: f64) -> Self {
        Char {
            uid: 0,
            id: id.into(),
            name: name.into(),
            team: Team::Npc,
            level: 0.0,
            hp: PointStat::new(hp),
            barrier: PointStat::new(0.0),
            tohit: Stat::new(0.0),
            defense: Stat::new(0.0),
            dodge: Stat::new(0.0),
            speed: Stat::new(1.0),
            bonuses: BTreeMap::new(),
            resists: BTreeMap::new(),
            potencies: BTreeMap::new(),
            immunities: BTreeSet::new(),
            attack: AttackList::default(),
            dots: Vec::new(),
            states: States::new(),
            context: Context::new(),
            timer: 0.0,
            dirty: Dirty::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn alive(&self) -> bool {
        !self.hp.is_empty()
    }

    pub fn can_defend(&self) -> bool {
        !self.states.has(StateFlags::NO_DEFEND)
    }

    /// Dot name blamed for a blocked basic attack, if any.
    pub fn attack_block_cause(&self) -> Option<&str> {
        if self.states.has(StateFlags::NO_ATTACK) {
            self.states
                .cause_of(StateFlags::NO_ATTACK)
                .or(Some("unknown"))
        } else {
            None
        }
    }

    /// Dot name blamed for blocked spellcasting, if any.
    pub fn spell_block_cause(&self) -> Option<&str> {
        if self.states.has(StateFlags::NO_SPELLS) {
            self.states
                .cause_of(StateFlags::NO_SPELLS)
                .or(Some("unknown"))
        } else {
            None
        }
    }

    pub fn is_immune(&self, kind: &str) -> bool {
        !kind.is_empty() && self.immunities.contains(kind)
    }

    pub fn resist_value(&self, kind: &str) -> f64 {
        self.resists.get(kind).map(Stat::value).unwrap_or(0.0)
    }

    pub fn bonus_value(&self, kind: &str) -> f64 {
        self.bonuses.get(kind).map(Stat::value).unwrap_or(0.0)
    }

    /// Product of the named potency multipliers; absent names are neutral.
    pub fn potency_factor(&self, names: &[String]) -> f64 {
        names
            .iter()
            .filter_map(|n| self.potencies.get(n))
            .map(Stat::value)
            .product()
    }

    pub fn get_hit(&self) -> f64 {
        self.tohit.value()
    }

    /// Advance the attack timer by `speed * dt`; true when a swing is due.
    pub fn ready(&mut self, dt: f64) -> bool {
        self.timer += self.speed.value() * dt;
        if self.timer >= 1.0 {
            self.timer -= 1.0;
            true
        } else {
            false
        }
    }

    /// Queue one basic swing: a uniform pick from the attack list,
    /// refused outright while NO_ATTACK is up.
    pub fn swing(
        &mut self,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) -> bool {
        if self.states.has(StateFlags::NO_ATTACK) {
            let cause = self
                .states
                .cause_of(StateFlags::NO_ATTACK)
                .unwrap_or("unknown")
                .to_string();
            events.emit(CombatEvent::StateBlock {
                uid: self.uid,
                name: self.display_name().to_string(),
                action: "attack".to_string(),
                cause,
            });
            return false;
        }
        if self.attack.is_empty() {
            return false;
        }
        let pick = self.attack.0[rng.gen_range(0..self.attack.0.len())].clone();
        pending.push(Pending::Attacks {
            attacker: self.uid,
            attacks: AttackList::from(pick).expanded_hits(),
            source: ActionSource::Turn,
        });
        true
    }

    // ---- stat addressing ------------------------------------------------

    /// Read a stat by path. Unknown paths read as zero.
    pub fn stat_value(&self, path: &str) -> f64 {
        match path {
            "hp" => self.hp.value(),
            "hp.max" => self.hp.max_value(),
            "barrier" => self.barrier.value(),
            "barrier.max" => self.barrier.max_value(),
            "tohit" => self.tohit.value(),
            "defense" => self.defense.value(),
            "dodge" => self.dodge.value(),
            "speed" => self.speed.value(),
            "level" => self.level,
            _ => {
                if let Some(kind) = path.strip_prefix("bonus.") {
                    return self.bonus_value(kind);
                }
                if let Some(kind) = path.strip_prefix("resist.") {
                    return self.resist_value(kind);
                }
                if let Some(name) = path.strip_prefix("potency.") {
                    return self.potencies.get(name).map(Stat::value).unwrap_or(1.0);
                }
                if let Some(name) = path.strip_suffix(".max") {
                    if let Some(pool) = self.context.pool(name) {
                        return pool.max_value();
                    }
                }
                if let Some(pool) = self.context.pool(path) {
                    return pool.value();
                }
                self.context.stat_value(path)
            }
        }
    }

    /// Like `stat_value`, but pools read as their fill fraction. Used by
    /// percentage-based target comparisons ("lowest hp%" and friends).
    pub fn stat_fraction(&self, path: &str) -> f64 {
        match path {
            "hp" => self.hp.fraction(),
            "barrier" => self.barrier.fraction(),
            _ => {
                if let Some(pool) = self.context.pool(path) {
                    return pool.fraction();
                }
                self.stat_value(path)
            }
        }
    }

    fn stat_slot_mut(&mut self, path: &str) -> Option<&mut Stat> {
        match path {
            "hp" | "hp.max" => Some(self.hp.max_mut()),
            "barrier" | "barrier.max" => Some(self.barrier.max_mut()),
            "tohit" => Some(&mut self.tohit),
            "defense" => Some(&mut self.defense),
            "dodge" => Some(&mut self.dodge),
            "speed" => Some(&mut self.speed),
            "level" => None,
            _ => {
                if let Some(kind) = path.strip_prefix("bonus.") {
                    return Some(
                        self.bonuses
                            .entry(kind.to_string())
                            .or_insert_with(|| Stat::new(0.0)),
                    );
                }
                if let Some(kind) = path.strip_prefix("resist.") {
                    return Some(
                        self.resists
                            .entry(kind.to_string())
                            .or_insert_with(|| Stat::new(0.0)),
                    );
                }
                if let Some(name) = path.strip_prefix("potency.") {
                    return Some(
                        self.potencies
                            .entry(name.to_string())
                            .or_insert_with(|| Stat::new(1.0)),
                    );
                }
                if let Some(name) = path.strip_suffix(".max") {
                    if self.context.pool(name).is_some() {
                        return self.context.pool_mut(name).map(PointStat::max_mut);
                    }
                }
                if self.context.pool(path).is_some() {
                    return self.context.pool_mut(path).map(PointStat::max_mut);
                }
                Some(self.context.ensure_stat(path))
            }
        }
    }

    /// Pools never exceed their (possibly just lowered) maximum.
    fn clamp_pool_for(&mut self, path: &str) {
        if path == "hp" || path == "hp.max" {
            self.hp.clamp_to_max();
        } else if path == "barrier" || path == "barrier.max" {
            self.barrier.clamp_to_max();
        } else {
            let name = path.strip_suffix(".max").unwrap_or(path);
            if let Some(pool) = self.context.pool_mut(name) {
                pool.clamp_to_max();
            }
        }
    }

    // ---- mod application ------------------------------------------------

    /// Apply every entry of a mod block to this character's stats, stamped
    /// with `source` so the whole block can be reverted later. `amount`
    /// drives each mod's count.
    pub fn apply_mod_block(&mut self, block: &ModBlock, source: &str, amount: f64) {
        self.apply_block_inner(block, source, amount, 0);
    }

    fn apply_block_inner(&mut self, block: &ModBlock, source: &str, amount: f64, depth: usize) {
        if depth > MOD_CASCADE_DEPTH {
            warn!(source, "mod cascade too deep; dropping re-emit");
            return;
        }
        for (path, spec) in block.iter() {
            let mut m = spec.build(source);
            m.set_count(amount);
            let Some(stat) = self.stat_slot_mut(path) else {
                warn!(path, source, "mod targets a read-only slot");
                continue;
            };
            let changed = stat.add_mod(m);
            let value = stat.value();
            let emit = stat.emit_block().cloned();
            self.dirty.mark_modded(path);
            self.clamp_pool_for(path);
            if changed {
                self.dirty.mark_changed(path);
                if let Some(emitted) = emit {
                    self.apply_block_inner(&emitted, path, value, depth + 1);
                }
            }
        }
    }

    /// Revert a previously applied block by stripping mods stamped with
    /// `source` from every path it names.
    pub fn remove_mod_block(&mut self, block: &ModBlock, source: &str) {
        for (path, _) in block.iter() {
            self.remove_mods_at(path, source, 0);
        }
    }

    fn remove_mods_at(&mut self, path: &str, source: &str, depth: usize) {
        if depth > MOD_CASCADE_DEPTH {
            warn!(source, "mod cascade too deep; dropping re-emit");
            return;
        }
        let Some(stat) = self.stat_slot_mut(path) else {
            return;
        };
        let changed = stat.remove_mods(source);
        let value = stat.value();
        let emit = stat.emit_block().cloned();
        if changed {
            self.dirty.mark_modded(path);
            self.dirty.mark_changed(path);
            self.clamp_pool_for(path);
            if let Some(emitted) = emit {
                // the emitting stat moved, so its emitted counts move too
                self.apply_block_inner(&emitted, path, value, depth + 1);
            }
        }
    }

    // ---- dots -----------------------------------------------------------

    /// Attach a dot, running the full gauntlet: template resolution, state
    /// overlay merge, percent gate, id derivation, immunity and resistance,
    /// dedup against active dots, then registration.
    ///
    /// Returns true when the dot landed.
    #[allow(clippy::too_many_arguments)]
    pub fn add_dot(
        &mut self,
        spec: &DotSpec,
        source: &str,
        duration: Option<f64>,
        applier: Option<u32>,
        ctx: &EvalContext,
        data: &GameData,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
    ) -> bool {
        // 1. resolve the spec against the registry
        let mut dot = match spec {
            DotSpec::Id(id) => match data.dot(id) {
                Some(template) => template.clone(),
                None => {
                    warn!(id = id.as_str(), "unknown dot template");
                    return false;
                }
            },
            DotSpec::Inline(inline) => {
                let mut dot = (**inline).clone();
                if let Some(template) = data.dot(&dot.id) {
                    dot.merge_safe(template);
                }
                dot
            }
        };
        // 2. fold in a registered state overlay of the same id
        if let Some(overlay) = data.state_overlay(&dot.id) {
            dot.merge_safe(overlay);
        }
        if let Some(d) = duration {
            dot.duration = d;
        }
        // 3. percent gate
        if let Some(chance) = dot.chance.clone() {
            if !roll_percent(&chance, rng) {
                return false;
            }
        }
        // 4. stable id, falling back to the applying source
        if dot.id.is_empty() && !source.is_empty() {
            dot.id = format!("{}{}", DOT_ID_PREFIX, source);
        }
        if dot.id.is_empty() {
            warn!(source, "dot has no derivable id; dropping it");
            return false;
        }
        // 5. immunity and resistance, keyed by kind falling back to id
        let negate_key = if dot.kind.is_empty() {
            dot.id.clone()
        } else {
            dot.kind.clone()
        };
        if self.is_immune(&negate_key) {
            events.emit(CombatEvent::IsImmune {
                uid: self.uid,
                name: self.display_name().to_string(),
                kind: negate_key,
            });
            return false;
        }
        if self.roll_negate(&negate_key, rng) {
            events.emit(CombatEvent::Resisted {
                uid: self.uid,
                name: self.display_name().to_string(),
                kind: negate_key,
            });
            return false;
        }
        // 6. dedup: same id extends, tag overlap resolves by level
        if let Some(existing) = self.dots.iter_mut().find(|d| d.id == dot.id) {
            existing.extend(dot.duration);
            return true;
        }
        let mut displaced = Vec::new();
        for (i, existing) in self.dots.iter().enumerate() {
            if existing.has_tag_overlap(&dot) {
                if existing.level > dot.level {
                    return false;
                }
                displaced.push(i);
            }
        }
        for i in displaced.into_iter().rev() {
            let old = self.dots.remove(i);
            self.release_dot(&old, events);
        }
        // 7. freeze dynamic amounts when asked to
        if dot.applyinstanced {
            dot.instantiate(ctx, rng);
        }
        // 8. register
        dot.source = source.to_string();
        dot.applier = applier;
        if !dot.flags.is_empty() {
            self.states.add(&dot.id, dot.flags);
            events.emit(CombatEvent::CharState {
                uid: self.uid,
                name: self.display_name().to_string(),
                state: dot.flags.describe().to_string(),
                cause: dot.display_name().to_string(),
                active: true,
            });
        }
        if let Some(block) = dot.mods.clone() {
            self.apply_mod_block(&block, &dot.id, 1.0);
        }
        self.dots.push(dot);
        true
    }

    /// Resistance roll against a damage kind: chance `res / (base + res)`.
    fn roll_negate(&self, kind: &str, rng: &mut impl Rng) -> bool {
        let res = self.resist_value(kind);
        if res <= 0.0 {
            return false;
        }
        rng.gen::<f64>() < res / (RESIST_CURVE_BASE + res)
    }

    pub fn has_dot(&self, id: &str) -> bool {
        self.dots.iter().any(|d| d.id == id)
    }

    pub fn has_dot_tag(&self, tag: &str) -> bool {
        self.dots.iter().any(|d| d.tags.contains(tag))
    }

    pub fn has_dot_kind(&self, kind: &str) -> bool {
        self.dots.iter().any(|d| d.kind == kind)
    }

    /// Tick every active dot; fire payloads on whole-period boundaries and
    /// sweep out dots whose duration ran dry on this very boundary.
    pub fn update(
        &mut self,
        dt: f64,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) {
        if self.dots.is_empty() {
            return;
        }
        let was_alive = self.alive();
        let ctx = self.eval_context();
        let mut fired = Vec::new();
        for i in 0..self.dots.len() {
            if self.dots[i].tick(dt) {
                fired.push(i);
            }
        }
        for &i in &fired {
            let mut effect = self.dots[i].tick_effect(&ctx, rng);
            let dot_name = self.dots[i].display_name().to_string();
            let kind = if self.dots[i].kind.is_empty() {
                self.dots[i].id.clone()
            } else {
                self.dots[i].kind.clone()
            };
            let mut dealt = 0.0;
            let mut healed = 0.0;
            if let Some(damage) = &mut effect.damage {
                dealt = self.take_periodic_damage(damage.roll(&ctx, rng), &kind);
            }
            if let Some(healing) = &mut effect.healing {
                healed = healing.roll(&ctx, rng);
                self.heal(healed);
            }
            if dealt != 0.0 || healed != 0.0 {
                events.emit(CombatEvent::DotAction {
                    uid: self.uid,
                    name: self.display_name().to_string(),
                    dot: dot_name.clone(),
                    damage: dealt,
                    healing: healed,
                });
            }
            if let Some(list) = &effect.attack {
                pending.push(Pending::Attacks {
                    attacker: self.uid,
                    attacks: list.expanded_hits(),
                    source: ActionSource::Dot(dot_name.clone()),
                });
            }
            if let Some(summon) = &effect.summon {
                pending.push(Pending::Summon {
                    owner: self.uid,
                    spec: summon.clone(),
                });
            }
        }
        for &i in fired.iter().rev() {
            if self.dots[i].expired() {
                self.expire_dot(i, events, pending);
            }
        }
        if was_alive && !self.alive() {
            events.emit(CombatEvent::CharDied {
                uid: self.uid,
                name: self.display_name().to_string(),
            });
        }
    }

    fn expire_dot(&mut self, index: usize, events: &mut dyn EventSink, pending: &mut Vec<Pending>) {
        let dot = self.dots.remove(index);
        self.release_dot(&dot, events);
        if !self.states.has(StateFlags::NO_ONEXPIRE) {
            if let Some(list) = &dot.on_expire {
                pending.push(Pending::Attacks {
                    attacker: self.uid,
                    attacks: list.expanded_hits(),
                    source: ActionSource::Trigger(dot.display_name().to_string()),
                });
            }
        }
    }

    /// Undo a dot's footprint: state bits and any mod block it applied.
    fn release_dot(&mut self, dot: &Dot, events: &mut dyn EventSink) {
        let before = self.states.flags();
        self.states.remove(&dot.id);
        let released = before - self.states.flags();
        if !released.is_empty() {
            events.emit(CombatEvent::CharState {
                uid: self.uid,
                name: self.display_name().to_string(),
                state: released.describe().to_string(),
                cause: dot.display_name().to_string(),
                active: false,
            });
        }
        if let Some(block) = &dot.mods {
            let block = block.clone();
            self.remove_mod_block(&block, &dot.id);
        }
    }

    /// Dot damage is reduced by resistance only; barrier soaks before hp.
    fn take_periodic_damage(&mut self, amount: f64, kind: &str) -> f64 {
        let scaled = amount * resist_multiplier(self.resist_value(kind));
        self.soak(scaled);
        scaled
    }

    /// Route raw damage through barrier, then hp.
    pub fn soak(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        let spill = self.barrier.damage(amount);
        if spill < amount {
            self.dirty.mark_changed("barrier");
        }
        if spill > 0.0 {
            self.hp.damage(spill);
            self.dirty.mark_changed("hp");
        }
    }

    pub fn heal(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        self.hp.heal(amount);
        self.dirty.mark_changed("hp");
    }

    // ---- triggers and targeting hooks -----------------------------------

    /// Attacks chained off a landed hit on this character.
    pub fn hit_triggers(&self) -> Vec<(String, Vec<Attack>)> {
        if self.states.has(StateFlags::NO_ONHIT) {
            return Vec::new();
        }
        self.dots
            .iter()
            .filter_map(|d| {
                d.on_hit
                    .as_ref()
                    .map(|list| (d.display_name().to_string(), list.expanded_hits()))
            })
            .collect()
    }

    /// Attacks chained off an attacker whiffing against this character.
    pub fn miss_triggers(&self) -> Vec<(String, Vec<Attack>)> {
        if self.states.has(StateFlags::NO_ONMISS) {
            return Vec::new();
        }
        self.dots
            .iter()
            .filter_map(|d| {
                d.on_miss
                    .as_ref()
                    .map(|list| (d.display_name().to_string(), list.expanded_hits()))
            })
            .collect()
    }

    /// Queue every on-death chain this character carries, unless a state
    /// forbids them.
    pub fn death_throes(&self, pending: &mut Vec<Pending>) {
        if self.states.has(StateFlags::NO_ONDEATH) {
            return;
        }
        for dot in &self.dots {
            if let Some(list) = &dot.on_death {
                pending.push(Pending::Attacks {
                    attacker: self.uid,
                    attacks: list.expanded_hits(),
                    source: ActionSource::Trigger(dot.display_name().to_string()),
                });
            }
        }
    }

    /// Remap a requested target category under confusion or charm.
    /// Confused characters lash out at anyone; charmed ones serve the
    /// other side. Self-targeting is never remapped.
    pub fn retarget(&self, requested: TargetFlags) -> TargetFlags {
        if requested.is_self() {
            return requested;
        }
        if self.states.has(StateFlags::CONFUSED) {
            return TargetFlags::ALLY_LEADER
                | TargetFlags::ALLY_MINIONS
                | TargetFlags::ENEMY_LEADER
                | TargetFlags::ENEMY_MINIONS
                | (requested & TargetFlags::USE_MAX_COMBATANTS);
        }
        if self.states.has(StateFlags::CHARMED) {
            let mut swapped = requested & (TargetFlags::NOT_SELF | TargetFlags::USE_MAX_COMBATANTS);
            if requested.contains(TargetFlags::ALLY_LEADER) {
                swapped |= TargetFlags::ENEMY_LEADER;
            }
            if requested.contains(TargetFlags::ALLY_MINIONS) {
                swapped |= TargetFlags::ENEMY_MINIONS;
            }
            if requested.contains(TargetFlags::ENEMY_LEADER) {
                swapped |= TargetFlags::ALLY_LEADER;
            }
            if requested.contains(TargetFlags::ENEMY_MINIONS) {
                swapped |= TargetFlags::ALLY_MINIONS;
            }
            return swapped;
        }
        requested
    }

    /// Seed an expression context with this character's numbers under a
    /// role prefix ("actor" or "target").
    pub fn fill_eval(&self, role: &str, ctx: &mut EvalContext) {
        ctx.set(format!("{role}.level"), self.level);
        ctx.set(format!("{role}.hp"), self.hp.value());
        ctx.set(format!("{role}.hp.max"), self.hp.max_value());
        ctx.set(format!("{role}.barrier"), self.barrier.value());
        ctx.set(format!("{role}.tohit"), self.tohit.value());
        ctx.set(format!("{role}.defense"), self.defense.value());
        ctx.set(format!("{role}.dodge"), self.dodge.value());
        ctx.set(format!("{role}.speed"), self.speed.value());
    }

    /// Context for effects this character applies to itself.
    pub fn eval_context(&self) -> EvalContext {
        let mut ctx = EvalContext::new();
        self.fill_eval("actor", &mut ctx);
        self.fill_eval("target", &mut ctx);
        ctx
    }

    // ---- persistence ----------------------------------------------------

    /// Rebuild the transient side after deserialization: state bits and
    /// stat mods are derived from the surviving dots, not stored.
    pub fn revive(&mut self) {
        self.states.clear();
        let carried: Vec<(String, StateFlags, Option<ModBlock>)> = self
            .dots
            .iter()
            .map(|d| (d.id.clone(), d.flags, d.mods.clone()))
            .collect();
        for (id, flags, mods) in carried {
            if !flags.is_empty() {
                self.states.add(&id, flags);
            }
            if let Some(block) = mods {
                self.apply_mod_block(&block, &id, 1.0);
            }
        }
        for attack in self.attack.iter_mut() {
            attack.propagate_to_hits();
        }
        self.dirty.clear();
    }
}

/// Parse "25%" (or bare "25") and roll against it. Malformed chances warn
/// and pass, so bad data weakens an effect instead of erasing it.
fn roll_percent(chance: &str, rng: &mut impl Rng) -> bool {
    let text = chance.trim().trim_end_matches('%');
    match text.parse::<f64>() {
        Ok(pct) => rng.gen::<f64>() * 100.0 < pct,
        Err(_) => {
            warn!(chance, "unparseable percent gate; letting it through");
            true
        }
    }
}
