//! One running encounter: the two rosters, the shared tick, and the queue
//! every action funnels through.
//!
//! A tick has two phases. First every combatant advances (dots, then its
//! own turn when the attack timer allows), queueing work instead of
//! resolving it. Then the queue drains in order, so everything that was
//! decided against the start-of-tick world resolves against one coherent
//! battlefield. Dead enemies are reaped last, after their on-death chains
//! had their say.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::chars::{ActionSource, Attack, AttackList, Char, Npc, Pending, Player, Team};
use crate::combat::events::{CombatEvent, EventSink};
use crate::combat::resolve::{apply_damage, calc_damage, try_hit};
use crate::combat::targeting::{get_target, TargetQuery};
use crate::core::constants::OVERCROWD_LIMIT;
use crate::data::spawn::NpcSource;
use crate::data::GameData;
use crate::values::EvalContext;

/// Either roster slot. The tag survives serialization so a restored save
/// keeps the right turn logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Combatant {
    Player(Player),
    Npc(Npc),
}

impl Combatant {
    pub fn ch(&self) -> &Char {
        match self {
            Combatant::Player(p) => &p.ch,
            Combatant::Npc(n) => &n.ch,
        }
    }

    pub fn ch_mut(&mut self) -> &mut Char {
        match self {
            Combatant::Player(p) => &mut p.ch,
            Combatant::Npc(n) => &mut n.ch,
        }
    }

    fn combat(
        &mut self,
        dt: f64,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) {
        match self {
            Combatant::Player(p) => p.combat(dt, rng, events, pending),
            Combatant::Npc(n) => n.combat(dt, rng, events, pending),
        }
    }
}

/// A battle in progress. `allies` is the player's side, leader at index 0;
/// `enemies` is everything trying to kill it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Combat {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allies: Vec<Combatant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enemies: Vec<Combatant>,
    pub active: bool,
    next_uid: u32,
}

impl Combat {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_uid(&mut self) -> u32 {
        self.next_uid += 1;
        self.next_uid
    }

    /// Put a combatant on the player's side. Keeps a preassigned uid,
    /// hands out a fresh one otherwise.
    pub fn add_ally(&mut self, mut combatant: Combatant) -> u32 {
        let uid = match combatant.ch().uid {
            0 => self.alloc_uid(),
            set => set,
        };
        let ch = combatant.ch_mut();
        ch.uid = uid;
        ch.team = Team::Player;
        self.allies.push(combatant);
        uid
    }

    /// Put an npc on the opposing side, unless the field is already packed.
    pub fn add_enemy(&mut self, mut npc: Npc, events: &mut dyn EventSink) -> Option<u32> {
        if self.allies.len() + self.enemies.len() >= OVERCROWD_LIMIT {
            events.emit(CombatEvent::Overcrowded {
                id: npc.ch.id.clone(),
            });
            return None;
        }
        let uid = match npc.ch.uid {
            0 => self.alloc_uid(),
            set => set,
        };
        npc.ch.uid = uid;
        npc.ch.team = Team::Npc;
        self.enemies.push(Combatant::Npc(npc));
        Some(uid)
    }

    /// Open the encounter: enemies become reachable and the roster is
    /// announced.
    pub fn start(&mut self, events: &mut dyn EventSink) {
        self.active = true;
        events.emit(CombatEvent::EncStart {
            enemies: self
                .enemies
                .iter()
                .map(|c| c.ch().display_name().to_string())
                .collect(),
        });
    }

    /// The encounter is over once the last enemy fell.
    pub fn done(&self) -> bool {
        self.enemies.is_empty()
    }

    /// The player's side cannot win anymore.
    pub fn lost(&self) -> bool {
        self.allies.first().map(|c| !c.ch().alive()).unwrap_or(true)
    }

    pub fn leader(&self) -> Option<&Char> {
        self.allies.first().map(Combatant::ch)
    }

    /// Advance the whole battle by `dt` seconds.
    pub fn update(
        &mut self,
        dt: f64,
        data: &GameData,
        spawner: &dyn NpcSource,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
    ) {
        if !self.active {
            return;
        }
        let mut pending: Vec<Pending> = Vec::new();
        for i in 0..self.allies.len() {
            Self::turn(&mut self.allies[i], dt, rng, events, &mut pending);
        }
        for i in 0..self.enemies.len() {
            Self::turn(&mut self.enemies[i], dt, rng, events, &mut pending);
        }
        self.resolve_queue(pending.into(), data, spawner, rng, events);
        self.reap(data, spawner, rng, events);
    }

    /// One combatant's slice of the tick: dots first, then an action if the
    /// timer allows and the dots did not kill it.
    fn turn(
        combatant: &mut Combatant,
        dt: f64,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) {
        if !combatant.ch().alive() {
            return;
        }
        combatant.ch_mut().update(dt, rng, events, pending);
        if !combatant.ch().alive() {
            return;
        }
        combatant.combat(dt, rng, events, pending);
    }

    /// Fire an item mid-battle. The announcement is immediate; an attack
    /// payload resolves through the normal queue under the item's name.
    pub fn use_item(
        &mut self,
        user: u32,
        item: &str,
        attack: Option<Attack>,
        data: &GameData,
        spawner: &dyn NpcSource,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
    ) {
        let Some(name) = self.find(user).map(|c| c.ch().display_name().to_string()) else {
            return;
        };
        events.emit(CombatEvent::ItemAction {
            uid: user,
            name,
            item: item.to_string(),
        });
        if let Some(attack) = attack {
            let mut work = VecDeque::new();
            work.push_back(Pending::Attacks {
                attacker: user,
                attacks: AttackList::from(attack).expanded_hits(),
                source: ActionSource::Item(item.to_string()),
            });
            self.resolve_queue(work, data, spawner, rng, events);
            self.reap(data, spawner, rng, events);
        }
    }

    /// Drain queued work in order. Resolution may queue more (on-hit and
    /// on-miss chains); those join the back of the line within the same
    /// tick. Turn and dot actions require a living attacker, trigger and
    /// item actions only an addressable one, so death throes can still go
    /// off over a corpse.
    fn resolve_queue(
        &mut self,
        mut work: VecDeque<Pending>,
        data: &GameData,
        spawner: &dyn NpcSource,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
    ) {
        while let Some(entry) = work.pop_front() {
            match entry {
                Pending::Attacks {
                    attacker,
                    attacks,
                    source,
                } => {
                    let allowed = match source {
                        ActionSource::Turn | ActionSource::Dot(_) => self
                            .find(attacker)
                            .map(|c| c.ch().alive())
                            .unwrap_or(false),
                        ActionSource::Trigger(_) | ActionSource::Item(_) => {
                            self.find(attacker).is_some()
                        }
                    };
                    if !allowed {
                        continue;
                    }
                    for attack in &attacks {
                        let targets = match self.view_for(attacker) {
                            Some(query) => get_target(&query, attack, rng),
                            None => break,
                        };
                        for uid in targets {
                            self.strike(
                                attacker, uid, attack, &source, true, data, rng, events, &mut work,
                            );
                        }
                    }
                }
                Pending::Summon { owner, spec } => {
                    let side = match self.find(owner) {
                        Some(c) => c.ch().team,
                        None => Team::Npc,
                    };
                    for _ in 0..spec.count.max(1) {
                        let uid = self.alloc_uid();
                        match spawner.create_npc(&spec.id, uid) {
                            Some(npc) => match side {
                                Team::Player => {
                                    self.add_ally(Combatant::Npc(npc));
                                }
                                Team::Npc => {
                                    self.add_enemy(npc, events);
                                }
                            },
                            None => {
                                warn!(id = spec.id.as_str(), "unknown summon template");
                            }
                        }
                    }
                }
            }
        }
    }

    /// Land one attack on one target.
    #[allow(clippy::too_many_arguments)]
    fn strike(
        &mut self,
        attacker_uid: u32,
        target_uid: u32,
        attack: &Attack,
        source: &ActionSource,
        apply_bonus: bool,
        data: &GameData,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        work: &mut VecDeque<Pending>,
    ) {
        if attacker_uid == target_uid {
            self.strike_self(attacker_uid, attack, source, data, rng, events, work);
            return;
        }
        let mut counters: Vec<Attack> = Vec::new();
        {
            let Some((attacker, target)) = self.pair_mut(attacker_uid, target_uid) else {
                return;
            };
            if !target.alive() {
                return;
            }
            let attacker_name = attacker.display_name().to_string();
            let target_name = target.display_name().to_string();
            let connects =
                attack.harmless || !target.can_defend() || try_hit(attacker, target, attack, rng);
            if !connects {
                events.emit(CombatEvent::DamageMiss {
                    attacker: attacker_name,
                    target: target_name,
                    attack: attack.display_name().to_string(),
                });
                if !attack.unreflectable {
                    for (cause, attacks) in target.miss_triggers() {
                        work.push_back(Pending::Attacks {
                            attacker: target_uid,
                            attacks,
                            source: ActionSource::Trigger(cause),
                        });
                    }
                }
                if let Some(list) = &attack.on_miss {
                    work.push_back(Pending::Attacks {
                        attacker: attacker_uid,
                        attacks: list.expanded_hits(),
                        source: ActionSource::Trigger(attack.display_name().to_string()),
                    });
                }
                return;
            }
            let mut ctx = EvalContext::new();
            attacker.fill_eval("actor", &mut ctx);
            target.fill_eval("target", &mut ctx);
            let mut swung = attack.clone();
            let mut dealt = 0.0;
            let mut healed = 0.0;
            if swung.damage.is_some() {
                let raw = calc_damage(attacker, &mut swung, apply_bonus, &ctx, rng);
                let outcome = apply_damage(target, &swung, raw, events);
                dealt = outcome.dealt;
                counters = outcome.counters;
            }
            if let Some(healing) = swung.healing.as_mut() {
                healed = healing.roll(&ctx, rng);
                target.heal(healed);
            }
            if let Some(spec) = &swung.dot {
                target.add_dot(
                    spec,
                    &swung.id,
                    None,
                    Some(attacker_uid),
                    &ctx,
                    data,
                    rng,
                    events,
                );
            }
            if let Some(block) = &swung.result {
                target.apply_mod_block(block, &swung.id, 1.0);
            }
            if !swung.nologs {
                Self::emit_action(
                    events,
                    source,
                    attacker_uid,
                    attacker_name,
                    &swung,
                    target_name,
                    dealt,
                    healed,
                );
            }
            if !attack.unreflectable {
                for (cause, attacks) in target.hit_triggers() {
                    work.push_back(Pending::Attacks {
                        attacker: target_uid,
                        attacks,
                        source: ActionSource::Trigger(cause),
                    });
                }
            }
            if let Some(list) = &swung.on_hit {
                work.push_back(Pending::Attacks {
                    attacker: attacker_uid,
                    attacks: list.expanded_hits(),
                    source: ActionSource::Trigger(swung.display_name().to_string()),
                });
            }
            if !attacker.alive() {
                counters.clear();
            }
        }
        // thorns and reflect answer the attacker directly, never retargeted
        for counter in counters {
            let cause = counter.display_name().to_string();
            self.strike(
                target_uid,
                attacker_uid,
                &counter,
                &ActionSource::Trigger(cause),
                false,
                data,
                rng,
                events,
                work,
            );
        }
    }

    /// Self-targeted resolution: no hit roll, no counters, no retaliation.
    fn strike_self(
        &mut self,
        uid: u32,
        attack: &Attack,
        source: &ActionSource,
        data: &GameData,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        work: &mut VecDeque<Pending>,
    ) {
        let Some(ch) = self.find_ch_mut(uid) else {
            return;
        };
        let ctx = ch.eval_context();
        let name = ch.display_name().to_string();
        let mut swung = attack.clone();
        let mut dealt = 0.0;
        let mut healed = 0.0;
        if swung.damage.is_some() {
            let raw = calc_damage(ch, &mut swung, true, &ctx, rng);
            let outcome = apply_damage(ch, &swung, raw, events);
            dealt = outcome.dealt;
        }
        if let Some(healing) = swung.healing.as_mut() {
            healed = healing.roll(&ctx, rng);
            ch.heal(healed);
        }
        if let Some(spec) = &swung.dot {
            ch.add_dot(spec, &swung.id, None, Some(uid), &ctx, data, rng, events);
        }
        if let Some(block) = &swung.result {
            ch.apply_mod_block(block, &swung.id, 1.0);
        }
        if !swung.nologs {
            Self::emit_action(events, source, uid, name.clone(), &swung, name, dealt, healed);
        }
        if let Some(list) = &swung.on_hit {
            work.push_back(Pending::Attacks {
                attacker: uid,
                attacks: list.expanded_hits(),
                source: ActionSource::Trigger(swung.display_name().to_string()),
            });
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_action(
        events: &mut dyn EventSink,
        source: &ActionSource,
        uid: u32,
        name: String,
        attack: &Attack,
        target: String,
        damage: f64,
        healing: f64,
    ) {
        match source {
            ActionSource::Turn | ActionSource::Item(_) => events.emit(CombatEvent::CharAction {
                uid,
                name,
                attack: attack.display_name().to_string(),
                target,
                damage,
                healing,
            }),
            ActionSource::Dot(label) | ActionSource::Trigger(label) => {
                events.emit(CombatEvent::TriggerAction {
                    uid,
                    name,
                    trigger: label.clone(),
                    attack: attack.display_name().to_string(),
                    target,
                    damage,
                    healing,
                })
            }
        }
    }

    /// Sweep dead enemies off the field. Their on-death chains resolve
    /// while the corpse is still addressable; anything those chains kill
    /// is swept on the next pass.
    fn reap(
        &mut self,
        data: &GameData,
        spawner: &dyn NpcSource,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
    ) {
        loop {
            let mut throes: Vec<Pending> = Vec::new();
            let mut slain: Vec<u32> = Vec::new();
            for combatant in &self.enemies {
                if combatant.ch().alive() {
                    continue;
                }
                slain.push(combatant.ch().uid);
                let loot = match combatant {
                    Combatant::Npc(npc) => spawner.get_loot(npc),
                    Combatant::Player(_) => None,
                };
                events.emit(CombatEvent::EnemySlain {
                    uid: combatant.ch().uid,
                    name: combatant.ch().display_name().to_string(),
                    loot,
                });
                combatant.ch().death_throes(&mut throes);
            }
            if slain.is_empty() {
                return;
            }
            self.resolve_queue(throes.into(), data, spawner, rng, events);
            self.enemies.retain(|c| !slain.contains(&c.ch().uid));
            if self.enemies.is_empty() {
                events.emit(CombatEvent::CombatWon);
                self.active = false;
                return;
            }
        }
    }

    /// The field as one attacker sees it, own side first.
    fn view_for(&self, uid: u32) -> Option<TargetQuery<'_>> {
        let actor = self.find(uid)?.ch();
        let (own, other) = match actor.team {
            Team::Player => (&self.allies, &self.enemies),
            Team::Npc => (&self.enemies, &self.allies),
        };
        Some(TargetQuery {
            actor,
            allies: own.iter().map(Combatant::ch).collect(),
            enemies: other.iter().map(Combatant::ch).collect(),
            active: self.active,
        })
    }

    /// Look a combatant up by uid on either roster.
    pub fn find(&self, uid: u32) -> Option<&Combatant> {
        self.allies
            .iter()
            .chain(self.enemies.iter())
            .find(|c| c.ch().uid == uid)
    }

    fn find_ch_mut(&mut self, uid: u32) -> Option<&mut Char> {
        self.allies
            .iter_mut()
            .chain(self.enemies.iter_mut())
            .map(Combatant::ch_mut)
            .find(|ch| ch.uid == uid)
    }

    fn locate(&self, uid: u32) -> Option<(bool, usize)> {
        if let Some(i) = self.allies.iter().position(|c| c.ch().uid == uid) {
            return Some((true, i));
        }
        self.enemies
            .iter()
            .position(|c| c.ch().uid == uid)
            .map(|i| (false, i))
    }

    /// Distinct mutable handles on two different combatants.
    fn pair_mut(&mut self, a: u32, b: u32) -> Option<(&mut Char, &mut Char)> {
        let (a_ally, ai) = self.locate(a)?;
        let (b_ally, bi) = self.locate(b)?;
        match (a_ally, b_ally) {
            (true, false) => Some((self.allies[ai].ch_mut(), self.enemies[bi].ch_mut())),
            (false, true) => Some((self.enemies[ai].ch_mut(), self.allies[bi].ch_mut())),
            (true, true) => split_pair(&mut self.allies, ai, bi),
            (false, false) => split_pair(&mut self.enemies, ai, bi),
        }
    }

    /// Re-derive transient state after deserialization.
    pub fn revive(&mut self) {
        for combatant in self.allies.iter_mut().chain(self.enemies.iter_mut()) {
            combatant.ch_mut().revive();
        }
    }
}

fn split_pair(roster: &mut [Combatant], a: usize, b: usize) -> Option<(&mut Char, &mut Char)> {
    if a == b {
        return None;
    }
    if a < b {
        let (left, right) = roster.split_at_mut(b);
        Some((left[a].ch_mut(), right[0].ch_mut()))
    } else {
        let (left, right) = roster.split_at_mut(a);
        Some((right[0].ch_mut(), left[b].ch_mut()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::{Dot, DotSpec, SummonSpec, TargetFlags};
    use crate::combat::events::EventLog;
    use crate::data::spawn::TemplateSpawner;
    use crate::values::Amount;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn smite(damage: f64) -> Attack {
        let mut attack = Attack::new("smite");
        attack.damage = Some(Amount::fixed(damage));
        attack.targets = TargetFlags::ENEMIES;
        attack
    }

    fn fighter(id: &str, hp: f64) -> Char {
        Char::new(id, "", hp)
    }

    fn player_with(attack: Attack, hp: f64) -> Combatant {
        let mut ch = fighter("hero", hp);
        ch.attack = AttackList::from(attack);
        Combatant::Player(Player::new(ch))
    }

    fn rat(hp: f64, bite: f64) -> Npc {
        let mut ch = fighter("rat", hp);
        let mut attack = Attack::new("bite");
        attack.damage = Some(Amount::fixed(bite));
        attack.targets = TargetFlags::ENEMY_LEADER;
        ch.attack = AttackList::from(attack);
        Npc {
            ch,
            loot: Some("rat_tail".to_string()),
        }
    }

    fn drive(
        combat: &mut Combat,
        updates: usize,
        data: &GameData,
        rng: &mut ChaCha8Rng,
        log: &mut EventLog,
    ) {
        let spawner = TemplateSpawner::new(data);
        for _ in 0..updates {
            combat.update(1.0, data, &spawner, rng, log);
        }
    }

    #[test]
    fn test_battle_runs_to_won() {
        let data = GameData::new();
        let mut combat = Combat::new();
        combat.add_ally(player_with(smite(50.0), 50.0));
        let mut log = EventLog::new();
        combat.add_enemy(rat(30.0, 1.0), &mut log).unwrap();
        combat.start(&mut log);
        assert!(matches!(
            log.iter().next(),
            Some(CombatEvent::EncStart { enemies }) if enemies == &vec!["rat".to_string()]
        ));

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        drive(&mut combat, 1, &data, &mut rng, &mut log);

        assert!(combat.done());
        assert!(!combat.active);
        assert!(log.iter().any(|e| matches!(
            e,
            CombatEvent::EnemySlain { loot: Some(l), .. } if l == "rat_tail"
        )));
        assert!(log.iter().any(|e| matches!(e, CombatEvent::CombatWon)));
        // the rat queued its bite the same tick it died; a dead attacker
        // never resolves, so the hero is untouched
        assert_eq!(combat.leader().unwrap().hp.value(), 50.0);
    }

    #[test]
    fn test_overcrowding_drops_spawn() {
        let mut combat = Combat::new();
        combat.add_ally(player_with(smite(1.0), 50.0));
        let mut log = EventLog::new();
        for _ in 0..OVERCROWD_LIMIT - 1 {
            assert!(combat.add_enemy(rat(10.0, 0.0), &mut log).is_some());
        }
        assert!(combat.add_enemy(rat(10.0, 0.0), &mut log).is_none());
        assert_eq!(combat.enemies.len(), OVERCROWD_LIMIT - 1);
        assert!(log
            .iter()
            .any(|e| matches!(e, CombatEvent::Overcrowded { id } if id == "rat")));
    }

    #[test]
    fn test_attack_dot_payload_burns_down_the_target() {
        let mut venom = Dot::new("venom");
        venom.duration = 2.0;
        venom.effect.damage = Some(Amount::fixed(10.0));
        let mut envenom = smite(1.0);
        envenom.id = "envenom".to_string();
        envenom.dot = Some(DotSpec::Inline(Box::new(venom)));

        let data = GameData::new();
        let mut combat = Combat::new();
        combat.add_ally(player_with(envenom, 50.0));
        let mut log = EventLog::new();
        let rat_uid = combat.add_enemy(rat(15.0, 1.0), &mut log).unwrap();
        combat.start(&mut log);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        drive(&mut combat, 1, &data, &mut rng, &mut log);
        let victim = combat.find(rat_uid).unwrap().ch();
        assert!(victim.has_dot("venom"));
        assert_eq!(victim.hp.value(), 14.0);

        // two more ticks of ten finish what the swings started
        drive(&mut combat, 2, &data, &mut rng, &mut log);
        assert!(combat.done());
        assert!(log
            .iter()
            .any(|e| matches!(e, CombatEvent::DotAction { damage, .. } if *damage == 10.0)));
        // the hero took a bite on each tick the rat was still standing
        assert_eq!(combat.leader().unwrap().hp.value(), 48.0);
    }

    #[test]
    fn test_thorns_answer_the_attacker() {
        let data = GameData::new();
        let mut combat = Combat::new();
        combat.add_ally(player_with(smite(10.0), 50.0));
        let mut spiky = rat(100.0, 0.0);
        spiky.ch.attack = AttackList::default();
        spiky.ch.context.ensure_stat("thorns").set_base(5.0);
        let mut log = EventLog::new();
        let rat_uid = combat.add_enemy(spiky, &mut log).unwrap();
        combat.start(&mut log);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        drive(&mut combat, 1, &data, &mut rng, &mut log);

        assert_eq!(combat.find(rat_uid).unwrap().ch().hp.value(), 90.0);
        assert_eq!(combat.leader().unwrap().hp.value(), 45.0);
        assert!(log.iter().any(|e| matches!(
            e,
            CombatEvent::TriggerAction { attack, damage, .. }
                if attack == "thorns" && *damage == 5.0
        )));
    }

    #[test]
    fn test_summons_join_the_owners_side() {
        let mut data = GameData::new();
        data.add_npc(
            "ratling",
            Npc {
                ch: fighter("ratling", 10.0),
                loot: None,
            },
        );
        let mut brood_mother = rat(100.0, 0.0);
        brood_mother.ch.attack = AttackList::default();
        let mut brood = Dot::new("brood");
        brood.perm = true;
        brood.effect.summon = Some(SummonSpec {
            id: "ratling".to_string(),
            count: 2,
        });
        brood_mother.ch.dots.push(brood);

        let mut combat = Combat::new();
        combat.add_ally(player_with(smite(0.0), 50.0));
        let mut log = EventLog::new();
        combat.add_enemy(brood_mother, &mut log).unwrap();
        combat.start(&mut log);

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        drive(&mut combat, 1, &data, &mut rng, &mut log);

        assert_eq!(combat.enemies.len(), 3);
        assert!(combat
            .enemies
            .iter()
            .filter(|c| c.ch().id == "ratling")
            .all(|c| c.ch().team == Team::Npc && c.ch().uid != 0));
    }

    #[test]
    fn test_death_throes_fire_over_the_corpse() {
        let mut bomber = rat(10.0, 0.0);
        bomber.ch.attack = AttackList::default();
        let mut volatile = Dot::new("volatile");
        volatile.perm = true;
        let mut blast = Attack::new("blast");
        blast.damage = Some(Amount::fixed(20.0));
        blast.targets = TargetFlags::ENEMY_LEADER;
        volatile.on_death = Some(AttackList::from(blast));
        bomber.ch.dots.push(volatile);

        let data = GameData::new();
        let mut combat = Combat::new();
        let mut focused = smite(50.0);
        focused.targets = TargetFlags::ENEMY_LEADER;
        combat.add_ally(player_with(focused, 50.0));
        let mut log = EventLog::new();
        combat.add_enemy(bomber, &mut log).unwrap();
        combat.add_enemy(rat(100.0, 0.0), &mut log).unwrap();
        combat.start(&mut log);

        let mut rng = ChaCha8Rng::seed_from_u64(13);
        drive(&mut combat, 1, &data, &mut rng, &mut log);

        // the bomber died first and its blast still went off
        assert_eq!(combat.leader().unwrap().hp.value(), 30.0);
        assert!(!combat.done());
        assert_eq!(combat.enemies.len(), 1);
    }

    #[test]
    fn test_use_item_resolves_immediately() {
        let data = GameData::new();
        let spawner = TemplateSpawner::new(&data);
        let mut combat = Combat::new();
        let hero_uid = combat.add_ally(player_with(smite(1.0), 50.0));
        let mut log = EventLog::new();
        let rat_uid = combat.add_enemy(rat(100.0, 0.0), &mut log).unwrap();
        combat.start(&mut log);

        let mut bomb = Attack::new("bomb");
        bomb.damage = Some(Amount::fixed(25.0));
        bomb.targets = TargetFlags::ENEMIES;
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        combat.use_item(
            hero_uid,
            "fire_bomb",
            Some(bomb),
            &data,
            &spawner,
            &mut rng,
            &mut log,
        );

        assert!(log
            .iter()
            .any(|e| matches!(e, CombatEvent::ItemAction { item, .. } if item == "fire_bomb")));
        assert_eq!(combat.find(rat_uid).unwrap().ch().hp.value(), 75.0);
    }

    #[test]
    fn test_save_restores_mid_battle() {
        let mut venom = Dot::new("venom");
        venom.duration = 5.0;
        venom.effect.damage = Some(Amount::fixed(2.0));
        let mut envenom = smite(1.0);
        envenom.dot = Some(DotSpec::Inline(Box::new(venom)));

        let data = GameData::new();
        let mut combat = Combat::new();
        combat.add_ally(player_with(envenom, 50.0));
        let mut log = EventLog::new();
        let rat_uid = combat.add_enemy(rat(40.0, 1.0), &mut log).unwrap();
        combat.start(&mut log);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        drive(&mut combat, 1, &data, &mut rng, &mut log);

        let saved = serde_json::to_string(&combat).unwrap();
        let mut restored: Combat = serde_json::from_str(&saved).unwrap();
        restored.revive();

        assert!(restored.active);
        assert!(matches!(restored.allies[0], Combatant::Player(_)));
        let victim = restored.find(rat_uid).unwrap().ch();
        assert!(victim.has_dot("venom"));
        assert_eq!(victim.hp.value(), combat.find(rat_uid).unwrap().ch().hp.value());
        // uid allocation continues past everything already on the field
        let fresh = restored.add_ally(Combatant::Npc(rat(5.0, 0.0)));
        assert!(fresh > rat_uid);
    }
}
