//! Target selection: who an attack is allowed to land on, and in what
//! order of preference.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

use crate::chars::{AffectedBy, Attack, Char, OnlyFilter, StateFlags, TargetFlags, TargetSpec};
use crate::core::constants::MAX_COMBATANTS;

/// One actor's view of the field. `allies` is the actor's own side and
/// `enemies` the opposing one, each ordered leader-first, already reduced
/// to living combatants by the caller or filtered here.
pub struct TargetQuery<'a> {
    pub actor: &'a Char,
    pub allies: Vec<&'a Char>,
    pub enemies: Vec<&'a Char>,
    /// Enemies are only reachable while the encounter is running.
    pub active: bool,
}

/// Pick the uids `attack` may land on, best candidates first.
///
/// The pipeline: remap the requested category under confusion/charm,
/// compose candidate pools from the capability bits, apply the identity
/// filter, shuffle, bucket by dot-presence preferences, then (only when
/// more candidates remain than the attack wants) order by taunt/hide,
/// the stat comparator, and a per-call leader coin flip before slicing.
pub fn get_target(query: &TargetQuery, attack: &Attack, rng: &mut impl Rng) -> Vec<u32> {
    let flags = query.actor.retarget(attack.targets);
    if flags.is_self() {
        return vec![query.actor.uid];
    }

    let mut allies: Vec<&Char> = query.allies.iter().copied().filter(|c| c.alive()).collect();
    if flags.contains(TargetFlags::NOT_SELF) {
        allies.retain(|c| c.uid != query.actor.uid);
    }
    let enemies: Vec<&Char> = query.enemies.iter().copied().filter(|c| c.alive()).collect();

    let mut leaders = Vec::new();
    let mut targets: Vec<&Char> = Vec::new();
    if let Some((leader, minions)) = allies.split_first() {
        if flags.contains(TargetFlags::ALLY_LEADER) {
            leaders.push(leader.uid);
            targets.push(leader);
        }
        if flags.contains(TargetFlags::ALLY_MINIONS) {
            targets.extend(minions.iter().copied());
        }
    }
    if query.active {
        if let Some((leader, minions)) = enemies.split_first() {
            if flags.contains(TargetFlags::ENEMY_LEADER) {
                leaders.push(leader.uid);
                targets.push(leader);
            }
            if flags.contains(TargetFlags::ENEMY_MINIONS) {
                targets.extend(minions.iter().copied());
            }
        }
    }

    if let Some(spec) = &attack.targetspec {
        if let Some(only) = &spec.only {
            targets.retain(|c| {
                let slot = allies
                    .iter()
                    .position(|a| a.uid == c.uid)
                    .or_else(|| enemies.iter().position(|e| e.uid == c.uid))
                    .unwrap_or(0);
                passes_only(c, only, slot)
            });
        }
    }

    targets.shuffle(rng);

    if let Some(spec) = &attack.targetspec {
        bucket_by_affected(&mut targets, spec);
    }

    let max_targets = attack.max_targets.unwrap_or(if flags.contains(TargetFlags::USE_MAX_COMBATANTS) {
        MAX_COMBATANTS * 2
    } else {
        1
    });
    if max_targets >= targets.len() {
        return targets.iter().map(|c| c.uid).collect();
    }

    let hostile = flags.hostile();
    let stat_spec = attack.targetspec.as_ref().filter(|s| !s.stat.is_empty());
    let leader_front = rng.gen::<bool>();
    targets.sort_by(|a, b| {
        let mut ord = Ordering::Equal;
        if hostile {
            ord = focus_rank(a).cmp(&focus_rank(b));
        }
        if ord == Ordering::Equal {
            if let Some(spec) = stat_spec {
                let va = measure(a, spec);
                let vb = measure(b, spec);
                ord = va.partial_cmp(&vb).unwrap_or(Ordering::Equal);
                if spec.highest {
                    ord = ord.reverse();
                }
            }
        }
        if ord == Ordering::Equal && !leaders.is_empty() {
            let la = leaders.contains(&a.uid);
            let lb = leaders.contains(&b.uid);
            ord = if leader_front {
                lb.cmp(&la)
            } else {
                la.cmp(&lb)
            };
        }
        ord
    });

    targets.truncate(max_targets);
    targets.iter().map(|c| c.uid).collect()
}

/// Taunt pulls hostile attention, hide sheds it.
fn focus_rank(c: &Char) -> u8 {
    if c.states.has(StateFlags::TAUNT) {
        0
    } else if c.states.has(StateFlags::HIDE) {
        2
    } else {
        1
    }
}

fn measure(c: &Char, spec: &TargetSpec) -> f64 {
    if spec.usepercentage {
        c.stat_fraction(&spec.stat)
    } else {
        c.stat_value(&spec.stat)
    }
}

/// Identity filter: id matches the character, kind and tag match an
/// active dot on it, slot matches its position on its own living roster
/// (leader 0, minions from 1).
fn passes_only(c: &Char, only: &OnlyFilter, slot: usize) -> bool {
    if !only.id.is_empty() && c.id != only.id {
        return false;
    }
    if !only.kind.is_empty() && !c.has_dot_kind(&only.kind) {
        return false;
    }
    if !only.tag.is_empty() && !c.has_dot_tag(&only.tag) {
        return false;
    }
    if let Some(want) = only.slot {
        if want != slot {
            return false;
        }
    }
    true
}

fn affected(c: &Char, by: &AffectedBy) -> bool {
    if !by.id.is_empty() && !c.has_dot(&by.id) {
        return false;
    }
    if !by.tag.is_empty() && !c.has_dot_tag(&by.tag) {
        return false;
    }
    true
}

/// How many of the spec's dot-presence preferences a candidate fails.
fn missed_rank(c: &Char, spec: &TargetSpec) -> u8 {
    let mut missed = 0u8;
    if let Some(by) = &spec.affectedby {
        if !affected(c, by) {
            missed += 1;
        }
    }
    if let Some(by) = &spec.notaffectedby {
        if affected(c, by) {
            missed += 1;
        }
    }
    missed
}

/// Reorder candidates into preference buckets: every wanted-dot condition
/// met first, partial matches next, misses last. Strict conditions drop
/// failing candidates entirely. Stable, so shuffle order survives within
/// a bucket; the compound sort downstream is stable too, so bucket order
/// holds between candidates its keys cannot split.
fn bucket_by_affected(targets: &mut Vec<&Char>, spec: &TargetSpec) {
    if spec.affectedby.is_none() && spec.notaffectedby.is_none() {
        return;
    }
    targets.retain(|c| {
        if let Some(by) = &spec.affectedby {
            if by.strict && !affected(c, by) {
                return false;
            }
        }
        if let Some(by) = &spec.notaffectedby {
            if by.strict && affected(c, by) {
                return false;
            }
        }
        true
    });
    targets.sort_by_key(|c| missed_rank(c, spec));
}
