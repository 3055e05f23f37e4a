//! Attack resolution math: hit rolls, damage scaling, and counters.
//!
//! Pure functions shared by the battle loop, dot ticking, and the
//! simulator, so every path through the game prices damage identically.

use rand::Rng;

use crate::chars::{Attack, Char};
use crate::combat::events::{CombatEvent, EventSink};
use crate::core::constants::{
    DEFENSE_CURVE_BASE, RESIST_CURVE_BASE, STAT_REFLECT, STAT_THORNS, TOHIT_FLOOR,
};
use crate::values::{Amount, EvalContext};

/// Both mitigation curves: `base/(base+v)` above zero, mirrored to
/// `2 - base/(base-v)` below it. Anchored at `f(0) = 1`, falling toward 0
/// as `v` grows and rising toward 2 as it sinks.
fn scale_multiplier(v: f64, base: f64) -> f64 {
    if v > 0.0 {
        base / (base + v)
    } else {
        2.0 - base / (base - v)
    }
}

/// Damage multiplier for a resistance value; negative values amplify.
pub fn resist_multiplier(res: f64) -> f64 {
    scale_multiplier(res, RESIST_CURVE_BASE)
}

/// Damage multiplier for a defense value, on a gentler curve.
pub fn defense_multiplier(defense: f64) -> f64 {
    scale_multiplier(defense, DEFENSE_CURVE_BASE)
}

/// Chance the defender slips a swing thrown with `to_hit` accuracy.
/// Zero dodge never evades; accuracy below the floor stops helping the
/// dodger further.
pub fn dodge_chance(dodge: f64, to_hit: f64) -> f64 {
    if dodge <= 0.0 {
        return 0.0;
    }
    dodge / (100.0 + dodge + to_hit.max(TOHIT_FLOOR))
}

/// Roll whether `attack` connects. The defender evades when its dodge
/// chance beats the roll.
pub fn try_hit(attacker: &Char, defender: &Char, attack: &Attack, rng: &mut impl Rng) -> bool {
    let to_hit = attacker.get_hit() + attack.tohit;
    let chance = dodge_chance(defender.dodge.value(), to_hit);
    chance <= rng.gen::<f64>()
}

/// Price one hit before mitigation: rolled base damage, the attacker's
/// flat per-kind bonus plus the attack's own (when `apply_bonus`), all
/// scaled by the attacker's potency multipliers.
pub fn calc_damage(
    attacker: &Char,
    attack: &mut Attack,
    apply_bonus: bool,
    ctx: &EvalContext,
    rng: &mut impl Rng,
) -> f64 {
    let Some(amount) = attack.damage.as_mut() else {
        return 0.0;
    };
    let mut damage = amount.roll(ctx, rng);
    if apply_bonus {
        damage += attacker.bonus_value(&attack.kind) + attack.bonus;
    }
    damage * attacker.potency_factor(&attack.potencies)
}

/// What a landed hit did to the defender.
#[derive(Debug)]
pub struct DamageOutcome {
    /// Damage that reached barrier and hp, after both mitigation curves.
    pub dealt: f64,
    /// The defender died to this hit.
    pub died: bool,
    /// Thorns/reflect answers to hurl back at the attacker, already
    /// flagged unreflectable so counters cannot chain forever.
    pub counters: Vec<Attack>,
}

/// Mitigate `raw` damage and land it on the defender: resist curve, then
/// defense curve unless the attack pierces it, then barrier, then hp.
pub fn apply_damage(
    defender: &mut Char,
    attack: &Attack,
    raw: f64,
    events: &mut dyn EventSink,
) -> DamageOutcome {
    let mut scaled = raw * resist_multiplier(defender.resist_value(&attack.kind));
    if !attack.nodefense {
        scaled *= defense_multiplier(defender.defense.value());
    }
    let was_alive = defender.alive();
    defender.soak(scaled);
    let died = was_alive && !defender.alive();
    if died {
        events.emit(CombatEvent::CharDied {
            uid: defender.uid,
            name: defender.display_name().to_string(),
        });
    }
    let mut counters = Vec::new();
    if !attack.unreflectable {
        let thorns = defender.stat_value(STAT_THORNS);
        if thorns > 0.0 {
            let mut counter = Attack::new(STAT_THORNS);
            counter.kind = STAT_THORNS.to_string();
            counter.damage = Some(Amount::fixed(thorns));
            counter.unreflectable = true;
            counters.push(counter);
        }
        let reflect = defender.stat_value(STAT_REFLECT);
        if reflect > 0.0 {
            // returns a share of the mitigated damage, in the same kind
            let mut counter = Attack::new(STAT_REFLECT);
            counter.kind = attack.kind.clone();
            counter.damage = Some(Amount::fixed(scaled * reflect / 100.0));
            counter.unreflectable = true;
            counters.push(counter);
        }
    }
    DamageOutcome {
        dealt: scaled,
        died,
        counters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::events::EventLog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_curves_anchor_at_one() {
        assert_eq!(resist_multiplier(0.0), 1.0);
        assert_eq!(defense_multiplier(0.0), 1.0);
    }

    #[test]
    fn test_curves_reduce_above_and_amplify_below() {
        assert!(resist_multiplier(25.0) < 1.0);
        assert!(resist_multiplier(-25.0) > 1.0);
        assert_eq!(resist_multiplier(50.0), 0.5);
        assert_eq!(resist_multiplier(-50.0), 1.5);
        assert_eq!(defense_multiplier(100.0), 0.5);
    }

    #[test]
    fn test_curves_stay_bounded() {
        assert!(resist_multiplier(1e9) > 0.0);
        assert!(resist_multiplier(1e9) < 1e-6);
        assert!(resist_multiplier(-1e9) < 2.0);
        assert!(resist_multiplier(-1e9) > 1.999);
    }

    #[test]
    fn test_dodge_needs_a_positive_stat() {
        // an accurate attacker against no dodge never misses
        assert_eq!(dodge_chance(0.0, 50.0), 0.0);
        assert_eq!(dodge_chance(-10.0, 0.0), 0.0);
        let chance = dodge_chance(50.0, 0.0);
        assert!(chance > 0.0 && chance < 1.0);
    }

    #[test]
    fn test_dodge_floor_caps_penalty() {
        // accuracy below the floor stops increasing the dodge chance
        assert_eq!(dodge_chance(30.0, -50.0), dodge_chance(30.0, -500.0));
        assert!(dodge_chance(30.0, -50.0) > dodge_chance(30.0, 50.0));
    }

    #[test]
    fn test_accurate_attack_always_connects() {
        let mut attacker = Char::new("a", "", 10.0);
        attacker.tohit.set_base(50.0);
        let defender = Char::new("d", "", 10.0);
        let attack = Attack::new("jab");
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            assert!(try_hit(&attacker, &defender, &attack, &mut rng));
        }
    }

    #[test]
    fn test_calc_damage_bonus_and_potency() {
        let mut attacker = Char::new("a", "", 10.0);
        attacker
            .bonuses
            .insert("fire".to_string(), crate::values::Stat::new(5.0));
        attacker
            .potencies
            .insert("burning".to_string(), crate::values::Stat::new(2.0));
        let mut attack = Attack::new("fireball");
        attack.kind = "fire".to_string();
        attack.damage = Some(Amount::fixed(10.0));
        attack.bonus = 3.0;
        attack.potencies = vec!["burning".to_string()];
        let ctx = EvalContext::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(
            calc_damage(&attacker, &mut attack, true, &ctx, &mut rng),
            (10.0 + 5.0 + 3.0) * 2.0
        );
        assert_eq!(
            calc_damage(&attacker, &mut attack, false, &ctx, &mut rng),
            10.0 * 2.0
        );
    }

    #[test]
    fn test_plain_hit_lands_at_face_value() {
        let mut defender = Char::new("d", "", 100.0);
        let attack = Attack::new("slash");
        let mut log = EventLog::new();
        let outcome = apply_damage(&mut defender, &attack, 30.0, &mut log);
        assert_eq!(outcome.dealt, 30.0);
        assert!(!outcome.died);
        assert_eq!(defender.hp.value(), 70.0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_lethal_hit_reports_death_once() {
        let mut defender = Char::new("d", "", 20.0);
        let attack = Attack::new("slash");
        let mut log = EventLog::new();
        let outcome = apply_damage(&mut defender, &attack, 25.0, &mut log);
        assert!(outcome.died);
        assert_eq!(
            log.iter()
                .filter(|e| matches!(e, CombatEvent::CharDied { .. }))
                .count(),
            1
        );
        // hitting a corpse again reports nothing new
        let outcome = apply_damage(&mut defender, &attack, 25.0, &mut log);
        assert!(!outcome.died);
    }

    #[test]
    fn test_mitigation_stacks_resist_then_defense() {
        let mut defender = Char::new("d", "", 100.0);
        defender
            .resists
            .insert("fire".to_string(), crate::values::Stat::new(50.0));
        defender.defense.set_base(100.0);
        let mut attack = Attack::new("fireball");
        attack.kind = "fire".to_string();
        let mut log = EventLog::new();
        let outcome = apply_damage(&mut defender, &attack, 40.0, &mut log);
        assert_eq!(outcome.dealt, 40.0 * 0.5 * 0.5);
        attack.nodefense = true;
        defender.hp.refill();
        let outcome = apply_damage(&mut defender, &attack, 40.0, &mut log);
        assert_eq!(outcome.dealt, 20.0);
    }

    #[test]
    fn test_counters_built_only_for_reflectable_hits() {
        let mut defender = Char::new("d", "", 100.0);
        defender.context.ensure_stat(STAT_THORNS).set_base(6.0);
        defender.context.ensure_stat(STAT_REFLECT).set_base(50.0);
        let mut attack = Attack::new("slash");
        let mut log = EventLog::new();
        let outcome = apply_damage(&mut defender, &attack, 20.0, &mut log);
        assert_eq!(outcome.counters.len(), 2);
        assert!(outcome.counters.iter().all(|c| c.unreflectable));
        let reflected = outcome
            .counters
            .iter()
            .find(|c| c.id == STAT_REFLECT)
            .unwrap();
        match &reflected.damage {
            Some(amount) => assert!(!amount.is_zero()),
            None => panic!("reflect counter carries no damage"),
        }
        attack.unreflectable = true;
        let outcome = apply_damage(&mut defender, &attack, 20.0, &mut log);
        assert!(outcome.counters.is_empty());
    }
}
