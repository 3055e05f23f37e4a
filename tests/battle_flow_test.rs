//! End-to-end battles driven through `Combat::update`.
//!
//! Small rosters fight whole encounters on a seeded rng; each test checks
//! that the event stream tells the same story as the final state: kill
//! order, dot lifecycles, taunt redirection, healing, items, and a
//! mid-battle save that resumes without drift.

use grimquest::chars::{Attack, AttackList, Char, Dot, DotSpec, Npc, Player, StateFlags, TargetFlags};
use grimquest::combat::{Combat, Combatant, CombatEvent, EventLog};
use grimquest::data::{GameData, TemplateSpawner};
use grimquest::values::Amount;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn test_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

fn strike_attack(id: &str, damage: f64, targets: TargetFlags) -> Attack {
    let mut attack = Attack::new(id);
    attack.damage = Some(Amount::fixed(damage));
    attack.targets = targets;
    attack
}

fn hero(hp: f64, attack: Attack) -> Combatant {
    let mut ch = Char::new("hero", "Hero", hp);
    ch.attack = AttackList::from(attack);
    Combatant::Player(Player::new(ch))
}

fn beast(id: &str, name: &str, hp: f64, attack: Option<Attack>) -> Npc {
    let mut ch = Char::new(id, name, hp);
    if let Some(attack) = attack {
        ch.attack = AttackList::from(attack);
    }
    Npc { ch, loot: None }
}

/// Advance the battle `updates` times with a one-second step, so every
/// speed-1.0 combatant acts once per update.
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

// =============================================================================
// 1. Kill order and the event pipeline
// =============================================================================

#[test]
fn test_pack_fight_clears_leader_first() {
    let data = GameData::new();
    let mut combat = Combat::new();
    combat.add_ally(hero(
        100.0,
        strike_attack("smite", 10.0, TargetFlags::ENEMY_LEADER),
    ));
    let mut log = EventLog::new();
    let bite = strike_attack("bite", 1.0, TargetFlags::ENEMY_LEADER);
    combat
        .add_enemy(beast("rat", "Sewer Rat", 20.0, Some(bite.clone())), &mut log)
        .unwrap();
    combat
        .add_enemy(beast("rat", "Sewer Rat", 20.0, Some(bite)), &mut log)
        .unwrap();
    combat.start(&mut log);

    match log.iter().next() {
        Some(CombatEvent::EncStart { enemies }) => assert_eq!(enemies.len(), 2),
        other => panic!("expected EncStart first, got {other:?}"),
    }

    let mut rng = test_rng();
    drive(&mut combat, 4, &data, &mut rng, &mut log);

    assert!(combat.done());
    assert!(!combat.active);
    // two rats went down, then the battle closed
    assert_eq!(
        log.iter()
            .filter(|e| matches!(e, CombatEvent::EnemySlain { .. }))
            .count(),
        2
    );
    assert!(log.iter().any(|e| matches!(e, CombatEvent::CombatWon)));

    // the death notice lands while damage resolves, the kill credit after
    let died = log
        .iter()
        .position(|e| matches!(e, CombatEvent::CharDied { .. }))
        .unwrap();
    let slain = log
        .iter()
        .position(|e| matches!(e, CombatEvent::EnemySlain { .. }))
        .unwrap();
    assert!(died < slain);

    // four bites landed across the fight: two in round one, then one per
    // round while the second rat stood alone, none in the closing round
    assert_eq!(combat.leader().unwrap().hp.value(), 96.0);
}

#[test]
fn test_fallen_leader_means_lost() {
    let data = GameData::new();
    let mut combat = Combat::new();
    combat.add_ally(hero(
        100.0,
        strike_attack("smite", 1.0, TargetFlags::ENEMY_LEADER),
    ));
    let mut log = EventLog::new();
    let club = strike_attack("club", 40.0, TargetFlags::ENEMY_LEADER);
    combat
        .add_enemy(beast("ogre", "Gate Ogre", 1000.0, Some(club)), &mut log)
        .unwrap();
    combat.start(&mut log);

    let mut rng = test_rng();
    drive(&mut combat, 5, &data, &mut rng, &mut log);

    assert!(combat.lost());
    assert!(!combat.done());
    // losing does not close the encounter on its own; the caller decides
    assert!(combat.active);
    assert_eq!(combat.leader().unwrap().hp.value(), 0.0);
    assert!(log
        .iter()
        .any(|e| matches!(e, CombatEvent::CharDied { name, .. } if name == "Hero")));
}

// =============================================================================
// 2. Dot lifecycle through the registry
// =============================================================================

#[test]
fn test_registered_bleed_burns_and_expires() {
    let mut bleed = Dot::new("bleed");
    bleed.duration = 3.0;
    bleed.effect.damage = Some(Amount::fixed(2.0));
    let mut data = GameData::new();
    data.add_dot(bleed);

    let mut rend = strike_attack("rend", 1.0, TargetFlags::ENEMY_LEADER);
    rend.dot = Some(DotSpec::Id("bleed".to_string()));

    let mut combat = Combat::new();
    combat.add_ally(hero(100.0, rend));
    let mut log = EventLog::new();
    let shell_uid = combat
        .add_enemy(beast("tortoise", "Ancient Tortoise", 100.0, None), &mut log)
        .unwrap();
    combat.start(&mut log);

    let mut rng = test_rng();
    drive(&mut combat, 1, &data, &mut rng, &mut log);
    assert!(combat.find(shell_uid).unwrap().ch().has_dot("bleed"));
    assert_eq!(combat.find(shell_uid).unwrap().ch().hp.value(), 99.0);

    // the hero stops attacking; the wound keeps bleeding on its own clock
    combat.allies[0].ch_mut().attack = AttackList::default();
    drive(&mut combat, 4, &data, &mut rng, &mut log);

    let shell = combat.find(shell_uid).unwrap().ch();
    assert_eq!(shell.hp.value(), 93.0);
    assert!(!shell.has_dot("bleed"));
    assert_eq!(
        log.iter()
            .filter(|e| matches!(e, CombatEvent::DotAction { damage, .. } if *damage == 2.0))
            .count(),
        3
    );
    assert!(combat.active);
    assert!(!combat.done());
}

// =============================================================================
// 3. Targeting: taunt pulls hostile attention off the leader
// =============================================================================

#[test]
fn test_taunting_guard_soaks_the_bites() {
    let data = GameData::new();
    let mut combat = Combat::new();
    combat.add_ally(hero(
        100.0,
        strike_attack("smite", 10.0, TargetFlags::ENEMY_LEADER),
    ));
    let mut guard = beast("guard", "Stalwart Guard", 80.0, None);
    guard.ch.states.add("challenge", StateFlags::TAUNT);
    let guard_uid = combat.add_ally(Combatant::Npc(guard));
    let mut log = EventLog::new();
    let bite = strike_attack("bite", 5.0, TargetFlags::ENEMIES);
    let rat_uid = combat
        .add_enemy(beast("rat", "Sewer Rat", 1000.0, Some(bite)), &mut log)
        .unwrap();
    combat.start(&mut log);

    let mut rng = test_rng();
    drive(&mut combat, 3, &data, &mut rng, &mut log);

    // every bite went to the taunting guard, never to the leader
    assert_eq!(combat.leader().unwrap().hp.value(), 100.0);
    assert_eq!(combat.find(guard_uid).unwrap().ch().hp.value(), 65.0);
    assert_eq!(combat.find(rat_uid).unwrap().ch().hp.value(), 970.0);
    assert!(log.iter().any(|e| matches!(
        e,
        CombatEvent::CharAction { attack, target, .. }
            if attack == "bite" && target == "Stalwart Guard"
    )));
}

// =============================================================================
// 4. Healing keeps the line standing
// =============================================================================

#[test]
fn test_field_medic_outpaces_the_bites() {
    let data = GameData::new();
    let mut combat = Combat::new();
    combat.add_ally(hero(
        50.0,
        strike_attack("smite", 5.0, TargetFlags::ENEMY_LEADER),
    ));
    let mut mend = Attack::new("mend");
    mend.healing = Some(Amount::fixed(4.0));
    mend.targets = TargetFlags::ALLY_LEADER;
    mend.harmless = true;
    combat.add_ally(Combatant::Npc(beast("cleric", "Field Medic", 40.0, Some(mend))));
    let mut log = EventLog::new();
    let bite = strike_attack("bite", 3.0, TargetFlags::ENEMY_LEADER);
    combat
        .add_enemy(beast("rat", "Sewer Rat", 40.0, Some(bite)), &mut log)
        .unwrap();
    combat.start(&mut log);

    let mut rng = test_rng();
    drive(&mut combat, 8, &data, &mut rng, &mut log);

    assert!(combat.done());
    // overheal clamps at the pool maximum
    assert_eq!(combat.leader().unwrap().hp.value(), 50.0);
    assert!(log.iter().any(|e| matches!(
        e,
        CombatEvent::CharAction { attack, healing, .. }
            if attack == "mend" && *healing == 4.0
    )));
}

// =============================================================================
// 5. Items resolve outside the turn cadence
// =============================================================================

#[test]
fn test_healing_draught_between_swings() {
    let data = GameData::new();
    let mut combat = Combat::new();
    let hero_uid = combat.add_ally(hero(
        100.0,
        strike_attack("smite", 5.0, TargetFlags::ENEMY_LEADER),
    ));
    let mut log = EventLog::new();
    combat
        .add_enemy(beast("tortoise", "Ancient Tortoise", 500.0, None), &mut log)
        .unwrap();
    combat.start(&mut log);
    combat.allies[0].ch_mut().hp.damage(80.0);
    assert_eq!(combat.leader().unwrap().hp.value(), 20.0);

    let mut draught = Attack::new("draught");
    draught.healing = Some(Amount::fixed(50.0));

    let spawner = TemplateSpawner::new(&data);
    let mut rng = test_rng();
    combat.use_item(
        hero_uid,
        "healing_draught",
        Some(draught),
        &data,
        &spawner,
        &mut rng,
        &mut log,
    );

    assert_eq!(combat.leader().unwrap().hp.value(), 70.0);
    assert!(log
        .iter()
        .any(|e| matches!(e, CombatEvent::ItemAction { item, .. } if item == "healing_draught")));
    assert!(log.iter().any(|e| matches!(
        e,
        CombatEvent::CharAction { attack, healing, .. }
            if attack == "draught" && *healing == 50.0
    )));
}

// =============================================================================
// 6. Saving mid-battle and resuming without drift
// =============================================================================

#[test]
fn test_saved_battle_resumes_identically() {
    let mut venom = Dot::new("venom");
    venom.duration = 4.0;
    venom.effect.damage = Some(Amount::fixed(3.0));
    let mut fang = strike_attack("fang", 2.0, TargetFlags::ENEMY_LEADER);
    fang.dot = Some(DotSpec::Inline(Box::new(venom)));

    let data = GameData::new();
    let mut combat = Combat::new();
    combat.add_ally(hero(100.0, fang));
    let mut log = EventLog::new();
    let bite = strike_attack("bite", 2.0, TargetFlags::ENEMY_LEADER);
    let shell_uid = combat
        .add_enemy(beast("tortoise", "Ancient Tortoise", 80.0, Some(bite)), &mut log)
        .unwrap();
    combat.start(&mut log);

    let mut rng = test_rng();
    drive(&mut combat, 2, &data, &mut rng, &mut log);

    let saved = serde_json::to_string(&combat).unwrap();
    let mut restored: Combat = serde_json::from_str(&saved).unwrap();
    assert!(restored.active);
    assert!(restored.find(shell_uid).unwrap().ch().has_dot("venom"));

    // the same rng stream must drive both copies to the same place
    let mut rng_restored = rng.clone();
    let mut log_restored = EventLog::new();
    drive(&mut combat, 4, &data, &mut rng, &mut log);
    drive(&mut restored, 4, &data, &mut rng_restored, &mut log_restored);

    assert_eq!(
        combat.leader().unwrap().hp.value(),
        restored.leader().unwrap().hp.value()
    );
    assert_eq!(
        combat.find(shell_uid).unwrap().ch().hp.value(),
        restored.find(shell_uid).unwrap().ch().hp.value()
    );
    assert_eq!(combat.done(), restored.done());
}
