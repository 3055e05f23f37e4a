//! Main simulation runner.
//!
//! Every encounter runs through the real [`Combat`] loop at the fixed frame
//! rate, so balance numbers measured here match live behavior. Statistics
//! are read off the event stream, never off simulator-private logic.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

use super::config::SimConfig;
use super::report::{RunStats, SimReport};
use crate::chars::{Attack, AttackList, Char, Npc, Player, TargetFlags};
use crate::combat::{Combat, Combatant, CombatEvent, EventLog};
use crate::core::constants::TICK_SECONDS;
use crate::data::spawn::{NpcSource, TemplateSpawner};
use crate::data::GameData;
use crate::values::Amount;

/// Run the full batch and return a report.
pub fn run_simulation(config: &SimConfig, data: &GameData) -> SimReport {
    let mut all_runs = Vec::with_capacity(config.num_runs as usize);

    for run_idx in 0..config.num_runs {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(run_idx as u64)),
            None => ChaCha8Rng::from_entropy(),
        };

        let stats = simulate_single_run(config, data, &mut rng);

        if config.verbosity >= 2 {
            println!(
                "Run {}/{} - {} in {} ticks, dealt {:.0}, took {:.0}",
                run_idx + 1,
                config.num_runs,
                if stats.won {
                    "won"
                } else if stats.lost {
                    "lost"
                } else {
                    "stalled"
                },
                stats.ticks,
                stats.damage_dealt,
                stats.damage_taken
            );
        }

        all_runs.push(stats);
    }

    SimReport::from_runs(all_runs)
}

/// Tick one encounter to its end, or to the cap.
fn simulate_single_run(config: &SimConfig, data: &GameData, rng: &mut ChaCha8Rng) -> RunStats {
    let spawner = TemplateSpawner::new(data);
    let mut log = EventLog::new();

    let mut combat = Combat::new();
    combat.add_ally(Combatant::Player(build_player(config, data)));
    for id in &config.enemies {
        match spawner.create_npc(id, 0) {
            Some(npc) => {
                combat.add_enemy(npc, &mut log);
            }
            None => warn!(id = id.as_str(), "unknown npc template in roster"),
        }
    }
    combat.start(&mut log);

    let mut stats = RunStats::default();
    let mut ally_uids: BTreeSet<u32> = BTreeSet::new();

    while stats.ticks < config.max_ticks_per_run {
        log.clear();
        combat.update(TICK_SECONDS, data, &spawner, rng, &mut log);
        stats.ticks += 1;

        // summons can extend the player's side mid-battle
        for combatant in &combat.allies {
            ally_uids.insert(combatant.ch().uid);
        }
        tally_events(&log, &ally_uids, &mut stats);
        if combat
            .enemies
            .iter()
            .any(|c| !c.ch().dots.is_empty())
        {
            stats.dot_ticks += 1;
        }

        if combat.done() {
            stats.won = true;
            break;
        }
        if combat.lost() {
            stats.lost = true;
            break;
        }
    }

    stats.timed_out = !stats.won && !stats.lost;
    stats
}

/// Fold one tick's events into the running totals. Action events carry the
/// attacker's uid, dot events the victim's.
fn tally_events(log: &EventLog, ally_uids: &BTreeSet<u32>, stats: &mut RunStats) {
    for event in log.iter() {
        match event {
            CombatEvent::CharAction { uid, damage, .. }
            | CombatEvent::TriggerAction { uid, damage, .. } => {
                if ally_uids.contains(uid) {
                    stats.damage_dealt += damage;
                } else {
                    stats.damage_taken += damage;
                }
            }
            CombatEvent::DotAction { uid, damage, .. } => {
                if ally_uids.contains(uid) {
                    stats.damage_taken += damage;
                } else {
                    stats.damage_dealt += damage;
                }
            }
            _ => {}
        }
    }
}

/// The player's sheet comes from an npc template; a missing template
/// degrades to bare fists so a bad roster still produces numbers.
fn build_player(config: &SimConfig, data: &GameData) -> Player {
    let ch = match data.npc(&config.player) {
        Some(template) => Npc::instance(template, 0).ch,
        None => {
            warn!(
                id = config.player.as_str(),
                "unknown player template; using bare fists"
            );
            let mut ch = Char::new("hero", "Hero", 100.0);
            let mut punch = Attack::new("punch");
            punch.damage = Some(Amount::parse("1~3"));
            punch.targets = TargetFlags::ENEMIES;
            ch.attack = AttackList::from(punch);
            ch
        }
    };
    Player::new(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duel_data() -> GameData {
        let mut data = GameData::new();

        let mut hero = Char::new("hero", "Hero", 100.0);
        let mut smite = Attack::new("smite");
        smite.damage = Some(Amount::parse("4~6"));
        smite.targets = TargetFlags::ENEMIES;
        hero.attack = AttackList::from(smite);
        data.add_npc("hero", Npc { ch: hero, loot: None });

        let mut rat = Char::new("rat", "Giant Rat", 30.0);
        let mut bite = Attack::new("bite");
        bite.damage = Some(Amount::parse("1~2"));
        bite.targets = TargetFlags::ENEMY_LEADER;
        rat.attack = AttackList::from(bite);
        data.add_npc(
            "rat",
            Npc {
                ch: rat,
                loot: Some("vermin".to_string()),
            },
        );

        data
    }

    #[test]
    fn test_single_run_fights_to_a_verdict() {
        let data = duel_data();
        let config = SimConfig {
            num_runs: 1,
            seed: Some(12345),
            max_ticks_per_run: 5_000,
            verbosity: 0,
            ..SimConfig::default()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(12345);
        let stats = simulate_single_run(&config, &data, &mut rng);

        assert!(stats.won);
        assert!(stats.damage_dealt >= 30.0);
        assert!(stats.ticks > 0);
    }

    #[test]
    fn test_missing_player_template_falls_back() {
        let data = duel_data();
        let config = SimConfig {
            num_runs: 1,
            seed: Some(4),
            player: "nobody".to_string(),
            max_ticks_per_run: 5_000,
            verbosity: 0,
            ..SimConfig::default()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let stats = simulate_single_run(&config, &data, &mut rng);
        // bare fists still chew through a thirty hp rat
        assert!(stats.won);
    }

    #[test]
    fn test_full_simulation_counts_outcomes() {
        let data = duel_data();
        let config = SimConfig {
            num_runs: 5,
            seed: Some(42),
            max_ticks_per_run: 5_000,
            verbosity: 0,
            ..SimConfig::default()
        };

        let report = run_simulation(&config, &data);

        assert_eq!(report.num_runs, 5);
        assert_eq!(report.wins + report.losses + report.timeouts, 5);
        assert!(report.avg_damage_dealt > 0.0);
    }

    #[test]
    fn test_same_seed_same_report() {
        let data = duel_data();
        let config = SimConfig {
            num_runs: 3,
            seed: Some(9000),
            max_ticks_per_run: 5_000,
            verbosity: 0,
            ..SimConfig::default()
        };

        let first = run_simulation(&config, &data);
        let second = run_simulation(&config, &data);

        assert_eq!(first.run_stats, second.run_stats);
        assert_eq!(first.to_text(), second.to_text());
    }
}
