//! Battle balance simulator CLI.
//!
//! Runs batches of scripted encounters and reports win rate, pacing,
//! damage throughput and dot uptime.
//!
//! Usage:
//!   cargo run --bin simulate -- [OPTIONS]
//!
//! Examples:
//!   cargo run --bin simulate                      # Demo duel: hero vs rat
//!   cargo run --bin simulate -- -n 500 -e wolf    # 500 runs against a wolf
//!   cargo run --bin simulate -- --seed 42         # Reproducible run
//!   cargo run --bin simulate -- -d content.json -p knight -e rat -e wolf

use grimquest::build_info;
use grimquest::data::GameData;
use grimquest::simulator::{run_simulation, SimConfig};
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

/// Roster used when no content file is given: one hero, two beasts.
const DEMO_CONTENT: &str = r#"{
    "dots": {
        "rend_bleed": {
            "kind": "bleed",
            "duration": 3,
            "damage": "1~2",
            "tags": ["bleed"]
        }
    },
    "npcs": {
        "hero": {
            "name": "Hero",
            "hp": 120,
            "tohit": 10,
            "defense": 8,
            "attack": {
                "id": "smite",
                "name": "Smite",
                "kind": "holy",
                "damage": "6~9",
                "targets": "ENEMY_LEADER | ENEMY_MINIONS"
            }
        },
        "rat": {
            "name": "Giant Rat",
            "hp": 30,
            "speed": 0.8,
            "dodge": 5,
            "attack": {
                "id": "bite",
                "name": "Bite",
                "kind": "pierce",
                "damage": "1~3",
                "targets": "ENEMY_LEADER"
            },
            "loot": "rat_tail"
        },
        "wolf": {
            "name": "Dire Wolf",
            "hp": 55,
            "speed": 1.1,
            "attack": {
                "id": "rend",
                "name": "Rend",
                "kind": "slash",
                "damage": "3~5",
                "targets": "ENEMY_LEADER",
                "dot": "rend_bleed"
            },
            "loot": "wolf_pelt"
        }
    }
}"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let (config, data_path) = parse_args(&args);

    let data = match load_data(data_path.as_deref()) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    };

    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║              GRIMQUEST BATTLE SIMULATOR                       ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
    println!(
        "grimquest {} (built {})",
        build_info::VERSION,
        build_info::BUILD_DATE
    );
    println!();
    println!("Configuration:");
    println!("  Runs:           {}", config.num_runs);
    println!("  Player:         {}", config.player);
    println!("  Enemies:        {}", config.enemies.join(", "));
    println!("  Max Ticks:      {}", config.max_ticks_per_run);
    println!(
        "  Data:           {}",
        data_path.as_deref().unwrap_or("built-in demo")
    );
    if let Some(seed) = config.seed {
        println!("  Seed:           {}", seed);
    }
    println!();
    println!("Running simulation...");
    println!();

    let report = run_simulation(&config, &data);

    println!("{}", report.to_text());

    // Optionally save JSON report
    if args.iter().any(|a| a == "--json") {
        let json = report.to_json();
        let filename = format!(
            "sim_report_{}.json",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        );
        std::fs::write(&filename, json).expect("Failed to write JSON report");
        println!("JSON report saved to: {}", filename);
    }
}

fn parse_args(args: &[String]) -> (SimConfig, Option<String>) {
    let mut config = SimConfig::default();
    let mut data_path = None;
    let mut enemies_given = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-n" | "--runs" => {
                if i + 1 < args.len() {
                    config.num_runs = args[i + 1].parse().unwrap_or(100);
                    i += 1;
                }
            }
            "-s" | "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "-t" | "--ticks" => {
                if i + 1 < args.len() {
                    config.max_ticks_per_run = args[i + 1].parse().unwrap_or(10_000);
                    i += 1;
                }
            }
            "-p" | "--player" => {
                if i + 1 < args.len() {
                    config.player = args[i + 1].clone();
                    i += 1;
                }
            }
            "-e" | "--enemy" => {
                if i + 1 < args.len() {
                    // First -e replaces the default roster, later ones extend it.
                    if !enemies_given {
                        config.enemies.clear();
                        enemies_given = true;
                    }
                    config.enemies.push(args[i + 1].clone());
                    i += 1;
                }
            }
            "-d" | "--data" => {
                if i + 1 < args.len() {
                    data_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "-v" | "--verbose" => {
                config.verbosity = 2;
            }
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    (config, data_path)
}

fn load_data(path: Option<&str>) -> Result<GameData, String> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {}", path, err))?;
            GameData::from_json(&text).map_err(|err| format!("cannot parse {}: {}", path, err))
        }
        None => Ok(GameData::from_json(DEMO_CONTENT).expect("demo content is valid")),
    }
}

fn print_help() {
    println!("Grimquest Battle Simulator");
    println!();
    println!("USAGE:");
    println!("    cargo run --bin simulate -- [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -n, --runs <N>      Number of simulation runs (default: 100)");
    println!("    -s, --seed <S>      Random seed for reproducibility");
    println!("    -t, --ticks <T>     Max ticks per run (default: 10,000)");
    println!("    -p, --player <ID>   Npc template the player fights as (default: hero)");
    println!("    -e, --enemy <ID>    Enemy template; repeat for a bigger pack (default: rat)");
    println!("    -d, --data <FILE>   Content JSON with dots/attacks/npcs (default: built-in)");
    println!("    -v, --verbose       Per-run result lines");
    println!("    --json              Save JSON report");
    println!("    -h, --help          Show this help");
    println!();
    println!("EXAMPLES:");
    println!("    cargo run --bin simulate                      # Demo duel: hero vs rat");
    println!("    cargo run --bin simulate -- -n 500 -e wolf    # 500 runs against a wolf");
    println!("    cargo run --bin simulate -- --seed 42         # Reproducible");
    println!("    cargo run --bin simulate -- -e rat -e rat     # Outnumbered two to one");
}
