//! Simulation configuration.

/// Knobs for a batch of simulated encounters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Number of encounters to run.
    pub num_runs: u32,

    /// Base seed for reproducibility; run `i` derives its own stream from
    /// `seed + i`. None draws from entropy.
    pub seed: Option<u64>,

    /// Tick cap per encounter before calling it a stalemate.
    pub max_ticks_per_run: u64,

    /// Npc template the player's sheet is built from.
    pub player: String,

    /// Npc templates fielded against the player, one enemy each.
    pub enemies: Vec<String>,

    /// Log verbosity (0 = silent, 1 = summary, 2 = per-run lines).
    pub verbosity: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            seed: None,
            max_ticks_per_run: 10_000,
            player: "hero".to_string(),
            enemies: vec!["rat".to_string()],
            verbosity: 1,
        }
    }
}

impl SimConfig {
    /// Quick config for a reproducible duel against one enemy kind.
    pub fn duel(player: &str, enemy: &str, num_runs: u32) -> Self {
        Self {
            num_runs,
            seed: Some(0),
            player: player.to_string(),
            enemies: vec![enemy.to_string()],
            ..Default::default()
        }
    }
}
