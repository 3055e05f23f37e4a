//! Simulation report generation.

use serde::Serialize;

use crate::core::constants::TICK_SECONDS;

/// What one simulated encounter amounted to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub won: bool,
    pub lost: bool,
    pub timed_out: bool,
    pub ticks: u64,
    /// Damage the player's side landed, after mitigation.
    pub damage_dealt: f64,
    /// Damage the player's side absorbed, after mitigation.
    pub damage_taken: f64,
    /// Ticks during which at least one enemy carried an active dot.
    pub dot_ticks: u64,
}

/// Aggregated results from a batch of runs.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub num_runs: u32,
    pub wins: u32,
    pub losses: u32,
    pub timeouts: u32,

    pub avg_ticks: f64,
    pub avg_seconds: f64,
    pub avg_damage_dealt: f64,
    pub avg_damage_taken: f64,
    /// Share of battle time the enemies spent dotted, averaged over runs.
    pub avg_dot_uptime: f64,

    pub run_stats: Vec<RunStats>,
}

impl SimReport {
    /// Aggregate a batch of completed runs.
    pub fn from_runs(runs: Vec<RunStats>) -> Self {
        let num_runs = runs.len() as u32;
        let denom = num_runs.max(1) as f64;
        let wins = runs.iter().filter(|r| r.won).count() as u32;
        let losses = runs.iter().filter(|r| r.lost).count() as u32;
        let timeouts = runs.iter().filter(|r| r.timed_out).count() as u32;

        let avg_ticks = runs.iter().map(|r| r.ticks as f64).sum::<f64>() / denom;
        let avg_damage_dealt = runs.iter().map(|r| r.damage_dealt).sum::<f64>() / denom;
        let avg_damage_taken = runs.iter().map(|r| r.damage_taken).sum::<f64>() / denom;
        let avg_dot_uptime = runs
            .iter()
            .map(|r| {
                if r.ticks == 0 {
                    0.0
                } else {
                    r.dot_ticks as f64 / r.ticks as f64
                }
            })
            .sum::<f64>()
            / denom;

        Self {
            num_runs,
            wins,
            losses,
            timeouts,
            avg_ticks,
            avg_seconds: avg_ticks * TICK_SECONDS,
            avg_damage_dealt,
            avg_damage_taken,
            avg_dot_uptime,
            run_stats: runs,
        }
    }

    pub fn win_rate(&self) -> f64 {
        self.wins as f64 / self.num_runs.max(1) as f64
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                      BATTLE SIMULATION\n");
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Runs: {} total, {} won, {} lost, {} stalled\n\n",
            self.num_runs, self.wins, self.losses, self.timeouts
        ));

        report.push_str("── OUTCOME ──────────────────────────────────────────────────────\n");
        let win_pct = self.win_rate() * 100.0;
        let bar: String = "█".repeat((win_pct / 5.0) as usize);
        report.push_str(&format!("  Win Rate:        {:>5.1}% {}\n", win_pct, bar));
        report.push_str(&format!("  Avg Battle:      {:.0} ticks ({:.1} s)\n\n", self.avg_ticks, self.avg_seconds));

        report.push_str("── DAMAGE ───────────────────────────────────────────────────────\n");
        report.push_str(&format!("  Avg Dealt:       {:.1}\n", self.avg_damage_dealt));
        report.push_str(&format!("  Avg Taken:       {:.1}\n", self.avg_damage_taken));
        let per_second = if self.avg_seconds > 0.0 {
            self.avg_damage_dealt / self.avg_seconds
        } else {
            0.0
        };
        report.push_str(&format!("  Avg Dealt / s:   {:.2}\n", per_second));
        report.push_str(&format!(
            "  Dot Uptime:      {:.1}%\n\n",
            self.avg_dot_uptime * 100.0
        ));

        report.push_str("── BALANCE ASSESSMENT ───────────────────────────────────────────\n");
        let rating = if win_pct >= 99.0 && self.avg_damage_taken < self.avg_damage_dealt * 0.1 {
            "TOO EASY - the player is never threatened"
        } else if win_pct >= 60.0 {
            "GOOD - winnable with real risk"
        } else if win_pct >= 20.0 {
            "HARD - most attempts fail"
        } else {
            "TOO HARD - effectively unwinnable"
        };
        report.push_str(&format!("  Rating:          {}\n", rating));
        if self.timeouts > 0 {
            report.push_str(&format!(
                "  ⚠️  {} runs stalled - not enough damage on one side?\n",
                self.timeouts
            ));
        }

        report.push_str("\n═══════════════════════════════════════════════════════════════\n");

        report
    }

    /// Generate a JSON report for further analysis.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
