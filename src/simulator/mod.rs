//! Headless battle simulator for balance analysis.
//!
//! Runs batches of seeded encounters through the real combat loop and
//! aggregates the outcomes:
//! - win/loss/stall rates and battle length
//! - damage dealt and taken per run
//! - dot uptime on the enemy side
//!
//! Everything goes through `Combat::update`, so simulated numbers match
//! live gameplay behavior.

mod config;
mod report;
mod runner;

pub use config::SimConfig;
pub use report::{RunStats, SimReport};
pub use runner::run_simulation;
