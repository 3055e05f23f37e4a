//! The battle core: rosters, turn order, targeting and damage resolution.

#![allow(unused_imports)]

pub mod encounter;
pub mod events;
pub mod resolve;
pub mod targeting;

pub use encounter::{Combat, Combatant};
pub use events::{CombatEvent, EventLog, EventSink, NullSink};
pub use resolve::{
    apply_damage, calc_damage, defense_multiplier, dodge_chance, resist_multiplier, try_hit,
    DamageOutcome,
};
pub use targeting::{get_target, TargetQuery};
