//! Shared constants and per-frame bookkeeping

#![allow(unused_imports)]

pub mod constants;
pub mod dirty;

pub use constants::{
    DOT_PERIOD_SECONDS, MAX_COMBATANTS, MOD_CASCADE_DEPTH, OVERCROWD_LIMIT, TICK_SECONDS,
};
pub use dirty::Dirty;
