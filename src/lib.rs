//! Grimquest - Incremental RPG Battle Core
//!
//! Data-driven characters, dots and attacks resolved by a deterministic
//! battle loop, with a Monte Carlo balance simulator on top.

pub mod build_info;
pub mod chars;
pub mod combat;
pub mod core;
pub mod data;
pub mod simulator;
pub mod values;
