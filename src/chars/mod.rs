//! Combatants and everything attached to them: attacks, dots, states.

#![allow(unused_imports)]

pub mod attack;
pub mod character;
pub mod context;
pub mod dot;
pub mod npc;
pub mod player;
pub mod states;

pub use attack::{AffectedBy, Attack, AttackList, Cost, OnlyFilter, TargetFlags, TargetSpec};
pub use character::{ActionSource, Char, Pending, Team};
pub use context::Context;
pub use dot::{Dot, DotConditional, DotEffect, DotSpec, SummonSpec};
pub use npc::Npc;
pub use player::Player;
pub use states::{StateFlags, States};
