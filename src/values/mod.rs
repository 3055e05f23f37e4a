//! Numeric value model: stats, modifiers and data-driven formulas

#![allow(unused_imports)]

pub mod amount;
pub mod at_mod;
pub mod curved_mod;
pub mod expr;
pub mod fvalue;
pub mod modifier;
pub mod range;
pub mod ranged_mod;
pub mod rvalue;
pub mod stat;

pub use amount::Amount;
pub use at_mod::{AtMod, AtOp};
pub use curved_mod::CurvedMod;
pub use expr::{parse_expr, EvalContext, Expr, ExprError};
pub use fvalue::FValue;
pub use modifier::{AnyMod, Mod, ModBlock, ModSpec, ParseModError};
pub use range::{ParseRangeError, RandRange};
pub use ranged_mod::{RangedMod, RoundMode};
pub use rvalue::RValue;
pub use stat::{PointStat, Stat};

use tracing::warn;

/// Clamp non-finite math results to zero so bad content cannot poison state.
pub(crate) fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        warn!("non-finite value clamped to zero");
        0.0
    }
}

// serde helpers for omit-if-default output
pub(crate) fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

pub(crate) fn is_one(v: &f64) -> bool {
    *v == 1.0
}

pub(crate) fn one() -> f64 {
    1.0
}

pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}
