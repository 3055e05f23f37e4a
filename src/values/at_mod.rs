//! Threshold-gated modifiers.

use serde::{Deserialize, Serialize};

use crate::values::modifier::Mod;

/// Comparison operator for threshold mods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AtOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[default]
    #[serde(rename = ">=")]
    Ge,
}

impl AtOp {
    pub fn matches(self, value: f64, at: f64) -> bool {
        match self {
            AtOp::Eq => value == at,
            AtOp::Lt => value < at,
            AtOp::Le => value <= at,
            AtOp::Gt => value > at,
            AtOp::Ge => value >= at,
        }
    }

    fn is_default(op: &AtOp) -> bool {
        *op == AtOp::Ge
    }
}

/// A modifier that only applies once its driving value passes `at`.
///
/// `count` snaps to 1 while the comparison holds and 0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtMod {
    #[serde(flatten)]
    pub inner: Mod,
    pub at: f64,
    #[serde(default, skip_serializing_if = "AtOp::is_default")]
    pub op: AtOp,
}

impl AtMod {
    pub fn new(inner: Mod, at: f64, op: AtOp) -> Self {
        Self { inner, at, op }
    }

    pub fn set_count(&mut self, v: f64) {
        self.inner.count = if self.op.matches(v, self.at) { 1.0 } else { 0.0 };
    }
}
