//! Modifiers that scale across a value range.

use serde::{Deserialize, Serialize};

use crate::values::modifier::Mod;
use crate::values::{is_false, is_zero};

/// Rounding applied when a ranged mod quantizes into steps or sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    Ceil,
    #[default]
    Floor,
    Round,
}

impl RoundMode {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            RoundMode::Ceil => v.ceil(),
            RoundMode::Floor => v.floor(),
            RoundMode::Round => v.round(),
        }
    }

    fn is_default(mode: &RoundMode) -> bool {
        *mode == RoundMode::Floor
    }
}

/// A modifier whose `count` grows with a driving value over `[min, max]`.
///
/// Count is zero below `min` (and at `min` itself when `min_exclusive`),
/// grows linearly with the clamped value less `min`, tops out at the range
/// width, and may be quantized into `step`-sized increments or a fixed
/// number of `sections`. `start` offsets whatever comes out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedMod {
    #[serde(flatten)]
    pub inner: Mod,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub min_exclusive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub start: f64,
    #[serde(default, skip_serializing_if = "RoundMode::is_default")]
    pub round: RoundMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<f64>,
}

impl RangedMod {
    pub fn new(inner: Mod, min: f64, max: f64) -> Self {
        Self {
            inner,
            min,
            max,
            min_exclusive: false,
            step: None,
            start: 0.0,
            round: RoundMode::default(),
            sections: None,
        }
    }

    /// The count a driving value of `v` produces.
    pub fn count_for(&self, v: f64) -> f64 {
        if v < self.min || (self.min_exclusive && v <= self.min) {
            return 0.0;
        }
        let clamped = v.min(self.max);
        let offset = clamped - self.min;
        let scaled = if let Some(step) = self.step.filter(|s| *s > 0.0) {
            self.round.apply(offset / step) * step
        } else if let Some(sections) = self.sections.filter(|s| *s > 0.0) {
            let size = (self.max - self.min) / sections;
            if size > 0.0 {
                self.round.apply(offset / size)
            } else {
                0.0
            }
        } else {
            offset
        };
        scaled + self.start
    }

    pub fn set_count(&mut self, v: f64) {
        self.inner.count = self.count_for(v);
    }
}
