//! Random numeric ranges written `"min~max"` in content data.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for range strings that are not of the form `min~max`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid range `{0}`, expected `min~max`")]
pub struct ParseRangeError(pub String);

/// An inclusive numeric range rolled uniformly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandRange {
    pub min: f64,
    pub max: f64,
}

impl RandRange {
    /// Build a range, swapping reversed bounds.
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Roll a value uniformly between the bounds.
    pub fn roll(&self, rng: &mut impl Rng) -> f64 {
        if self.min == self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    /// Average roll, used when a static reading is needed.
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

impl fmt::Display for RandRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.min, self.max)
    }
}

impl FromStr for RandRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once('~')
            .ok_or_else(|| ParseRangeError(s.to_string()))?;
        let min: f64 = lo
            .trim()
            .parse()
            .map_err(|_| ParseRangeError(s.to_string()))?;
        let max: f64 = hi
            .trim()
            .parse()
            .map_err(|_| ParseRangeError(s.to_string()))?;
        Ok(Self::new(min, max))
    }
}

impl Serialize for RandRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RandRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
