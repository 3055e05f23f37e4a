//! Modifiers on a saturating 0..1 curve.

use serde::{Deserialize, Serialize};

use crate::values::modifier::Mod;

/// A modifier whose `count` follows a rational curve from 0 to 1.
///
/// With progress `r = v / max`, `half` fixes where the curve crosses one
/// half: `0.5` is linear, smaller values front-load the gain, larger values
/// back-load it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvedMod {
    #[serde(flatten)]
    pub inner: Mod,
    pub max: f64,
    pub half: f64,
}

impl CurvedMod {
    pub fn new(inner: Mod, max: f64, half: f64) -> Self {
        Self { inner, max, half }
    }

    /// The count a driving value of `v` produces, always within `[0, 1]`.
    pub fn count_for(&self, v: f64) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        let r = (v / self.max).clamp(0.0, 1.0);
        let h = self.half.clamp(1e-6, 1.0 - 1e-6);
        let num = r * (1.0 - h);
        let den = num + h * (1.0 - r);
        if den == 0.0 {
            0.0
        } else {
            num / den
        }
    }

    pub fn set_count(&mut self, v: f64) {
        self.inner.count = self.count_for(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(max: f64, half: f64, v: f64) -> f64 {
        CurvedMod::new(Mod::flat("c", 1.0), max, half).count_for(v)
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(curve(100.0, 0.25, 0.0), 0.0);
        assert_eq!(curve(100.0, 0.25, 100.0), 1.0);
        assert_eq!(curve(100.0, 0.25, 250.0), 1.0);
        assert_eq!(curve(100.0, 0.25, -10.0), 0.0);
    }

    #[test]
    fn test_half_point_crosses_one_half() {
        for h in [0.1, 0.25, 0.5, 0.75, 0.9] {
            let c = curve(100.0, h, h * 100.0);
            assert!((c - 0.5).abs() < 1e-12, "half {} gave {}", h, c);
        }
    }

    #[test]
    fn test_half_of_one_half_is_linear() {
        for v in 0..=10 {
            let r = v as f64 / 10.0;
            let c = curve(10.0, 0.5, v as f64);
            assert!((c - r).abs() < 1e-12);
        }
    }

    #[test]
    fn test_low_half_front_loads() {
        assert!(curve(100.0, 0.2, 30.0) > 0.3);
        assert!(curve(100.0, 0.8, 30.0) < 0.3);
    }

    #[test]
    fn test_matches_expanded_denominator_form() {
        // Same curve written with the denominator multiplied out.
        for v in 0..=20 {
            for h in [0.1, 0.25, 0.5, 0.75, 0.9] {
                let r = (v as f64 / 20.0).clamp(0.0, 1.0);
                let alt = r * (1.0 - h) / (h + r * (1.0 - 2.0 * h));
                let c = curve(20.0, h, v as f64);
                assert!((c - alt).abs() < 1e-12, "v={} h={}", v, h);
            }
        }
    }

    #[test]
    fn test_degenerate_max_reads_zero() {
        assert_eq!(curve(0.0, 0.5, 5.0), 0.0);
        assert_eq!(curve(-3.0, 0.5, 5.0), 0.0);
    }
}
