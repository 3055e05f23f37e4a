//! Polymorphic damage/heal payloads.

use rand::Rng;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

use crate::values::expr::EvalContext;
use crate::values::fvalue::FValue;
use crate::values::modifier::AnyMod;
use crate::values::range::RandRange;
use crate::values::rvalue::RValue;
use crate::values::stat::Stat;

/// A damage or healing quantity from content: a constant, a random range
/// (`"2~6"`), or a formula (`"actor.level * 1~3"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    Fixed(Stat),
    Range(RandRange),
    Formula(FValue),
}

impl Amount {
    pub fn fixed(v: f64) -> Self {
        Amount::Fixed(Stat::new(v))
    }

    /// Parse text into the most specific form it matches.
    pub fn parse(s: &str) -> Self {
        if let Ok(range) = s.parse::<RandRange>() {
            return Amount::Range(range);
        }
        if let Ok(v) = s.trim().parse::<f64>() {
            return Amount::fixed(v);
        }
        Amount::Formula(FValue::parse_lossy(s))
    }

    /// Produce a concrete value for one application.
    pub fn roll(&mut self, ctx: &EvalContext, rng: &mut impl Rng) -> f64 {
        match self {
            Amount::Fixed(stat) => stat.value(),
            Amount::Range(range) => range.roll(rng),
            Amount::Formula(fx) => fx.evaluate(ctx, rng),
        }
    }

    /// Freeze the current reading into a constant.
    pub fn instantiate(&mut self, ctx: &EvalContext, rng: &mut impl Rng) {
        let v = self.roll(ctx, rng);
        *self = Amount::fixed(v);
    }

    /// True for the default zero constant; used to skip empty payloads.
    pub fn is_zero(&self) -> bool {
        matches!(self, Amount::Fixed(stat) if stat.value() == 0.0 && stat.base() == 0.0)
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::fixed(0.0)
    }
}

impl RValue for Amount {
    fn value(&self) -> f64 {
        match self {
            Amount::Fixed(stat) => stat.value(),
            Amount::Range(range) => range.midpoint(),
            Amount::Formula(fx) => fx.value(),
        }
    }

    fn base(&self) -> f64 {
        match self {
            Amount::Fixed(stat) => stat.base(),
            Amount::Range(range) => range.min,
            Amount::Formula(fx) => fx.base(),
        }
    }

    fn set_base(&mut self, v: f64) {
        match self {
            Amount::Fixed(stat) => stat.set_base(v),
            Amount::Range(_) => warn!("cannot set a base on a range amount"),
            Amount::Formula(fx) => fx.set_base(v),
        }
    }

    fn apply(&mut self, amt: f64) {
        match self {
            Amount::Fixed(stat) => stat.apply(amt),
            Amount::Range(range) => {
                range.min += amt;
                range.max += amt;
            }
            Amount::Formula(fx) => fx.apply(amt),
        }
    }

    fn add_mod(&mut self, m: AnyMod) {
        match self {
            Amount::Fixed(stat) => {
                stat.add_mod(m);
            }
            Amount::Range(_) => warn!("range amounts do not take modifiers"),
            Amount::Formula(fx) => fx.add_mod(m),
        }
    }

    fn remove_mods(&mut self, id: &str) {
        match self {
            Amount::Fixed(stat) => {
                stat.remove_mods(id);
            }
            Amount::Range(_) => {}
            Amount::Formula(fx) => fx.remove_mods(id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Num(f64),
    Text(String),
}

impl From<AmountRepr> for Amount {
    fn from(repr: AmountRepr) -> Self {
        match repr {
            AmountRepr::Num(v) => Amount::fixed(v),
            AmountRepr::Text(s) => Amount::parse(&s),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        AmountRepr::deserialize(deserializer).map(Amount::from)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Amount::Fixed(stat) => serializer.serialize_f64(stat.base()),
            Amount::Range(range) => range.serialize(serializer),
            Amount::Formula(fx) => fx.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::modifier::Mod;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_picks_most_specific() {
        assert!(matches!(Amount::parse("5"), Amount::Fixed(_)));
        assert!(matches!(Amount::parse("1~5"), Amount::Range(_)));
        assert!(matches!(Amount::parse("1~5 + 2"), Amount::Formula(_)));
        assert!(matches!(Amount::parse("actor.level"), Amount::Formula(_)));
    }

    #[test]
    fn test_roll_fixed_is_constant() {
        let mut a = Amount::fixed(12.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(a.roll(&EvalContext::new(), &mut rng), 12.0);
    }

    #[test]
    fn test_roll_range_in_bounds() {
        let mut a = Amount::parse("3~9");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..50 {
            let v = a.roll(&EvalContext::new(), &mut rng);
            assert!((3.0..=9.0).contains(&v));
        }
    }

    #[test]
    fn test_instantiate_freezes() {
        let mut a = Amount::parse("3~9");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        a.instantiate(&EvalContext::new(), &mut rng);
        let frozen = a.roll(&EvalContext::new(), &mut rng);
        for _ in 0..20 {
            assert_eq!(a.roll(&EvalContext::new(), &mut rng), frozen);
        }
    }

    #[test]
    fn test_mods_scale_fixed_amounts() {
        let mut a = Amount::fixed(10.0);
        a.add_mod(AnyMod::Plain(Mod::percent("empower", 0.5)));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(a.roll(&EvalContext::new(), &mut rng), 15.0);
        a.remove_mods("empower");
        assert_eq!(a.roll(&EvalContext::new(), &mut rng), 10.0);
    }

    #[test]
    fn test_serde_forms() {
        let a: Amount = serde_json::from_str("7.5").unwrap();
        assert!(matches!(a, Amount::Fixed(_)));
        assert_eq!(serde_json::to_string(&a).unwrap(), "7.5");

        let a: Amount = serde_json::from_str("\"2~4\"").unwrap();
        assert!(matches!(a, Amount::Range(_)));
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"2~4\"");

        let a: Amount = serde_json::from_str("\"target.hp / 2\"").unwrap();
        assert!(matches!(a, Amount::Formula(_)));
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"target.hp / 2\"");
    }

    #[test]
    fn test_default_is_zero() {
        assert!(Amount::default().is_zero());
        assert!(!Amount::fixed(3.0).is_zero());
        assert!(!Amount::parse("1~2").is_zero());
    }
}
