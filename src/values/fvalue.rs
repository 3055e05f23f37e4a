//! Formula-backed values with modifier support.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::warn;

use crate::values::expr::{parse_expr, EvalContext, Expr, ExprError};
use crate::values::modifier::AnyMod;
use crate::values::rvalue::RValue;

/// A value computed from a content formula.
///
/// Keeps the source text for serialization, the parsed tree for evaluation,
/// and the same flat/percent modifier accumulation as a stat. The totals are
/// visible inside the formula as `mod.flat` and `mod.pct`, so content decides
/// how its own scaling applies (`"(4 + mod.flat) * (1 + mod.pct)"`).
///
/// Parameter bindings are recorded as id strings, never live references; the
/// owner rebuilds the numeric context from those ids at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub struct FValue {
    src: String,
    expr: Expr,
    mods: BTreeMap<String, AnyMod>,
    m_base: f64,
    m_pct: f64,
    last: f64,
    params: BTreeMap<String, String>,
}

impl FValue {
    fn from_parts(src: String, expr: Expr) -> Self {
        Self {
            src,
            expr,
            mods: BTreeMap::new(),
            m_base: 0.0,
            m_pct: 0.0,
            last: 0.0,
            params: BTreeMap::new(),
        }
    }

    /// Parse a formula, degrading to a constant zero on bad syntax.
    pub fn parse_lossy(src: &str) -> Self {
        match parse_expr(src) {
            Ok(expr) => Self::from_parts(src.to_string(), expr),
            Err(err) => {
                warn!("unparseable formula `{}`: {}", src, err);
                Self::from_parts(src.to_string(), Expr::Num(0.0))
            }
        }
    }

    /// The original formula text.
    pub fn source(&self) -> &str {
        &self.src
    }

    /// Evaluate with the accumulated modifiers exposed to the formula.
    pub fn evaluate(&mut self, ctx: &EvalContext, rng: &mut impl Rng) -> f64 {
        let scoped = ctx
            .clone()
            .with("mod.flat", self.m_base)
            .with("mod.pct", self.m_pct);
        let v = self.expr.eval(&scoped, rng);
        self.last = v;
        v
    }

    /// Record which entity id a named parameter bag should bind to.
    pub fn record_param(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.params.insert(name.into(), id.into());
    }

    pub fn recorded_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn flat_total(&self) -> f64 {
        self.m_base
    }

    pub fn pct_total(&self) -> f64 {
        self.m_pct
    }

    fn recalc(&mut self) {
        self.m_base = self.mods.values().map(AnyMod::count_bonus).sum();
        self.m_pct = self.mods.values().map(AnyMod::count_pct).sum();
    }
}

impl RValue for FValue {
    /// Most recent evaluation result; zero before the first evaluation.
    fn value(&self) -> f64 {
        self.last
    }

    fn base(&self) -> f64 {
        0.0
    }

    fn set_base(&mut self, _v: f64) {
        warn!("formula value `{}` has no base to set", self.src);
    }

    fn apply(&mut self, amt: f64) {
        self.m_base += amt;
    }

    fn add_mod(&mut self, m: AnyMod) {
        if m.id().is_empty() {
            warn!("modifier without id folded into formula `{}`", self.src);
            self.m_base += m.count_bonus();
            return;
        }
        self.mods.insert(m.id().to_string(), m);
        self.recalc();
    }

    fn remove_mods(&mut self, id: &str) {
        if self.mods.remove(id).is_some() {
            self.recalc();
        }
    }
}

impl FromStr for FValue {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expr = parse_expr(s)?;
        Ok(Self::from_parts(s.to_string(), expr))
    }
}

impl Serialize for FValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.src)
    }
}

impl<'de> Deserialize<'de> for FValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(FValue::parse_lossy(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::modifier::Mod;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_evaluate_with_context() {
        let mut fx: FValue = "actor.level * 2 + 1".parse().unwrap();
        let ctx = EvalContext::new().with("actor.level", 4.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(fx.evaluate(&ctx, &mut rng), 9.0);
        assert_eq!(fx.value(), 9.0);
    }

    #[test]
    fn test_mods_visible_inside_formula() {
        let mut fx: FValue = "(10 + mod.flat) * (1 + mod.pct)".parse().unwrap();
        fx.add_mod(AnyMod::Plain(Mod::flat("buff", 5.0)));
        fx.add_mod(AnyMod::Plain(Mod::percent("aura", 0.5)));
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(fx.evaluate(&EvalContext::new(), &mut rng), 22.5);
    }

    #[test]
    fn test_remove_mods_restores_value() {
        let mut fx: FValue = "10 + mod.flat".parse().unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(fx.evaluate(&EvalContext::new(), &mut rng), 10.0);
        fx.add_mod(AnyMod::Plain(Mod::flat("buff", 3.0)));
        assert_eq!(fx.evaluate(&EvalContext::new(), &mut rng), 13.0);
        fx.remove_mods("buff");
        assert_eq!(fx.evaluate(&EvalContext::new(), &mut rng), 10.0);
    }

    #[test]
    fn test_bad_syntax_degrades_to_zero() {
        let mut fx = FValue::parse_lossy("2 +* garbage");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(fx.evaluate(&EvalContext::new(), &mut rng), 0.0);
        assert_eq!(fx.source(), "2 +* garbage");
    }

    #[test]
    fn test_recorded_params_are_ids() {
        let mut fx = FValue::parse_lossy("target.hp / 2");
        fx.record_param("target", "npc.rat.3");
        let params: Vec<(&str, &str)> = fx.recorded_params().collect();
        assert_eq!(params, vec![("target", "npc.rat.3")]);
    }

    #[test]
    fn test_serde_round_trips_source() {
        let fx: FValue = "1~4 + actor.level".parse().unwrap();
        let json = serde_json::to_string(&fx).unwrap();
        assert_eq!(json, "\"1~4 + actor.level\"");
        let back: FValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source(), fx.source());
    }
}
