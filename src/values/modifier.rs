//! Flat/percent modifiers and the blocks that deliver them.
//!
//! A modifier contributes `count_bonus` flat points and `count_pct` percent
//! points to whatever stat stores it. `count` says how many instances apply
//! right now; threshold, ranged and curved variants recompute it from a
//! driving value, plain mods take it verbatim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

use crate::values::at_mod::AtMod;
use crate::values::curved_mod::CurvedMod;
use crate::values::ranged_mod::RangedMod;
use crate::values::rvalue::RValue;
use crate::values::{is_one, is_zero, one};

/// Error for modifier shorthand that is not `5`, `10%` or `2+10%`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid modifier `{0}`, expected forms like `5`, `10%` or `2+10%`")]
pub struct ParseModError(pub String);

/// A named modifier: flat `base` plus decimal `base_pct`, scaled by `count`.
///
/// Nested mods aggregate into `m_base`/`m_pct` exactly as they do on a stat,
/// so a modifier can itself be modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mod {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub base: f64,
    #[serde(default, rename = "pct", skip_serializing_if = "is_zero")]
    pub base_pct: f64,
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub count: f64,
    #[serde(skip)]
    m_base: f64,
    #[serde(skip)]
    m_pct: f64,
    #[serde(skip)]
    mods: BTreeMap<String, AnyMod>,
}

impl Default for Mod {
    fn default() -> Self {
        Self {
            id: String::new(),
            base: 0.0,
            base_pct: 0.0,
            count: 1.0,
            m_base: 0.0,
            m_pct: 0.0,
            mods: BTreeMap::new(),
        }
    }
}

impl Mod {
    pub fn new(id: impl Into<String>, base: f64, base_pct: f64) -> Self {
        Self {
            id: id.into(),
            base,
            base_pct,
            ..Self::default()
        }
    }

    /// A flat-only modifier.
    pub fn flat(id: impl Into<String>, base: f64) -> Self {
        Self::new(id, base, 0.0)
    }

    /// A percent-only modifier; `pct` is decimal (`0.1` for +10%).
    pub fn percent(id: impl Into<String>, pct: f64) -> Self {
        Self::new(id, 0.0, pct)
    }

    /// Flat contribution of one instance.
    pub fn bonus(&self) -> f64 {
        (self.base + self.m_base) * (1.0 + self.m_pct)
    }

    /// Percent contribution of one instance.
    pub fn pct_tot(&self) -> f64 {
        self.base_pct * (1.0 + self.m_pct)
    }

    pub fn count_bonus(&self) -> f64 {
        self.bonus() * self.count
    }

    pub fn count_pct(&self) -> f64 {
        self.pct_tot() * self.count
    }

    /// True when storing this mod cannot move any value.
    pub fn is_noop(&self) -> bool {
        self.base == 0.0 && self.base_pct == 0.0 && self.mods.is_empty()
    }

    pub fn apply(&mut self, amt: f64) {
        self.base += amt;
    }

    pub fn add_mod(&mut self, m: AnyMod) {
        if m.id().is_empty() {
            warn!("modifier without id folded into `{}`", self.id);
            self.base += m.count_bonus();
            return;
        }
        self.mods.insert(m.id().to_string(), m);
        self.recalc();
    }

    pub fn remove_mods(&mut self, id: &str) {
        if self.mods.remove(id).is_some() {
            self.recalc();
        }
    }

    fn recalc(&mut self) {
        self.m_base = self.mods.values().map(AnyMod::count_bonus).sum();
        self.m_pct = self.mods.values().map(AnyMod::count_pct).sum();
    }

    /// Parse shorthand, falling back to a zero-effect mod on bad syntax.
    pub fn parse_lossy(id: &str, text: &str) -> Self {
        match text.parse::<Mod>() {
            Ok(mut m) => {
                m.id = id.to_string();
                m
            }
            Err(err) => {
                warn!("{}; `{}` has no effect", err, id);
                Self::new(id, 0.0, 0.0)
            }
        }
    }
}

impl RValue for Mod {
    /// A mod read as a value yields its per-instance flat contribution.
    fn value(&self) -> f64 {
        self.bonus()
    }

    fn base(&self) -> f64 {
        self.base
    }

    fn set_base(&mut self, v: f64) {
        self.base = v;
    }

    fn apply(&mut self, amt: f64) {
        Mod::apply(self, amt);
    }

    fn add_mod(&mut self, m: AnyMod) {
        Mod::add_mod(self, m);
    }

    fn remove_mods(&mut self, id: &str) {
        Mod::remove_mods(self, id);
    }
}

impl FromStr for Mod {
    type Err = ParseModError;

    /// Accepts `5` (flat), `10%` (percent) and `2+10%` (both).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(ParseModError(s.to_string()));
        }
        if let Some(stripped) = text.strip_suffix('%') {
            let (flat, pct) = match stripped.rsplit_once('+') {
                Some((flat, pct)) => (flat.trim(), pct.trim()),
                None => ("", stripped.trim()),
            };
            let base = if flat.is_empty() {
                0.0
            } else {
                flat.parse().map_err(|_| ParseModError(s.to_string()))?
            };
            let pct: f64 = pct.parse().map_err(|_| ParseModError(s.to_string()))?;
            return Ok(Mod::new("", base, pct / 100.0));
        }
        let base: f64 = text.parse().map_err(|_| ParseModError(s.to_string()))?;
        Ok(Mod::flat("", base))
    }
}

/// Any modifier variant, stored uniformly in a stat's mod table.
///
/// Untagged on the wire: `at` marks a threshold mod, `half` a curved one,
/// `max` a ranged one, anything else is plain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyMod {
    At(AtMod),
    Curved(CurvedMod),
    Ranged(RangedMod),
    Plain(Mod),
}

impl AnyMod {
    pub fn id(&self) -> &str {
        &self.inner().id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.inner_mut().id = id.into();
    }

    pub fn count(&self) -> f64 {
        self.inner().count
    }

    pub fn count_bonus(&self) -> f64 {
        self.inner().count_bonus()
    }

    pub fn count_pct(&self) -> f64 {
        self.inner().count_pct()
    }

    pub fn is_noop(&self) -> bool {
        self.inner().is_noop()
    }

    /// Re-derive `count` from a driving value, per variant.
    pub fn set_count(&mut self, v: f64) {
        match self {
            AnyMod::Plain(m) => m.count = v,
            AnyMod::At(m) => m.set_count(v),
            AnyMod::Ranged(m) => m.set_count(v),
            AnyMod::Curved(m) => m.set_count(v),
        }
    }

    pub fn inner(&self) -> &Mod {
        match self {
            AnyMod::Plain(m) => m,
            AnyMod::At(m) => &m.inner,
            AnyMod::Ranged(m) => &m.inner,
            AnyMod::Curved(m) => &m.inner,
        }
    }

    pub fn inner_mut(&mut self) -> &mut Mod {
        match self {
            AnyMod::Plain(m) => m,
            AnyMod::At(m) => &mut m.inner,
            AnyMod::Ranged(m) => &mut m.inner,
            AnyMod::Curved(m) => &mut m.inner,
        }
    }
}

/// One entry in a mod block: shorthand or a full descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModSpec {
    Value(f64),
    Text(String),
    Detail(Box<AnyMod>),
}

impl ModSpec {
    /// Build the concrete mod this entry describes, keyed by `source_id`
    /// so every mod from one source can be removed together.
    pub fn build(&self, source_id: &str) -> AnyMod {
        match self {
            ModSpec::Value(v) => AnyMod::Plain(Mod::flat(source_id, *v)),
            ModSpec::Text(s) => AnyMod::Plain(Mod::parse_lossy(source_id, s)),
            ModSpec::Detail(m) => {
                let mut m = (**m).clone();
                m.set_id(source_id);
                m
            }
        }
    }
}

/// Modifiers keyed by the stat path they land on, e.g.
/// `{ "hp.max": "10%", "tohit": 5 }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModBlock(pub BTreeMap<String, ModSpec>);

impl ModBlock {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModSpec)> {
        self.0.iter()
    }
}
