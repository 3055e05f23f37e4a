//! Stats: base values with modifier aggregation.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::warn;

use crate::values::finite_or_zero;
use crate::values::modifier::{AnyMod, ModBlock};
use crate::values::rvalue::RValue;

/// A numeric stat: a mutable base plus named modifier contributions.
///
/// `value = max((base + m_base) * (1 + m_pct), min)` where `m_base` sums the
/// flat contribution of every stored mod and `m_pct` the percent
/// contributions. Serializes as a bare number when nothing but the base is
/// set; modifiers are never saved, they are re-applied by whatever granted
/// them when state is revived.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "StatRepr")]
pub struct Stat {
    base: f64,
    min: Option<f64>,
    /// Mods this stat pushes onto others whenever its own value changes.
    emit: Option<ModBlock>,
    mods: BTreeMap<String, AnyMod>,
    m_base: f64,
    m_pct: f64,
    last: f64,
}

impl Stat {
    pub fn new(base: f64) -> Self {
        let mut stat = Self {
            base,
            ..Self::default()
        };
        stat.last = stat.value();
        stat
    }

    /// A stat whose final value never drops below `min`.
    pub fn with_min(base: f64, min: f64) -> Self {
        let mut stat = Self::new(base);
        stat.min = Some(min);
        stat.last = stat.value();
        stat
    }

    pub fn value(&self) -> f64 {
        let raw = (self.base + self.m_base) * (1.0 + self.m_pct);
        let v = match self.min {
            Some(min) => raw.max(min),
            None => raw,
        };
        finite_or_zero(v)
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    pub fn set_base(&mut self, v: f64) {
        self.base = v;
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn has_mod(&self, id: &str) -> bool {
        self.mods.contains_key(id)
    }

    /// Store `m` under its id, overwriting any previous entry, and recompute.
    /// A mod without an id cannot be stored; it folds into the base once.
    /// Returns true when the public value moved.
    pub fn add_mod(&mut self, m: AnyMod) -> bool {
        if m.id().is_empty() {
            warn!("modifier without id folded into stat base; give it an id");
            self.base += m.count_bonus();
            return self.recalc();
        }
        self.mods.insert(m.id().to_string(), m);
        self.recalc()
    }

    /// Drop the mod stored under `id`. Unknown ids are a no-op.
    pub fn remove_mods(&mut self, id: &str) -> bool {
        if self.mods.remove(id).is_some() {
            self.recalc()
        } else {
            false
        }
    }

    /// Re-derive the count of a stored mod from a driving value.
    pub fn set_mod_count(&mut self, id: &str, v: f64) -> bool {
        if let Some(m) = self.mods.get_mut(id) {
            m.set_count(v);
            self.recalc()
        } else {
            false
        }
    }

    /// Recompute aggregates and report whether the public value moved.
    pub fn recalc(&mut self) -> bool {
        self.m_base = self.mods.values().map(AnyMod::count_bonus).sum();
        self.m_pct = self.mods.values().map(AnyMod::count_pct).sum();
        let v = self.value();
        let changed = v != self.last;
        self.last = v;
        changed
    }

    pub fn apply(&mut self, amt: f64) {
        self.base += amt;
    }

    /// The mod block this stat emits when its value changes, if any.
    pub fn emit_block(&self) -> Option<&ModBlock> {
        self.emit.as_ref()
    }

    pub fn set_emit_block(&mut self, block: ModBlock) {
        self.emit = Some(block);
    }
}

impl RValue for Stat {
    fn value(&self) -> f64 {
        Stat::value(self)
    }

    fn base(&self) -> f64 {
        Stat::base(self)
    }

    fn set_base(&mut self, v: f64) {
        Stat::set_base(self, v);
    }

    fn apply(&mut self, amt: f64) {
        Stat::apply(self, amt);
    }

    fn add_mod(&mut self, m: AnyMod) {
        Stat::add_mod(self, m);
    }

    fn remove_mods(&mut self, id: &str) {
        Stat::remove_mods(self, id);
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatRepr {
    Simple(f64),
    Full {
        #[serde(default)]
        base: f64,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default, rename = "mod")]
        emit: Option<ModBlock>,
    },
}

impl From<StatRepr> for Stat {
    fn from(repr: StatRepr) -> Self {
        match repr {
            StatRepr::Simple(base) => Stat::new(base),
            StatRepr::Full { base, min, emit } => {
                let mut stat = Stat::new(base);
                stat.min = min;
                stat.emit = emit;
                stat.last = stat.value();
                stat
            }
        }
    }
}

impl Serialize for Stat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.min.is_none() && self.emit.is_none() {
            serializer.serialize_f64(self.base)
        } else {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("base", &self.base)?;
            if let Some(min) = self.min {
                map.serialize_entry("min", &min)?;
            }
            if let Some(emit) = &self.emit {
                map.serialize_entry("mod", emit)?;
            }
            map.end()
        }
    }
}

/// A depletable pool: a current value bounded by a modifiable max.
///
/// Damage and healing clamp to `[0, max]`; modifiers land on the max, never
/// the current value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "PointRepr")]
pub struct PointStat {
    value: f64,
    max: Stat,
}

impl PointStat {
    /// A full pool of the given size.
    pub fn new(max: f64) -> Self {
        Self {
            value: max,
            max: Stat::new(max),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn max(&self) -> &Stat {
        &self.max
    }

    pub fn max_mut(&mut self) -> &mut Stat {
        &mut self.max
    }

    pub fn max_value(&self) -> f64 {
        self.max.value()
    }

    pub fn set(&mut self, v: f64) {
        self.value = v.clamp(0.0, self.max_value());
    }

    /// Remove up to `amt` points; returns the part that did not fit.
    pub fn damage(&mut self, amt: f64) -> f64 {
        let amt = amt.max(0.0);
        let applied = amt.min(self.value);
        self.value -= applied;
        amt - applied
    }

    pub fn heal(&mut self, amt: f64) {
        self.set(self.value + amt.max(0.0));
    }

    pub fn refill(&mut self) {
        self.value = self.max_value();
    }

    /// Pull the current value back under a max that shrank.
    pub fn clamp_to_max(&mut self) {
        if self.value > self.max_value() {
            self.value = self.max_value();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value <= 0.0
    }

    pub fn fraction(&self) -> f64 {
        let max = self.max_value();
        if max > 0.0 {
            self.value / max
        } else {
            0.0
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointRepr {
    Simple(f64),
    Full {
        value: Option<f64>,
        #[serde(default)]
        max: Stat,
    },
}

impl From<PointRepr> for PointStat {
    fn from(repr: PointRepr) -> Self {
        match repr {
            PointRepr::Simple(max) => PointStat::new(max),
            PointRepr::Full { value, max } => PointStat {
                value: value.unwrap_or_else(|| max.value()),
                max,
            },
        }
    }
}

impl Serialize for PointStat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let plain_full = self.max.min.is_none()
            && self.max.emit.is_none()
            && self.value == self.max.base();
        if plain_full {
            serializer.serialize_f64(self.max.base())
        } else {
            let mut map = serializer.serialize_map(None)?;
            map.serialize_entry("value", &self.value)?;
            map.serialize_entry("max", &self.max)?;
            map.end()
        }
    }
}
