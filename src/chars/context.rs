//! Per-combatant economy view: resource pools and overlay stats.
//!
//! The player's context is the game-facing one; every npc owns an isolated
//! instance so monster auras and cost changes never leak into player data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chars::attack::Cost;
use crate::values::{PointStat, Stat};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Spendable pools (mana and friends), keyed by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pools: BTreeMap<String, PointStat>,
    /// Addressable stats that are not fixed character slots: thorns,
    /// reflect, and anything content invents. Created on first touch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    stats: BTreeMap<String, Stat>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty() && self.stats.is_empty()
    }

    pub fn pool(&self, name: &str) -> Option<&PointStat> {
        self.pools.get(name)
    }

    pub fn pool_mut(&mut self, name: &str) -> Option<&mut PointStat> {
        self.pools.get_mut(name)
    }

    /// Fetch or create a pool, empty until someone raises its max.
    pub fn ensure_pool(&mut self, name: &str) -> &mut PointStat {
        self.pools
            .entry(name.to_string())
            .or_insert_with(|| PointStat::new(0.0))
    }

    pub fn add_pool(&mut self, name: impl Into<String>, max: f64) {
        self.pools.insert(name.into(), PointStat::new(max));
    }

    pub fn stat(&self, name: &str) -> Option<&Stat> {
        self.stats.get(name)
    }

    pub fn stat_value(&self, name: &str) -> f64 {
        self.stats.get(name).map(Stat::value).unwrap_or(0.0)
    }

    /// Fetch or create an overlay stat with base zero.
    pub fn ensure_stat(&mut self, name: &str) -> &mut Stat {
        self.stats
            .entry(name.to_string())
            .or_insert_with(|| Stat::new(0.0))
    }

    /// True when every pool named by `cost` holds enough.
    pub fn can_pay(&self, cost: &Cost) -> bool {
        cost.iter().all(|(name, amount)| {
            self.pools
                .get(name)
                .map(|pool| pool.value() >= *amount)
                .unwrap_or(false)
        })
    }

    /// Deduct `cost` from the pools; refuses (and changes nothing) when any
    /// pool falls short.
    pub fn pay_cost(&mut self, cost: &Cost) -> bool {
        if !self.can_pay(cost) {
            return false;
        }
        for (name, amount) in cost {
            if let Some(pool) = self.pools.get_mut(name) {
                pool.damage(*amount);
            }
        }
        true
    }

    pub fn stats(&self) -> impl Iterator<Item = (&String, &Stat)> {
        self.stats.iter()
    }
}
