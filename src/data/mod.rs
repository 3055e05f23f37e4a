//! Content registries: the templates every battle resolves ids against.

#![allow(unused_imports)]

pub mod spawn;

pub use spawn::{NpcSource, TemplateSpawner};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::chars::{Attack, Dot, Npc};

#[derive(Debug, Error)]
pub enum DataError {
    #[error("malformed game data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Id-keyed template tables, loaded once from content JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameData {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    dots: BTreeMap<String, Dot>,
    /// State overlays folded into any applied dot with a matching id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    states: BTreeMap<String, Dot>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attacks: BTreeMap<String, Attack>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    npcs: BTreeMap<String, Npc>,
}

impl GameData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse content JSON and normalize it: map keys become ids on entries
    /// that did not spell one out, and multi-hit attacks push their shared
    /// fields down into each hit.
    pub fn from_json(text: &str) -> Result<GameData, DataError> {
        let mut data: GameData = serde_json::from_str(text)?;
        data.link();
        Ok(data)
    }

    fn link(&mut self) {
        for (key, dot) in &mut self.dots {
            if dot.id.is_empty() {
                dot.id = key.clone();
            }
        }
        for (key, dot) in &mut self.states {
            if dot.id.is_empty() {
                dot.id = key.clone();
            }
        }
        for (key, attack) in &mut self.attacks {
            if attack.id.is_empty() {
                attack.id = key.clone();
            }
            attack.propagate_to_hits();
        }
        for (key, npc) in &mut self.npcs {
            if npc.ch.id.is_empty() {
                npc.ch.id = key.clone();
            }
            for attack in npc.ch.attack.iter_mut() {
                attack.propagate_to_hits();
            }
        }
    }

    pub fn dot(&self, id: &str) -> Option<&Dot> {
        self.dots.get(id)
    }

    pub fn state_overlay(&self, id: &str) -> Option<&Dot> {
        self.states.get(id)
    }

    pub fn attack(&self, id: &str) -> Option<&Attack> {
        self.attacks.get(id)
    }

    pub fn npc(&self, id: &str) -> Option<&Npc> {
        self.npcs.get(id)
    }

    pub fn add_dot(&mut self, dot: Dot) {
        self.dots.insert(dot.id.clone(), dot);
    }

    pub fn add_state_overlay(&mut self, dot: Dot) {
        self.states.insert(dot.id.clone(), dot);
    }

    pub fn add_attack(&mut self, mut attack: Attack) {
        attack.propagate_to_hits();
        self.attacks.insert(attack.id.clone(), attack);
    }

    pub fn add_npc(&mut self, id: impl Into<String>, npc: Npc) {
        self.npcs.insert(id.into(), npc);
    }

    pub fn npc_ids(&self) -> impl Iterator<Item = &String> {
        self.npcs.keys()
    }
}
