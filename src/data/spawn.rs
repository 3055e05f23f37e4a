//! Where freshly spawned combatants and their drops come from.

use crate::chars::Npc;
use crate::data::GameData;

/// Materializes npcs for the battle core. The core only ever asks; the
/// host decides what exists and what it drops.
pub trait NpcSource {
    /// Build a live npc from a template id. None for unknown ids.
    fn create_npc(&self, id: &str, uid: u32) -> Option<Npc>;
    /// Resolve the drop table for a freshly slain npc.
    fn get_loot(&self, npc: &Npc) -> Option<String>;
}

/// Table-backed source reading straight from the content registries.
pub struct TemplateSpawner<'a> {
    data: &'a GameData,
}

impl<'a> TemplateSpawner<'a> {
    pub fn new(data: &'a GameData) -> Self {
        TemplateSpawner { data }
    }
}

impl NpcSource for TemplateSpawner<'_> {
    fn create_npc(&self, id: &str, uid: u32) -> Option<Npc> {
        self.data.npc(id).map(|template| Npc::instance(template, uid))
    }

    fn get_loot(&self, npc: &Npc) -> Option<String> {
        npc.loot.clone()
    }
}
