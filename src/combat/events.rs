//! Battle events and the sink they flow through.
//!
//! The core never talks to a global bus; whoever drives the battle hands in
//! an [`EventSink`] and decides what to do with the stream (log it, render
//! it, or drop it).

/// Everything noteworthy a battle can report, one variant per occurrence.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    /// A fresh encounter began with these enemies on the field.
    EncStart { enemies: Vec<String> },
    CharDied {
        uid: u32,
        name: String,
    },
    /// An enemy died; `loot` names the drop table the spawner resolved.
    EnemySlain {
        uid: u32,
        name: String,
        loot: Option<String>,
    },
    CombatWon,
    DamageMiss {
        attacker: String,
        target: String,
        attack: String,
    },
    IsImmune {
        uid: u32,
        name: String,
        kind: String,
    },
    Resisted {
        uid: u32,
        name: String,
        kind: String,
    },
    /// An action was refused by a status flag; `cause` names the dot to blame.
    StateBlock {
        uid: u32,
        name: String,
        action: String,
        cause: String,
    },
    /// A status flag switched on or off.
    CharState {
        uid: u32,
        name: String,
        state: String,
        cause: String,
        active: bool,
    },
    /// A combatant's own swing landed on a target.
    CharAction {
        uid: u32,
        name: String,
        attack: String,
        target: String,
        damage: f64,
        healing: f64,
    },
    /// A dot delivered its periodic damage or healing.
    DotAction {
        uid: u32,
        name: String,
        dot: String,
        damage: f64,
        healing: f64,
    },
    /// An on-hit/on-miss/on-expire/on-death chain (or a dot's attack
    /// payload) resolved against a target.
    TriggerAction {
        uid: u32,
        name: String,
        trigger: String,
        attack: String,
        target: String,
        damage: f64,
        healing: f64,
    },
    ItemAction {
        uid: u32,
        name: String,
        item: String,
    },
    /// A spawn was refused because the field is already packed.
    Overcrowded { id: String },
}

/// Observer interface the battle reports through. Emission is synchronous
/// and fire-and-forget.
pub trait EventSink {
    fn emit(&mut self, event: CombatEvent);
}

/// Sink that keeps everything, mostly for tests and the simulator.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<CombatEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CombatEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear()
    }

    /// Hand the collected events over, leaving the log empty.
    pub fn take(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: CombatEvent) {
        self.events.push(event);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: CombatEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_collects_in_order() {
        let mut log = EventLog::new();
        log.emit(CombatEvent::CombatWon);
        log.emit(CombatEvent::CharDied {
            uid: 3,
            name: "rat".to_string(),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.iter().next(), Some(&CombatEvent::CombatWon));
        let drained = log.take();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_null_sink_swallows() {
        let mut sink = NullSink;
        sink.emit(CombatEvent::CombatWon);
    }
}
