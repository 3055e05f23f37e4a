//! Enemy combatant: a character plus loot linkage.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chars::character::{Char, Pending, Team};
use crate::combat::events::EventSink;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Npc {
    #[serde(flatten)]
    pub ch: Char,
    /// Drop table id handed to the spawner when this npc dies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loot: Option<String>,
}

impl Npc {
    /// Stamp a registry prototype into a live combatant.
    pub fn instance(template: &Npc, uid: u32) -> Npc {
        let mut npc = template.clone();
        npc.ch.uid = uid;
        npc.ch.team = Team::Npc;
        npc.ch.hp.refill();
        npc.ch.revive();
        npc
    }

    /// Take a turn when the attack timer allows.
    pub fn combat(
        &mut self,
        dt: f64,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) {
        if self.ch.ready(dt) {
            self.ch.swing(rng, events, pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chars::attack::{Attack, AttackList};
    use crate::chars::states::StateFlags;
    use crate::combat::events::{CombatEvent, EventLog};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rat() -> Npc {
        let mut ch = Char::new("rat", "Giant Rat", 30.0);
        let mut bite = Attack::new("bite");
        bite.repeathits = 2;
        ch.attack = AttackList(vec![bite, Attack::new("scratch")]);
        Npc {
            ch,
            loot: Some("vermin".to_string()),
        }
    }

    #[test]
    fn test_instance_assigns_uid_and_refills() {
        let mut template = rat();
        template.ch.hp.damage(25.0);
        let live = Npc::instance(&template, 9);
        assert_eq!(live.ch.uid, 9);
        assert_eq!(live.ch.hp.value(), 30.0);
        assert_eq!(live.loot.as_deref(), Some("vermin"));
    }

    #[test]
    fn test_combat_waits_for_timer() {
        let mut npc = rat();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut log = EventLog::new();
        let mut pending = Vec::new();
        npc.combat(0.12, &mut rng, &mut log, &mut pending);
        assert!(pending.is_empty());
        for _ in 0..8 {
            npc.combat(0.12, &mut rng, &mut log, &mut pending);
        }
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_swing_pick_is_seed_stable() {
        let pick = |seed: u64| {
            let mut npc = rat();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut log = EventLog::new();
            let mut pending = Vec::new();
            npc.combat(1.0, &mut rng, &mut log, &mut pending);
            match pending.pop() {
                Some(Pending::Attacks { attacks, .. }) => attacks[0].id.clone(),
                other => panic!("expected a queued attack, got {other:?}"),
            }
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn test_blocked_attack_reports_cause() {
        let mut npc = rat();
        npc.ch.states.add("web", StateFlags::NO_ATTACK);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut log = EventLog::new();
        let mut pending = Vec::new();
        npc.combat(1.0, &mut rng, &mut log, &mut pending);
        assert!(pending.is_empty());
        assert!(log
            .iter()
            .any(|e| matches!(e, CombatEvent::StateBlock { cause, .. } if cause == "web")));
    }

    #[test]
    fn test_repeathits_expand_in_queue() {
        let mut npc = rat();
        npc.ch.attack = AttackList(vec![npc.ch.attack.0[0].clone()]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut log = EventLog::new();
        let mut pending = Vec::new();
        npc.combat(1.0, &mut rng, &mut log, &mut pending);
        match pending.as_slice() {
            [Pending::Attacks { attacks, .. }] => assert_eq!(attacks.len(), 2),
            other => panic!("expected one queued action, got {other:?}"),
        }
    }
}
