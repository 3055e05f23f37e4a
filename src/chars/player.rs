//! The player-side combatant: a character plus a spell rotation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chars::attack::{Attack, AttackList};
use crate::chars::character::{ActionSource, Char, Pending, Team};
use crate::chars::states::StateFlags;
use crate::combat::events::{CombatEvent, EventSink};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Player {
    #[serde(flatten)]
    pub ch: Char,
    /// Spells tried in order each action window; first affordable one casts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spells: Vec<Attack>,
}

impl Player {
    pub fn new(mut ch: Char) -> Self {
        ch.team = Team::Player;
        Player {
            ch,
            spells: Vec::new(),
        }
    }

    /// Take a turn when the attack timer allows: cast the first spell the
    /// pools can pay for, falling back to the basic attack. Costs are paid
    /// at selection time, before any hit roll.
    pub fn combat(
        &mut self,
        dt: f64,
        rng: &mut impl Rng,
        events: &mut dyn EventSink,
        pending: &mut Vec<Pending>,
    ) {
        if !self.ch.ready(dt) {
            return;
        }
        if !self.spells.is_empty() {
            if self.ch.states.has(StateFlags::NO_SPELLS) {
                let cause = self
                    .ch
                    .spell_block_cause()
                    .unwrap_or("unknown")
                    .to_string();
                events.emit(CombatEvent::StateBlock {
                    uid: self.ch.uid,
                    name: self.ch.display_name().to_string(),
                    action: "spell".to_string(),
                    cause,
                });
            } else if let Some(spell) = self.pick_spell() {
                if let Some(cost) = &spell.cost {
                    self.ch.context.pay_cost(cost);
                }
                pending.push(Pending::Attacks {
                    attacker: self.ch.uid,
                    attacks: AttackList::from(spell).expanded_hits(),
                    source: ActionSource::Turn,
                });
                return;
            }
        }
        self.ch.swing(rng, events, pending);
    }

    fn pick_spell(&self) -> Option<Attack> {
        self.spells
            .iter()
            .find(|s| match &s.cost {
                Some(cost) => self.ch.context.can_pay(cost),
                None => true,
            })
            .cloned()
    }
}
