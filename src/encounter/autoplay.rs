//! Headless player driver
//!
//! Watches turn snapshots and answers each one with a command. Used by the
//! encounter runner and by tests that need a full encounter without input.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::ability::{Ability, TargetingStyle};
use crate::combat::events::{CombatEvent, TurnSnapshot};
use crate::combat::orchestrator::CancelHandle;
use crate::combat::upgrades::UpgradeContext;
use crate::encounter::manager::PlayerCommand;

/// Health fraction below which self-targeted abilities are preferred
const LOW_HEALTH: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct AutoPlayer {
    loadout: Vec<Arc<Ability>>,
    upgrades: UpgradeContext,
    min_ap_cost: i32,
}

impl AutoPlayer {
    pub fn new(loadout: Vec<Arc<Ability>>, upgrades: UpgradeContext, min_ap_cost: i32) -> Self {
        Self {
            loadout,
            upgrades,
            min_ap_cost,
        }
    }

    fn cost(&self, ability: &Ability) -> i32 {
        self.upgrades.effective_ap_cost(ability.ap_cost, self.min_ap_cost)
    }

    /// Command for the turn shown in `snapshot`
    ///
    /// Heals or recovers when low, otherwise throws the most expensive
    /// affordable attack at the weakest living enemy. Passes when nothing fits.
    pub fn decide(&self, snapshot: &TurnSnapshot) -> PlayerCommand {
        let Some(me) = snapshot.player() else {
            return PlayerCommand::Pass;
        };
        let ap = me.action_points.map(|m| m.current).unwrap_or(0);
        let low = me
            .health
            .map(|h| h.max > 0 && (h.current as f32 / h.max as f32) < LOW_HEALTH)
            .unwrap_or(false);

        let affordable: Vec<&Arc<Ability>> = self
            .loadout
            .iter()
            .filter(|a| self.cost(a) <= ap)
            .collect();
        let support = affordable
            .iter()
            .copied()
            .find(|a| a.targeting == TargetingStyle::Caster);
        let attack = affordable
            .iter()
            .copied()
            .filter(|a| a.targeting != TargetingStyle::Caster)
            .max_by_key(|a| self.cost(a));

        let choice = match (low, support, attack) {
            (true, Some(support), _) => support,
            (_, _, Some(attack)) => attack,
            (_, Some(support), None) => support,
            _ => return PlayerCommand::Pass,
        };

        let target = if choice.requires_target() {
            let weakest = snapshot
                .living_enemies()
                .min_by_key(|e| e.health.map(|h| h.current).unwrap_or(i32::MAX));
            match weakest {
                Some(enemy) => Some(enemy.identity.id),
                None => return PlayerCommand::Pass,
            }
        } else {
            None
        };

        PlayerCommand::UseAbility {
            ability: choice.name.clone(),
            target,
        }
    }

    /// Answer every opened turn until combat ends
    ///
    /// Trips `stop` if combat runs past `max_turns`.
    pub async fn drive(
        self,
        mut events: broadcast::Receiver<CombatEvent>,
        commands: mpsc::Sender<PlayerCommand>,
        max_turns: u32,
        stop: CancelHandle,
    ) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auto-player lagged behind events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return,
            };

            match event {
                CombatEvent::TurnOpened(snapshot) => {
                    if snapshot.turn > max_turns {
                        tracing::warn!(max_turns, "turn limit reached, stopping");
                        stop.cancel();
                        return;
                    }
                    let command = self.decide(&snapshot);
                    tracing::debug!(turn = snapshot.turn, ?command, "auto-player");
                    if commands.send(command).await.is_err() {
                        return;
                    }
                }
                CombatEvent::SubmissionRejected(reason) => {
                    // Keep the encounter moving
                    tracing::debug!(%reason, "auto-player submission rejected, passing");
                    if commands.send(PlayerCommand::Pass).await.is_err() {
                        return;
                    }
                }
                CombatEvent::CombatEnded(_) => return,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::{Damage, Heal};
    use crate::combat::events::{CombatantSnapshot, Meter};
    use crate::combatant::CombatantIdentity;
    use crate::core::types::{CombatantId, Side};

    fn loadout() -> Vec<Arc<Ability>> {
        vec![
            Arc::new(Ability::new("Slash", 20, TargetingStyle::SingleEnemy, 150, Damage::flat(40))),
            Arc::new(Ability::new("Cleave", 35, TargetingStyle::AllEnemies, 80, Damage::flat(15))),
            Arc::new(Ability::new("Second Wind", 15, TargetingStyle::Caster, 200, Heal { amount: 25 })),
        ]
    }

    fn combatant(name: &str, side: Side, health: i32, max: i32, ap: Option<i32>) -> CombatantSnapshot {
        CombatantSnapshot {
            identity: CombatantIdentity::new(name, side),
            health: Some(Meter { current: health, max }),
            action_points: ap.map(|current| Meter { current, max: 100 }),
        }
    }

    fn snapshot(hero_hp: i32, hero_ap: i32) -> (TurnSnapshot, CombatantId) {
        let weak = combatant("Runt", Side::Enemy, 8, 30, None);
        let weak_id = weak.identity.id;
        let snapshot = TurnSnapshot {
            turn: 1,
            combatants: vec![
                combatant("Hero", Side::Player, hero_hp, 100, Some(hero_ap)),
                combatant("Brute", Side::Enemy, 40, 40, None),
                weak,
                combatant("Corpse", Side::Enemy, 0, 30, None),
            ],
        };
        (snapshot, weak_id)
    }

    fn player() -> AutoPlayer {
        AutoPlayer::new(loadout(), UpgradeContext::default(), 1)
    }

    #[test]
    fn test_heaviest_attack_when_healthy() {
        let (snap, _) = snapshot(90, 100);
        assert_eq!(
            player().decide(&snap),
            PlayerCommand::UseAbility {
                ability: "Cleave".into(),
                target: None
            }
        );
    }

    #[test]
    fn test_single_target_goes_to_weakest_living() {
        let (snap, weak) = snapshot(90, 25);
        assert_eq!(
            player().decide(&snap),
            PlayerCommand::UseAbility {
                ability: "Slash".into(),
                target: Some(weak)
            }
        );
    }

    #[test]
    fn test_heals_when_low() {
        let (snap, _) = snapshot(20, 100);
        assert_eq!(
            player().decide(&snap),
            PlayerCommand::UseAbility {
                ability: "Second Wind".into(),
                target: None
            }
        );
    }

    #[test]
    fn test_passes_when_broke() {
        let (snap, _) = snapshot(90, 10);
        assert_eq!(player().decide(&snap), PlayerCommand::Pass);
    }

    #[test]
    fn test_cost_reduction_counts() {
        let upgrades = UpgradeContext {
            global_ap_cost_reduction: 10,
            ..UpgradeContext::default()
        };
        let (snap, weak) = snapshot(90, 10);
        assert_eq!(
            AutoPlayer::new(loadout(), upgrades, 1).decide(&snap),
            PlayerCommand::UseAbility {
                ability: "Slash".into(),
                target: Some(weak)
            }
        );
    }
}
