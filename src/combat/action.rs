//! Pending actions and turn ordering

use std::cmp::Reverse;
use std::sync::Arc;

use crate::ability::Ability;
use crate::core::types::CombatantId;

/// A committed intent to use an ability this turn
///
/// Built during selection or AI planning, consumed during execution.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub ability: Arc<Ability>,
    pub caster: CombatantId,
    pub primary_target: Option<CombatantId>,
}

impl PendingAction {
    pub fn new(ability: Arc<Ability>, caster: CombatantId, primary_target: Option<CombatantId>) -> Self {
        Self {
            ability,
            caster,
            primary_target,
        }
    }

    /// Speed used for ordering, including the player's bonus
    pub fn effective_speed(&self, player: Option<CombatantId>, player_speed_bonus: i32) -> i32 {
        if Some(self.caster) == player {
            self.ability.action_speed.saturating_add(player_speed_bonus)
        } else {
            self.ability.action_speed
        }
    }
}

/// Order a turn's actions: fastest first, submission order among equals
///
/// The speed bonus applies only to actions cast by `player`.
pub fn sort_for_execution(
    actions: &[PendingAction],
    player: Option<CombatantId>,
    player_speed_bonus: i32,
) -> Vec<PendingAction> {
    let mut ordered = actions.to_vec();
    // sort_by_key is stable, which gives the submission-order tie-break
    ordered.sort_by_key(|a| Reverse(a.effective_speed(player, player_speed_bonus)));
    ordered
}
