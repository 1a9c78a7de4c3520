//! Target resolution
//!
//! Turns an action's targeting style into a concrete list of combatants.
//! Sides come from `CombatState` classification; only active combatants are
//! ever returned for the multi-target styles.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ability::TargetingStyle;
use crate::combat::action::PendingAction;
use crate::combat::state::CombatState;
use crate::core::types::CombatantId;

/// Opponents picked by `RandomEnemies` for a pool of `candidates`
pub fn random_target_count(candidates: usize, percentage: f32) -> usize {
    if candidates == 0 {
        return 0;
    }
    let wanted = (candidates as f32 * percentage.clamp(0.0, 1.0)).ceil() as usize;
    wanted.clamp(1, candidates)
}

/// Combatants affected by `action` against the current roster
///
/// `SingleEnemy` passes the primary target through untouched; substituting a
/// dead target is the executor's job. An empty result is valid.
pub fn resolve_targets<R: Rng + ?Sized>(
    action: &PendingAction,
    state: &CombatState,
    rng: &mut R,
) -> Vec<CombatantId> {
    let caster_side = state.side(action.caster);

    match action.ability.targeting {
        TargetingStyle::SingleEnemy => action.primary_target.into_iter().collect(),
        TargetingStyle::AllEnemies => caster_side
            .map(|side| state.active_opponents_of(side))
            .unwrap_or_default(),
        TargetingStyle::RandomEnemies => {
            let candidates = caster_side
                .map(|side| state.active_opponents_of(side))
                .unwrap_or_default();
            let count = random_target_count(candidates.len(), action.ability.target_percentage);
            candidates.choose_multiple(rng, count).copied().collect()
        }
        TargetingStyle::Caster => vec![action.caster],
    }
}
