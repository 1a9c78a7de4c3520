//! AI planning for non-player combatants
//!
//! Architecture: trait seam + orchestration pass
//! - `Brain` decides what one combatant wants to do
//! - `AiManager` asks every eligible brain once per turn and pays AP
//!
//! Brains get their opposition as `opponents` and their own side as `allies`,
//! already resolved for the brain's side. An enemy brain's `opponents` are the
//! player and the player's allies.

pub mod brains;

pub use brains::{BrainProfile, OpportunistBrain};

use std::panic::{catch_unwind, AssertUnwindSafe};

use rand::RngCore;

use crate::combat::action::PendingAction;
use crate::combat::executor::panic_message;
use crate::combat::state::CombatState;
use crate::core::types::{CombatantId, Side};

/// Read-only view handed to a brain for one decision
pub struct BrainContext<'a> {
    pub me: CombatantId,
    /// What the player committed to this turn, if anything
    pub player_action: Option<&'a PendingAction>,
    /// Living combatants this brain should act against
    pub opponents: &'a [CombatantId],
    /// Living combatants on this brain's side, itself included
    pub allies: &'a [CombatantId],
    pub state: &'a CombatState,
    pub rng: &'a mut dyn RngCore,
}

impl BrainContext<'_> {
    pub fn my_action_points(&self) -> i32 {
        self.state
            .action_points(self.me)
            .map(|ap| ap.current())
            .unwrap_or(0)
    }

    pub fn my_health_fraction(&self) -> f32 {
        self.state.health(self.me).map(|h| h.fraction()).unwrap_or(0.0)
    }

    /// The player's action is aimed at this combatant
    pub fn is_player_targeting_me(&self) -> bool {
        self.player_action
            .map_or(false, |a| a.primary_target == Some(self.me))
    }
}

/// Decision-making capability of a non-player combatant
pub trait Brain: Send + Sync {
    /// Pick an action for `ctx.me`, or `None` to sit the turn out
    fn choose_action(&self, ctx: &mut BrainContext<'_>) -> Option<PendingAction>;

    fn name(&self) -> &str {
        "brain"
    }
}

/// Runs the per-turn planning pass
#[derive(Debug, Default, Clone, Copy)]
pub struct AiManager;

impl AiManager {
    pub fn new() -> Self {
        Self
    }

    /// Ask each active combatant with a brain and an AP pool for an action
    ///
    /// Affordable actions are paid for and appended to the pending list in
    /// roster order. Unaffordable or invalid choices, and brains that panic,
    /// skip that combatant's turn entirely. Returns the number of actions
    /// queued.
    pub fn plan_actions(&self, state: &mut CombatState, rng: &mut dyn RngCore) -> usize {
        let player = state.player();
        let player_action = state.player_action().cloned();
        let player_side = state.active_on(Side::Player);
        let enemy_side = state.active_on(Side::Enemy);

        let planners: Vec<CombatantId> = state
            .all_combatants()
            .iter()
            .copied()
            .filter(|&id| Some(id) != player && state.is_active(id))
            .filter(|&id| state.brain(id).is_some() && state.action_points(id).is_some())
            .collect();

        let mut queued = 0;
        for id in planners {
            let (opponents, allies) = match state.side(id) {
                Some(Side::Enemy) => (&player_side, &enemy_side),
                Some(Side::Player) => (&enemy_side, &player_side),
                _ => {
                    tracing::debug!(combatant = %state.name(id), "no side to plan for");
                    continue;
                }
            };

            let choice = {
                let Some(brain) = state.brain(id) else {
                    continue;
                };
                let mut ctx = BrainContext {
                    me: id,
                    player_action: player_action.as_ref(),
                    opponents,
                    allies,
                    state: &*state,
                    rng: &mut *rng,
                };
                catch_unwind(AssertUnwindSafe(|| brain.choose_action(&mut ctx)))
            };

            let choice = match choice {
                Ok(choice) => choice,
                Err(payload) => {
                    tracing::error!(
                        combatant = %state.name(id),
                        reason = %panic_message(payload.as_ref()),
                        "brain failed, turn skipped"
                    );
                    continue;
                }
            };
            let Some(action) = choice else {
                tracing::debug!(combatant = %state.name(id), "brain passed");
                continue;
            };
            if action.caster != id {
                tracing::warn!(
                    combatant = %state.name(id),
                    caster = %action.caster,
                    "brain returned an action for someone else, ignoring"
                );
                continue;
            }

            let cost = action.ability.ap_cost.max(0);
            let Some(ap) = state.action_points_mut(id) else {
                continue;
            };
            if cost > ap.current() {
                tracing::debug!(
                    ability = %action.ability.name,
                    cost,
                    available = ap.current(),
                    "AI action unaffordable, turn skipped"
                );
                continue;
            }
            ap.affect(-cost);

            tracing::debug!(
                combatant = %state.name(id),
                ability = %action.ability.name,
                target = ?action.primary_target,
                "AI action planned"
            );
            state.push_pending(action);
            queued += 1;
        }
        queued
    }
}
