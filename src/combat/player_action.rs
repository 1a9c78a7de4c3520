//! Player submission validation
//!
//! Turns "the player pressed an ability (maybe with a target)" into either a
//! request for a target or a committed `PendingAction` with AP paid. Every
//! rejection leaves state untouched.

use std::sync::Arc;

use crate::ability::Ability;
use crate::combat::action::PendingAction;
use crate::combat::events::{CombatEvent, EventBus};
use crate::combat::phase::CombatPhase;
use crate::combat::state::CombatState;
use crate::combat::upgrades::UpgradeContext;
use crate::core::error::{CombatError, RejectReason, Result};
use crate::core::types::CombatantId;

/// Successful outcome of a submission
#[derive(Debug, Clone)]
pub enum Submission {
    /// Ability needs a target; it is now waiting in the pending slot
    TargetingStarted(Arc<Ability>),
    /// Action committed and AP deducted
    Submitted(PendingAction),
}

#[derive(Debug)]
pub struct PlayerActionHandler {
    /// At most one ability waits for a target
    pending_ability: Option<Arc<Ability>>,
    min_ap_cost: i32,
    events: EventBus,
}

impl PlayerActionHandler {
    pub fn new(min_ap_cost: i32, events: EventBus) -> Self {
        Self {
            pending_ability: None,
            min_ap_cost: min_ap_cost.max(1),
            events,
        }
    }

    pub fn is_in_targeting_mode(&self) -> bool {
        self.pending_ability.is_some()
    }

    pub fn pending_ability(&self) -> Option<&Arc<Ability>> {
        self.pending_ability.as_ref()
    }

    /// Drop the pending slot without firing anything
    pub fn clear(&mut self) {
        self.pending_ability = None;
    }

    /// AP the player would pay for `ability` right now
    pub fn cost_of(&self, ability: &Ability, upgrades: &UpgradeContext) -> i32 {
        upgrades.effective_ap_cost(ability.ap_cost, self.min_ap_cost)
    }

    /// Validate and commit a player submission
    ///
    /// In `Targeting`, `ability` is ignored and `target` completes the pending
    /// ability. In `Selection`, a single-target ability without a target
    /// enters targeting mode instead of committing.
    pub fn try_submit_action(
        &mut self,
        ability: Option<Arc<Ability>>,
        target: Option<CombatantId>,
        phase: CombatPhase,
        state: &mut CombatState,
        upgrades: &UpgradeContext,
    ) -> Result<Submission> {
        let ability = match phase {
            CombatPhase::Targeting => match self.pending_ability.clone() {
                Some(pending) => pending,
                None => return Err(self.reject(RejectReason::NoPendingAbility)),
            },
            CombatPhase::Selection => {
                let Some(ability) = ability else {
                    return Err(self.reject(RejectReason::NoAbility));
                };
                if ability.requires_target() && target.is_none() {
                    tracing::debug!(ability = %ability.name, "awaiting target");
                    self.pending_ability = Some(ability.clone());
                    self.events.emit(CombatEvent::TargetingStarted {
                        ability: ability.name.clone(),
                    });
                    return Ok(Submission::TargetingStarted(ability));
                }
                ability
            }
            other => return Err(self.reject(RejectReason::WrongPhase(other))),
        };

        if !state.is_initialized() {
            return Err(self.reject(RejectReason::NotInitialized));
        }
        let Some(player) = state.player() else {
            return Err(self.reject(RejectReason::NoPlayer));
        };
        let cost = self.cost_of(&ability, upgrades);
        let available = match state.action_points(player) {
            Some(ap) => ap.current(),
            None => return Err(self.reject(RejectReason::NoActionPoints)),
        };
        if available < cost {
            return Err(self.reject(RejectReason::InsufficientActionPoints {
                required: cost,
                available,
            }));
        }
        if ability.requires_target() {
            match target {
                None => return Err(self.reject(RejectReason::MissingTarget)),
                Some(t) if !state.contains(t) => {
                    return Err(self.reject(RejectReason::UnknownTarget(t)))
                }
                Some(_) => {}
            }
        }

        if let Some(ap) = state.action_points_mut(player) {
            ap.affect(-cost);
        }
        let action = PendingAction::new(ability, player, target);
        state.push_pending(action.clone());
        self.pending_ability = None;

        tracing::info!(
            ability = %action.ability.name,
            cost,
            remaining = available - cost,
            "player action submitted"
        );
        self.events.emit(CombatEvent::ActionSubmitted(action.clone()));
        Ok(Submission::Submitted(action))
    }

    /// Leave targeting mode; returns false if nothing was pending
    pub fn cancel_targeting(&mut self) -> bool {
        match self.pending_ability.take() {
            Some(ability) => {
                tracing::debug!(ability = %ability.name, "targeting cancelled");
                self.events.emit(CombatEvent::TargetingCancelled);
                true
            }
            None => false,
        }
    }

    fn reject(&self, reason: RejectReason) -> CombatError {
        tracing::warn!(%reason, "player submission rejected");
        CombatError::ActionRejected(reason)
    }
}
