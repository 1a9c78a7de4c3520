//! Executes one committed action against current state
//!
//! Caster checks -> re-target dead single targets -> resolve targets ->
//! animation hook -> effect. A failing hook or effect is contained here so
//! the turn loop can carry on with the next action.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rand::RngCore;

use crate::ability::{EffectContext, TargetingStyle};
use crate::combat::action::PendingAction;
use crate::combat::log::{LogCategory, LogSink};
use crate::combat::state::CombatState;
use crate::combat::targeting::resolve_targets;
use crate::combat::upgrades::UpgradeContext;
use crate::core::types::CombatantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Caster id is not in the roster (stale handle)
    UnknownCaster,
    /// Caster has no health pool
    NoHealth,
    /// Caster died before its action came up
    CasterDefeated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Skipped(SkipReason),
    Executed {
        targets: Vec<CombatantId>,
        /// Replacement for a dead single target, if one was substituted
        retargeted_to: Option<CombatantId>,
    },
    Failed {
        targets: Vec<CombatantId>,
        reason: String,
    },
}

/// Primary target to use at execution time
///
/// Only `SingleEnemy` actions with a target are touched. A living target is
/// kept; a dead one is replaced by the living opponent with the most health
/// (first in roster order on ties), or by nothing if the opposing side is wiped.
pub fn select_primary_target(action: &PendingAction, state: &CombatState) -> Option<CombatantId> {
    let target = action.primary_target?;
    if action.ability.targeting != TargetingStyle::SingleEnemy || state.is_active(target) {
        return Some(target);
    }

    let side = state.side(action.caster)?;
    let mut best: Option<(CombatantId, i32)> = None;
    for candidate in state.active_opponents_of(side) {
        let current = state.health(candidate).map(|h| h.current()).unwrap_or(0);
        if best.map_or(true, |(_, best_health)| current > best_health) {
            best = Some((candidate, current));
        }
    }
    best.map(|(id, _)| id)
}

/// Run `action` against `state`
pub fn execute_action(
    action: &PendingAction,
    state: &mut CombatState,
    upgrades: &UpgradeContext,
    log: &mut dyn LogSink,
    rng: &mut dyn RngCore,
) -> ExecutionOutcome {
    let caster = action.caster;
    let ability = &action.ability;

    if !state.contains(caster) {
        tracing::warn!(%caster, ability = %ability.name, "caster not in roster, skipping");
        return ExecutionOutcome::Skipped(SkipReason::UnknownCaster);
    }
    let Some(health) = state.health(caster) else {
        tracing::warn!(%caster, ability = %ability.name, "caster has no health pool, skipping");
        return ExecutionOutcome::Skipped(SkipReason::NoHealth);
    };
    if health.current() <= 0 {
        tracing::debug!(caster = %state.name(caster), ability = %ability.name, "caster defeated, skipping");
        return ExecutionOutcome::Skipped(SkipReason::CasterDefeated);
    }

    let primary = select_primary_target(action, state);
    let retargeted_to = match (action.primary_target, primary) {
        (Some(original), Some(replacement)) if original != replacement => Some(replacement),
        _ => None,
    };
    if let Some(replacement) = retargeted_to {
        log.record(
            LogCategory::Info,
            format!(
                "{} turns on {}",
                state.name(caster),
                state.name(replacement)
            ),
        );
    } else if action.primary_target.is_some() && primary.is_none() {
        tracing::debug!(ability = %ability.name, "no living opponent left to re-target");
    }

    let resolved = PendingAction {
        primary_target: primary,
        ..action.clone()
    };
    let targets = resolve_targets(&resolved, state, rng);

    if let Some(animator) = state.animator(caster) {
        let played = catch_unwind(AssertUnwindSafe(|| animator.play_cast(&ability.name)));
        if let Err(payload) = played {
            tracing::warn!(
                ability = %ability.name,
                caster = %state.name(caster),
                reason = %panic_message(payload.as_ref()),
                "cast animation failed, continuing"
            );
        }
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = EffectContext {
            caster,
            targets: &targets,
            upgrades,
            state: &mut *state,
            log: &mut *log,
            rng: &mut *rng,
        };
        ability.effect().apply(&mut ctx)
    }));

    let failure = match result {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    };

    match failure {
        None => ExecutionOutcome::Executed {
            targets,
            retargeted_to,
        },
        Some(reason) => {
            tracing::error!(ability = %ability.name, caster = %state.name(caster), %reason, "ability effect failed");
            ExecutionOutcome::Failed { targets, reason }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}
