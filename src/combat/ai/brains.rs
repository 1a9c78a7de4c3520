//! Reference brain
//!
//! Scores opponents the way a field commander would: weak targets first.
//! Not content; it exists so encounters are playable out of the box.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ability::{Ability, TargetingStyle};
use crate::combat::action::PendingAction;
use crate::combat::ai::{Brain, BrainContext};
use crate::core::types::CombatantId;

/// Tunable decision weights, loadable from encounter TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainProfile {
    /// Chance to pick the heaviest affordable attack over a random one
    pub aggression: f32,
    /// Health fraction below which self-targeted abilities are preferred
    pub caution: f32,
    /// Chance to hesitate and do nothing this turn
    pub mistake_chance: f32,
}

impl Default for BrainProfile {
    fn default() -> Self {
        Self {
            aggression: 0.7,
            caution: 0.3,
            mistake_chance: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpportunistBrain {
    abilities: Vec<Arc<Ability>>,
    profile: BrainProfile,
}

impl OpportunistBrain {
    pub fn new(abilities: Vec<Arc<Ability>>, profile: BrainProfile) -> Self {
        Self { abilities, profile }
    }

    pub fn profile(&self) -> &BrainProfile {
        &self.profile
    }

    /// Most wounded opponent by health fraction; first in order on ties
    fn weakest_opponent(ctx: &BrainContext<'_>) -> Option<CombatantId> {
        let mut best_score = f32::MIN;
        let mut best = None;
        for &opponent in ctx.opponents {
            let fraction = ctx
                .state
                .health(opponent)
                .map(|h| h.fraction())
                .unwrap_or(1.0);
            let weakness = 1.0 - fraction;
            if weakness > best_score {
                best_score = weakness;
                best = Some(opponent);
            }
        }
        best
    }

    fn pick_defensive<'a>(&self, affordable: &[&'a Arc<Ability>]) -> Option<&'a Arc<Ability>> {
        affordable
            .iter()
            .copied()
            .find(|a| a.targeting == TargetingStyle::Caster)
    }

    fn pick_offensive<'a>(
        &self,
        affordable: &[&'a Arc<Ability>],
        rng: &mut dyn rand::RngCore,
    ) -> Option<&'a Arc<Ability>> {
        let offensive: Vec<&Arc<Ability>> = affordable
            .iter()
            .copied()
            .filter(|a| a.targeting != TargetingStyle::Caster)
            .collect();
        if offensive.is_empty() {
            return None;
        }
        if rng.gen::<f32>() < self.profile.aggression {
            offensive.iter().copied().max_by_key(|a| a.ap_cost)
        } else {
            offensive.choose(rng).copied()
        }
    }
}

impl Brain for OpportunistBrain {
    fn choose_action(&self, ctx: &mut BrainContext<'_>) -> Option<PendingAction> {
        let ap = ctx.my_action_points();
        let affordable: Vec<&Arc<Ability>> = self
            .abilities
            .iter()
            .filter(|a| a.ap_cost <= ap)
            .collect();
        if affordable.is_empty() {
            return None;
        }

        if self.profile.mistake_chance > 0.0 && ctx.rng.gen::<f32>() < self.profile.mistake_chance {
            tracing::debug!(combatant = %ctx.state.name(ctx.me), "hesitates");
            return None;
        }

        let wounded = ctx.my_health_fraction() < self.profile.caution;
        let threatened =
            ctx.is_player_targeting_me() && ctx.rng.gen::<f32>() >= self.profile.aggression;

        let defensive = if wounded || threatened {
            self.pick_defensive(&affordable)
        } else {
            None
        };
        let ability = match defensive {
            Some(ability) => ability,
            None => self
                .pick_offensive(&affordable, &mut *ctx.rng)
                .or_else(|| self.pick_defensive(&affordable))?,
        };

        let target = match ability.targeting {
            TargetingStyle::SingleEnemy => Some(Self::weakest_opponent(ctx)?),
            _ => None,
        };
        Some(PendingAction::new(ability.clone(), ctx.me, target))
    }

    fn name(&self) -> &str {
        "opportunist"
    }
}
