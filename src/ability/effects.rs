//! Minimal effect set: damage, healing, AP restoration
//!
//! These exist so the flow engine has something concrete to run. Real ability
//! content plugs in through `AbilityEffect`.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ability::{AbilityEffect, EffectContext};
use crate::combat::log::LogCategory;
use crate::core::error::Result;

fn default_crit_multiplier() -> f32 {
    2.0
}

/// Subtracts health from every living target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    pub amount: i32,
    #[serde(default)]
    pub crit_chance: f32,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f32,
    #[serde(default)]
    pub miss_chance: f32,
}

impl Damage {
    /// No crits, no misses
    pub fn flat(amount: i32) -> Self {
        Self {
            amount,
            crit_chance: 0.0,
            crit_multiplier: default_crit_multiplier(),
            miss_chance: 0.0,
        }
    }
}

impl AbilityEffect for Damage {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<()> {
        let bonus = if ctx.caster_is_player() {
            ctx.upgrades.bonus_damage
        } else {
            0
        };
        let caster_name = ctx.name_of(ctx.caster);

        for &target in ctx.targets {
            if !ctx.state.is_active(target) {
                continue;
            }
            let target_name = ctx.name_of(target);

            if self.miss_chance > 0.0 && ctx.rng.gen::<f32>() < self.miss_chance {
                ctx.record(
                    LogCategory::Miss,
                    format!("{} misses {}", caster_name, target_name),
                );
                continue;
            }

            let mut amount = (self.amount + bonus).max(0);
            if self.crit_chance > 0.0 && ctx.rng.gen::<f32>() < self.crit_chance {
                amount = (amount as f32 * self.crit_multiplier).round() as i32;
                ctx.record(
                    LogCategory::Critical,
                    format!("Critical hit on {}!", target_name),
                );
            }

            let Some(health) = ctx.state.health_mut(target) else {
                continue;
            };
            let dealt = -health.affect(-amount);
            let died = health.is_depleted();

            ctx.record(
                LogCategory::Damage,
                format!("{} hits {} for {}", caster_name, target_name, dealt),
            );
            if died {
                ctx.record(LogCategory::Death, format!("{} falls", target_name));
            }
        }

        Ok(())
    }
}

/// Restores health to every living target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heal {
    pub amount: i32,
}

impl AbilityEffect for Heal {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<()> {
        for &target in ctx.targets {
            if !ctx.state.is_active(target) {
                continue;
            }
            let target_name = ctx.name_of(target);
            if let Some(health) = ctx.state.health_mut(target) {
                let healed = health.affect(self.amount.max(0));
                ctx.record(
                    LogCategory::Heal,
                    format!("{} recovers {} health", target_name, healed),
                );
            }
        }
        Ok(())
    }
}

/// Refills action points on every target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreActionPoints {
    pub amount: i32,
}

impl AbilityEffect for RestoreActionPoints {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<()> {
        for &target in ctx.targets {
            let target_name = ctx.name_of(target);
            if let Some(ap) = ctx.state.action_points_mut(target) {
                let restored = ap.affect(self.amount.max(0));
                ctx.record(
                    LogCategory::ActionPoints,
                    format!("{} regains {} AP", target_name, restored),
                );
            }
        }
        Ok(())
    }
}
