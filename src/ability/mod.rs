//! Abilities: immutable configuration plus an effect function
//!
//! The combat core decides *who* an ability hits and *when*; the effect decides
//! *what happens*. Effects must tolerate an empty target list.

pub mod catalog;
pub mod effects;

use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use catalog::{AbilityCatalog, AbilityDefinition, EffectSpec};
pub use effects::{Damage, Heal, RestoreActionPoints};

use crate::combat::log::{LogCategory, LogSink};
use crate::combat::state::CombatState;
use crate::combat::upgrades::UpgradeContext;
use crate::core::error::Result;
use crate::core::types::CombatantId;

/// How an ability picks the combatants it affects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingStyle {
    /// One chosen opponent; re-targeted at execution if it died
    SingleEnemy,
    AllEnemies,
    /// `ceil(count * target_percentage)` opponents, at least one
    RandomEnemies,
    /// The caster only
    #[serde(rename = "self")]
    Caster,
}

/// What an effect gets to work with
pub struct EffectContext<'a> {
    pub caster: CombatantId,
    pub targets: &'a [CombatantId],
    pub upgrades: &'a UpgradeContext,
    /// Full roster and capability tables
    pub state: &'a mut CombatState,
    pub log: &'a mut dyn LogSink,
    pub rng: &'a mut dyn RngCore,
}

impl EffectContext<'_> {
    pub fn caster_is_player(&self) -> bool {
        self.state.player() == Some(self.caster)
    }

    pub fn name_of(&self, id: CombatantId) -> String {
        self.state.name(id).to_string()
    }

    pub fn record(&mut self, category: LogCategory, message: String) {
        self.log.record(category, message);
    }
}

pub trait AbilityEffect: Send + Sync {
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<()>;
}

/// Effect backed by a closure
pub struct FnEffect<F>(F);

/// Wrap a closure as an effect
pub fn effect_fn<F>(f: F) -> FnEffect<F>
where
    F: Fn(&mut EffectContext<'_>) -> Result<()> + Send + Sync,
{
    FnEffect(f)
}

impl<F> AbilityEffect for FnEffect<F>
where
    F: Fn(&mut EffectContext<'_>) -> Result<()> + Send + Sync,
{
    fn apply(&self, ctx: &mut EffectContext<'_>) -> Result<()> {
        (self.0)(ctx)
    }
}

#[derive(Clone)]
pub struct Ability {
    pub name: String,
    pub ap_cost: i32,
    pub targeting: TargetingStyle,
    /// Share of opponents hit by `RandomEnemies` (0.0..=1.0)
    pub target_percentage: f32,
    /// Turn-order priority, higher acts earlier
    pub action_speed: i32,
    effect: Arc<dyn AbilityEffect>,
}

impl Ability {
    pub fn new(
        name: impl Into<String>,
        ap_cost: i32,
        targeting: TargetingStyle,
        action_speed: i32,
        effect: impl AbilityEffect + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            ap_cost,
            targeting,
            target_percentage: 1.0,
            action_speed,
            effect: Arc::new(effect),
        }
    }

    pub fn with_target_percentage(mut self, percentage: f32) -> Self {
        self.target_percentage = percentage.clamp(0.0, 1.0);
        self
    }

    /// Needs the player to pick a target before it can be committed
    pub fn requires_target(&self) -> bool {
        self.targeting == TargetingStyle::SingleEnemy
    }

    pub fn effect(&self) -> &dyn AbilityEffect {
        self.effect.as_ref()
    }
}

impl std::fmt::Debug for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ability")
            .field("name", &self.name)
            .field("ap_cost", &self.ap_cost)
            .field("targeting", &self.targeting)
            .field("target_percentage", &self.target_percentage)
            .field("action_speed", &self.action_speed)
            .finish_non_exhaustive()
    }
}
