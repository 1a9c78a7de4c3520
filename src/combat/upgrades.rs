//! Progression snapshot consumed by combat
//!
//! Read once when combat starts. Combat never writes back; the upgrade system
//! owns these numbers between encounters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeContext {
    /// Player AP pool, fully restored at combat start
    pub max_action_points: i32,
    /// Player health pool, fully restored at combat start
    pub max_health: i32,
    /// Flat reduction applied to every player ability cost
    pub global_ap_cost_reduction: i32,
    /// Added to the speed of the player's actions when ordering a turn
    pub global_action_speed_bonus: i32,
    /// Flat damage added to the player's damaging abilities
    pub bonus_damage: i32,
    /// AP the player regains when each turn after the first opens
    pub action_point_regen: i32,
}

impl Default for UpgradeContext {
    fn default() -> Self {
        Self {
            max_action_points: 100,
            max_health: 100,
            global_ap_cost_reduction: 0,
            global_action_speed_bonus: 0,
            bonus_damage: 0,
            action_point_regen: 0,
        }
    }
}

impl UpgradeContext {
    /// AP actually charged for an ability of `base_cost`, never below `floor`
    pub fn effective_ap_cost(&self, base_cost: i32, floor: i32) -> i32 {
        (base_cost - self.global_ap_cost_reduction).max(floor)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load from a TOML file (see `data/upgrades.toml`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}
