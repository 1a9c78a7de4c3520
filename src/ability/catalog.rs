//! Ability definitions loaded from TOML
//!
//! Loads from `data/abilities.toml`:
//!
//! ```toml
//! [[ability]]
//! name = "Slash"
//! ap_cost = 20
//! targeting = "single_enemy"
//! action_speed = 150
//! effect = { kind = "damage", amount = 40 }
//! ```

use std::path::Path;
use std::sync::Arc;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::ability::effects::{Damage, Heal, RestoreActionPoints};
use crate::ability::{Ability, TargetingStyle};
use crate::core::error::{CombatError, Result};

fn default_target_percentage() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectSpec {
    Damage(Damage),
    Heal(Heal),
    RestoreActionPoints(RestoreActionPoints),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub name: String,
    pub ap_cost: i32,
    pub targeting: TargetingStyle,
    #[serde(default = "default_target_percentage")]
    pub target_percentage: f32,
    pub action_speed: i32,
    pub effect: EffectSpec,
}

impl AbilityDefinition {
    pub fn build(&self) -> Ability {
        let ability = match &self.effect {
            EffectSpec::Damage(effect) => Ability::new(
                self.name.clone(),
                self.ap_cost,
                self.targeting,
                self.action_speed,
                effect.clone(),
            ),
            EffectSpec::Heal(effect) => Ability::new(
                self.name.clone(),
                self.ap_cost,
                self.targeting,
                self.action_speed,
                effect.clone(),
            ),
            EffectSpec::RestoreActionPoints(effect) => Ability::new(
                self.name.clone(),
                self.ap_cost,
                self.targeting,
                self.action_speed,
                effect.clone(),
            ),
        };
        ability.with_target_percentage(self.target_percentage)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "ability")]
    abilities: Vec<AbilityDefinition>,
}

/// Named, shared abilities
#[derive(Debug, Default, Clone)]
pub struct AbilityCatalog {
    abilities: Vec<Arc<Ability>>,
    by_name: AHashMap<String, usize>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(definitions: &[AbilityDefinition]) -> Result<Self> {
        let mut catalog = Self::new();
        for definition in definitions {
            if definition.ap_cost < 0 {
                return Err(CombatError::InvalidConfig(format!(
                    "ability '{}' has negative AP cost",
                    definition.name
                )));
            }
            catalog.insert(definition.build())?;
        }
        Ok(catalog)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::from_definitions(&file.abilities)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Add an ability; names must be unique
    pub fn insert(&mut self, ability: Ability) -> Result<Arc<Ability>> {
        if self.by_name.contains_key(&ability.name) {
            return Err(CombatError::InvalidConfig(format!(
                "duplicate ability '{}'",
                ability.name
            )));
        }
        let ability = Arc::new(ability);
        self.by_name.insert(ability.name.clone(), self.abilities.len());
        self.abilities.push(ability.clone());
        Ok(ability)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Ability>> {
        self.by_name
            .get(name)
            .map(|&index| self.abilities[index].clone())
    }

    pub fn require(&self, name: &str) -> Result<Arc<Ability>> {
        self.get(name)
            .ok_or_else(|| CombatError::UnknownAbility(name.to_string()))
    }

    /// Resolve a list of names, failing on the first unknown one
    pub fn loadout(&self, names: &[String]) -> Result<Vec<Arc<Ability>>> {
        names.iter().map(|name| self.require(name)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Ability>> {
        self.abilities.iter()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}
