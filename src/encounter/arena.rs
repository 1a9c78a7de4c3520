//! Arenas and encounter templates
//!
//! An arena is a prepared participant table: the player, any allies, and the
//! enemy slots Left / Center / Right (empty slots stay `None`). Providers hand
//! arenas out and take them back when the encounter is over.

use std::future::Future;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ability::AbilityCatalog;
use crate::combat::ai::{BrainProfile, OpportunistBrain};
use crate::combatant::Participant;
use crate::core::error::{CombatError, Result};
use crate::core::types::{ArenaId, PositionSlot, Side};

fn default_pool() -> i32 {
    100
}

/// The player character as loaded from `data/player.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTemplate {
    pub name: String,
    /// Ability names available to the player
    pub abilities: Vec<String>,
}

impl PlayerTemplate {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

/// A non-player combatant in an encounter file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantTemplate {
    pub name: String,
    #[serde(default)]
    pub slot: Option<PositionSlot>,
    #[serde(default = "default_pool")]
    pub health: i32,
    #[serde(default = "default_pool")]
    pub action_points: i32,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub brain: BrainProfile,
}

impl CombatantTemplate {
    fn spawn(&self, side: Side, catalog: &AbilityCatalog) -> Result<Participant> {
        let loadout = catalog.loadout(&self.abilities)?;
        let mut participant = Participant::new(self.name.clone(), side)
            .with_health(self.health)
            .with_action_points(self.action_points);
        if let Some(slot) = self.slot {
            participant = participant.with_slot(slot);
        }
        if !loadout.is_empty() {
            participant = participant.with_brain(OpportunistBrain::new(loadout, self.brain.clone()));
        }
        Ok(participant)
    }
}

/// One encounter, as loaded from `data/encounters/*.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "enemy")]
    pub enemies: Vec<CombatantTemplate>,
    #[serde(default, rename = "ally")]
    pub allies: Vec<CombatantTemplate>,
}

impl EncounterDefinition {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let definition: Self = toml::from_str(contents)?;
        definition.validate()?;
        Ok(definition)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Every enemy needs a distinct slot
    pub fn validate(&self) -> Result<()> {
        if self.enemies.len() > PositionSlot::ALL.len() {
            return Err(CombatError::InvalidConfig(format!(
                "encounter '{}' has {} enemies, arenas hold {}",
                self.name,
                self.enemies.len(),
                PositionSlot::ALL.len()
            )));
        }
        let mut taken = Vec::new();
        for enemy in &self.enemies {
            let Some(slot) = enemy.slot else {
                return Err(CombatError::InvalidConfig(format!(
                    "enemy '{}' in '{}' has no slot",
                    enemy.name, self.name
                )));
            };
            if taken.contains(&slot) {
                return Err(CombatError::InvalidConfig(format!(
                    "slot {:?} used twice in '{}'",
                    slot, self.name
                )));
            }
            taken.push(slot);
        }
        Ok(())
    }
}

/// A prepared participant table
pub struct Arena {
    pub id: ArenaId,
    pub participants: Vec<Option<Participant>>,
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id)
            .field("participants", &self.participants.iter().flatten().count())
            .finish()
    }
}

/// Source of arenas for encounters
///
/// `acquire` may suspend (asset loading, pooling); combat does not start
/// until it resolves.
pub trait ArenaProvider: Send {
    fn acquire(&mut self, encounter: &EncounterDefinition) -> impl Future<Output = Result<Arena>> + Send;

    fn release(&mut self, arena: ArenaId) -> impl Future<Output = ()> + Send;
}

/// Builds arenas from templates, out of a fixed pool of instances
#[derive(Debug, Clone)]
pub struct TemplateArenaProvider {
    catalog: AbilityCatalog,
    player: PlayerTemplate,
    free: Vec<ArenaId>,
    capacity: usize,
}

impl TemplateArenaProvider {
    pub fn new(catalog: AbilityCatalog, player: PlayerTemplate, capacity: usize) -> Self {
        // Hand out low ids first
        let free = (0..capacity as u32).rev().map(ArenaId).collect();
        Self {
            catalog,
            player,
            free,
            capacity,
        }
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn player(&self) -> &PlayerTemplate {
        &self.player
    }

    /// Participant table in roster order: player, allies, enemy slots
    pub fn build_participants(&self, encounter: &EncounterDefinition) -> Result<Vec<Option<Participant>>> {
        // Max pools are overwritten from the upgrade context at combat start
        let player = Participant::new(self.player.name.clone(), Side::Player)
            .with_health(default_pool())
            .with_action_points(default_pool());

        let mut participants = vec![Some(player)];
        for ally in &encounter.allies {
            participants.push(Some(ally.spawn(Side::Player, &self.catalog)?));
        }
        for slot in PositionSlot::ALL {
            let occupant = encounter.enemies.iter().find(|e| e.slot == Some(slot));
            match occupant {
                Some(template) => participants.push(Some(template.spawn(Side::Enemy, &self.catalog)?)),
                None => participants.push(None),
            }
        }
        Ok(participants)
    }

    fn take(&mut self, encounter: &EncounterDefinition) -> Result<Arena> {
        let Some(id) = self.free.pop() else {
            return Err(CombatError::ArenaUnavailable(format!(
                "all {} arenas in use",
                self.capacity
            )));
        };
        match self.build_participants(encounter) {
            Ok(participants) => {
                tracing::debug!(arena = id.0, encounter = %encounter.name, "arena acquired");
                Ok(Arena { id, participants })
            }
            Err(e) => {
                self.free.push(id);
                Err(e)
            }
        }
    }
}

impl ArenaProvider for TemplateArenaProvider {
    fn acquire(&mut self, encounter: &EncounterDefinition) -> impl Future<Output = Result<Arena>> + Send {
        let arena = self.take(encounter);
        async move { arena }
    }

    fn release(&mut self, arena: ArenaId) -> impl Future<Output = ()> + Send {
        if arena.0 as usize >= self.capacity || self.free.contains(&arena) {
            tracing::warn!(arena = arena.0, "release of unknown or free arena ignored");
        } else {
            tracing::debug!(arena = arena.0, "arena released");
            self.free.push(arena);
        }
        std::future::ready(())
    }
}
