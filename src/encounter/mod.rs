//! Encounter setup and lifecycle around the combat core

pub mod arena;
pub mod autoplay;
pub mod manager;

pub use arena::{
    Arena, ArenaProvider, CombatantTemplate, EncounterDefinition, PlayerTemplate, TemplateArenaProvider,
};
pub use autoplay::AutoPlayer;
pub use manager::{CombatEncounterManager, EncounterOutcome, EncounterReport, PlayerCommand};
