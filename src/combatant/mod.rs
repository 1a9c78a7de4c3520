//! Combatants and their capability table
//!
//! A `Participant` is one row of the table an arena hands to combat setup:
//! a stable identity plus whichever capabilities the combatant has. Nothing is
//! discovered at runtime; a missing capability is simply `None`.

pub mod capabilities;
pub mod resource;

use serde::{Deserialize, Serialize};

pub use capabilities::{CastAnimator, TargetSelectable};
pub use resource::ResourcePool;

use crate::combat::ai::Brain;
use crate::core::types::{CombatantId, PositionSlot, Side};

/// Who a combatant is, independent of its current condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantIdentity {
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    pub slot: Option<PositionSlot>,
}

impl CombatantIdentity {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            id: CombatantId::new(),
            name: name.into(),
            side,
            slot: None,
        }
    }
}

/// A combatant as delivered by arena setup
pub struct Participant {
    pub identity: CombatantIdentity,
    pub health: Option<ResourcePool>,
    pub action_points: Option<ResourcePool>,
    pub brain: Option<Box<dyn Brain>>,
    pub animator: Option<Box<dyn CastAnimator>>,
    pub target_selectable: Option<Box<dyn TargetSelectable>>,
}

impl Participant {
    pub fn new(name: impl Into<String>, side: Side) -> Self {
        Self {
            identity: CombatantIdentity::new(name, side),
            health: None,
            action_points: None,
            brain: None,
            animator: None,
            target_selectable: None,
        }
    }

    pub fn id(&self) -> CombatantId {
        self.identity.id
    }

    pub fn with_health(mut self, max: i32) -> Self {
        self.health = Some(ResourcePool::new(max));
        self
    }

    pub fn with_action_points(mut self, max: i32) -> Self {
        self.action_points = Some(ResourcePool::new(max));
        self
    }

    pub fn with_slot(mut self, slot: PositionSlot) -> Self {
        self.identity.slot = Some(slot);
        self
    }

    pub fn with_brain(mut self, brain: impl Brain + 'static) -> Self {
        self.brain = Some(Box::new(brain));
        self
    }

    pub fn with_animator(mut self, animator: impl CastAnimator + 'static) -> Self {
        self.animator = Some(Box::new(animator));
        self
    }

    pub fn with_target_selectable(mut self, selectable: impl TargetSelectable + 'static) -> Self {
        self.target_selectable = Some(Box::new(selectable));
        self
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("identity", &self.identity)
            .field("health", &self.health)
            .field("action_points", &self.action_points)
            .field("brain", &self.brain.as_ref().map(|b| b.name().to_string()))
            .field("animator", &self.animator.is_some())
            .field("target_selectable", &self.target_selectable.is_some())
            .finish()
    }
}
