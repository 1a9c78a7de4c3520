//! Combat roster and capability tables
//!
//! One instance per active encounter. Holds who is fighting, which side they
//! are on, and the per-combatant health / AP / brain handles. No rules live
//! here beyond classification and lookup.

use ahash::AHashMap;

use crate::combat::action::PendingAction;
use crate::combat::ai::Brain;
use crate::combat::events::{CombatantSnapshot, Meter, TurnSnapshot};
use crate::combatant::{CastAnimator, CombatantIdentity, Participant, ResourcePool, TargetSelectable};
use crate::core::types::{CombatantId, Side};

/// Target-selectability handles pulled out of the participant table
pub type TargetHandles = Vec<(CombatantId, Box<dyn TargetSelectable>)>;

#[derive(Default)]
pub struct CombatState {
    initialized: bool,
    /// Discovery order
    all_combatants: Vec<CombatantId>,
    identities: AHashMap<CombatantId, CombatantIdentity>,
    player: Option<CombatantId>,
    enemies: Vec<CombatantId>,
    pending_actions: Vec<PendingAction>,

    health: AHashMap<CombatantId, ResourcePool>,
    action_points: AHashMap<CombatantId, ResourcePool>,
    brains: AHashMap<CombatantId, Box<dyn Brain>>,
    animators: AHashMap<CombatantId, Box<dyn CastAnimator>>,
}

impl CombatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from an arena's participant table
    ///
    /// Empty slots (`None`) are skipped. The first `Side::Player` combatant
    /// becomes the player; further player-side combatants are allies. Neutral
    /// combatants stay in the roster without a side role. Returns the
    /// target-selectability handles of enemies for the caller to drive.
    pub fn initialize<I>(&mut self, participants: I) -> TargetHandles
    where
        I: IntoIterator<Item = Option<Participant>>,
    {
        self.clear();
        let mut handles = TargetHandles::new();

        for participant in participants.into_iter().flatten() {
            let id = participant.id();
            if self.identities.contains_key(&id) {
                tracing::warn!(%id, "duplicate participant ignored");
                continue;
            }

            match participant.identity.side {
                Side::Player if self.player.is_none() => self.player = Some(id),
                Side::Player => {
                    tracing::debug!(%id, name = %participant.identity.name, "additional player-side combatant");
                }
                Side::Enemy => self.enemies.push(id),
                Side::Neutral => {}
            }

            if let Some(health) = participant.health {
                self.health.insert(id, health);
            }
            if let Some(ap) = participant.action_points {
                self.action_points.insert(id, ap);
            }
            if let Some(brain) = participant.brain {
                self.brains.insert(id, brain);
            }
            if let Some(animator) = participant.animator {
                self.animators.insert(id, animator);
            }
            if let Some(selectable) = participant.target_selectable {
                if participant.identity.side == Side::Enemy {
                    handles.push((id, selectable));
                }
            }

            self.all_combatants.push(id);
            self.identities.insert(id, participant.identity);
        }

        self.initialized = true;
        tracing::debug!(
            combatants = self.all_combatants.len(),
            enemies = self.enemies.len(),
            has_player = self.player.is_some(),
            "combat state initialized"
        );
        handles
    }

    /// Drop everything; safe to repeat
    pub fn clear(&mut self) {
        self.initialized = false;
        self.all_combatants.clear();
        self.identities.clear();
        self.player = None;
        self.enemies.clear();
        self.pending_actions.clear();
        self.health.clear();
        self.action_points.clear();
        self.brains.clear();
        self.animators.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn all_combatants(&self) -> &[CombatantId] {
        &self.all_combatants
    }

    pub fn player(&self) -> Option<CombatantId> {
        self.player
    }

    pub fn enemies(&self) -> &[CombatantId] {
        &self.enemies
    }

    pub fn contains(&self, id: CombatantId) -> bool {
        self.identities.contains_key(&id)
    }

    pub fn identity(&self, id: CombatantId) -> Option<&CombatantIdentity> {
        self.identities.get(&id)
    }

    pub fn name(&self, id: CombatantId) -> &str {
        self.identities
            .get(&id)
            .map(|i| i.name.as_str())
            .unwrap_or("<unknown>")
    }

    pub fn side(&self, id: CombatantId) -> Option<Side> {
        self.identities.get(&id).map(|i| i.side)
    }

    pub fn health(&self, id: CombatantId) -> Option<&ResourcePool> {
        self.health.get(&id)
    }

    pub fn health_mut(&mut self, id: CombatantId) -> Option<&mut ResourcePool> {
        self.health.get_mut(&id)
    }

    pub fn action_points(&self, id: CombatantId) -> Option<&ResourcePool> {
        self.action_points.get(&id)
    }

    pub fn action_points_mut(&mut self, id: CombatantId) -> Option<&mut ResourcePool> {
        self.action_points.get_mut(&id)
    }

    pub fn brain(&self, id: CombatantId) -> Option<&dyn Brain> {
        self.brains.get(&id).map(|b| b.as_ref())
    }

    pub fn animator(&self, id: CombatantId) -> Option<&dyn CastAnimator> {
        self.animators.get(&id).map(|a| a.as_ref())
    }

    /// Alive and targetable: has health and it is above zero
    pub fn is_active(&self, id: CombatantId) -> bool {
        self.health
            .get(&id)
            .map(|h| h.current() > 0)
            .unwrap_or(false)
    }

    /// Active combatants on `side`, roster order
    pub fn active_on(&self, side: Side) -> Vec<CombatantId> {
        self.all_combatants
            .iter()
            .copied()
            .filter(|&id| self.side(id) == Some(side) && self.is_active(id))
            .collect()
    }

    /// Active combatants hostile to `side`, roster order
    pub fn active_opponents_of(&self, side: Side) -> Vec<CombatantId> {
        match side.opposing() {
            Some(opposing) => self.active_on(opposing),
            None => Vec::new(),
        }
    }

    pub fn pending_actions(&self) -> &[PendingAction] {
        &self.pending_actions
    }

    pub fn push_pending(&mut self, action: PendingAction) {
        self.pending_actions.push(action);
    }

    pub fn clear_pending(&mut self) {
        self.pending_actions.clear();
    }

    /// The player's own action this turn, if one was committed
    pub fn player_action(&self) -> Option<&PendingAction> {
        let player = self.player?;
        self.pending_actions.iter().find(|a| a.caster == player)
    }

    pub fn identities(&self) -> Vec<CombatantIdentity> {
        self.all_combatants
            .iter()
            .filter_map(|id| self.identities.get(id).cloned())
            .collect()
    }

    pub fn snapshot(&self, turn: u32) -> TurnSnapshot {
        let meter = |pool: &ResourcePool| Meter {
            current: pool.current(),
            max: pool.max(),
        };

        let combatants = self
            .all_combatants
            .iter()
            .filter_map(|id| {
                let identity = self.identities.get(id)?.clone();
                Some(CombatantSnapshot {
                    identity,
                    health: self.health.get(id).map(meter),
                    action_points: self.action_points.get(id).map(meter),
                })
            })
            .collect();

        TurnSnapshot { turn, combatants }
    }
}
