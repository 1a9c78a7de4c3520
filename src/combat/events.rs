//! Observable combat signals
//!
//! Fan-out over a broadcast channel. Any number of subscribers; delivery order
//! between subscribers is unspecified. Emitting with no subscribers is fine.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::combat::action::PendingAction;
use crate::combat::executor::ExecutionOutcome;
use crate::combat::phase::CombatPhase;
use crate::combat::win_condition::CombatResult;
use crate::combatant::CombatantIdentity;
use crate::core::error::RejectReason;
use crate::core::types::{CombatantId, PositionSlot, Side};

#[derive(Debug, Clone)]
pub enum CombatEvent {
    /// Roster as classified at combat start
    CombatStarted(Vec<CombatantIdentity>),
    PhaseChanged(CombatPhase),
    /// State copy taken as a new selection window opens
    TurnOpened(TurnSnapshot),
    PlayerTurnStarted,
    PlayerTurnEnded,
    TargetingStarted { ability: String },
    TargetingCancelled,
    ActionSubmitted(PendingAction),
    SubmissionRejected(RejectReason),
    ActionResolved {
        caster: CombatantId,
        ability: String,
        outcome: ExecutionOutcome,
    },
    CombatEnded(CombatResult),
    /// Victory hands over to the upgrade selection flow
    RewardSelectionRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meter {
    pub current: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSnapshot {
    pub identity: CombatantIdentity,
    pub health: Option<Meter>,
    pub action_points: Option<Meter>,
}

impl CombatantSnapshot {
    pub fn is_alive(&self) -> bool {
        self.health.map(|h| h.current > 0).unwrap_or(false)
    }
}

/// Point-in-time copy of the roster for UIs and input drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub turn: u32,
    pub combatants: Vec<CombatantSnapshot>,
}

impl TurnSnapshot {
    pub fn get(&self, id: CombatantId) -> Option<&CombatantSnapshot> {
        self.combatants.iter().find(|c| c.identity.id == id)
    }

    pub fn player(&self) -> Option<&CombatantSnapshot> {
        self.combatants
            .iter()
            .find(|c| c.identity.side == Side::Player)
    }

    pub fn living_enemies(&self) -> impl Iterator<Item = &CombatantSnapshot> {
        self.combatants
            .iter()
            .filter(|c| c.identity.side == Side::Enemy && c.is_alive())
    }

    pub fn enemy_in_slot(&self, slot: PositionSlot) -> Option<&CombatantSnapshot> {
        self.combatants
            .iter()
            .find(|c| c.identity.side == Side::Enemy && c.identity.slot == Some(slot))
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CombatEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: CombatEvent) {
        tracing::trace!(?event, "combat event");
        // No subscribers is not an error
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
