//! Turn phase state machine
//!
//! ```text
//! Selection ──(single-target ability, no target)──> Targeting
//!     ^  <───────────────(cancel)──────────────────────┘
//!     |                                                 |
//!     └─(start_turn)── Execution <──(submitted/passed)──┘
//!                          |
//!                          └──> Victory | Defeat   (terminal)
//! ```
//!
//! Every phase change fires `CombatEvent::PhaseChanged`. Enemy target
//! selectability is on exactly while the phase is `Targeting`.

use serde::{Deserialize, Serialize};

use crate::combat::events::{CombatEvent, EventBus};
use crate::combat::player_action::PlayerActionHandler;
use crate::combat::state::{CombatState, TargetHandles};
use crate::core::error::{CombatError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    Selection,
    Targeting,
    Execution,
    Victory,
    Defeat,
}

impl CombatPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CombatPhase::Victory | CombatPhase::Defeat)
    }
}

impl std::fmt::Display for CombatPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CombatPhase::Selection => "selection",
            CombatPhase::Targeting => "targeting",
            CombatPhase::Execution => "execution",
            CombatPhase::Victory => "victory",
            CombatPhase::Defeat => "defeat",
        };
        f.write_str(name)
    }
}

/// Enemy target-selectability handles, toggled as a group
#[derive(Default)]
pub struct TargetHighlighter {
    handles: TargetHandles,
    active: bool,
}

impl TargetHighlighter {
    /// Replace the cached handles; new handles start deactivated
    pub fn set_handles(&mut self, handles: TargetHandles) {
        self.clear();
        self.handles = handles;
        for (_, handle) in self.handles.iter_mut() {
            handle.set_collider_active(false);
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        for (_, handle) in self.handles.iter_mut() {
            handle.set_collider_active(active);
        }
    }

    /// Deactivate and drop all handles
    pub fn clear(&mut self) {
        self.set_active(false);
        self.handles.clear();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl std::fmt::Debug for TargetHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetHighlighter")
            .field("handles", &self.handles.len())
            .field("active", &self.active)
            .finish()
    }
}

#[derive(Debug)]
pub struct TurnScheduler {
    /// `None` until the first turn opens
    phase: Option<CombatPhase>,
    events: EventBus,
    highlighter: TargetHighlighter,
}

impl TurnScheduler {
    pub fn new(events: EventBus) -> Self {
        Self {
            phase: None,
            events,
            highlighter: TargetHighlighter::default(),
        }
    }

    pub fn phase(&self) -> Option<CombatPhase> {
        self.phase
    }

    pub fn highlighter(&self) -> &TargetHighlighter {
        &self.highlighter
    }

    pub fn set_target_handles(&mut self, handles: TargetHandles) {
        self.highlighter.set_handles(handles);
    }

    pub fn clear_target_handles(&mut self) {
        self.highlighter.clear();
    }

    /// Forget the previous encounter's phase
    pub fn reset(&mut self) {
        self.highlighter.clear();
        self.phase = None;
    }

    /// Open a new selection window
    pub fn start_turn(&mut self, state: &mut CombatState, handler: &mut PlayerActionHandler) -> Result<()> {
        if let Some(current) = self.phase.filter(|p| p.is_terminal()) {
            return Err(CombatError::InvalidTransition {
                from: current,
                to: CombatPhase::Selection,
            });
        }

        state.clear_pending();
        handler.clear();
        self.highlighter.set_active(false);
        self.set_phase(CombatPhase::Selection);
        self.events.emit(CombatEvent::PlayerTurnStarted);
        Ok(())
    }

    /// Selection -> Targeting, enemies become selectable
    pub fn enter_targeting_phase(&mut self) -> Result<()> {
        self.expect_phase(&[CombatPhase::Selection], CombatPhase::Targeting)?;
        self.highlighter.set_active(true);
        self.set_phase(CombatPhase::Targeting);
        Ok(())
    }

    /// Targeting -> Selection, the player's window reopens
    pub fn cancel_targeting(&mut self, handler: &mut PlayerActionHandler) -> Result<()> {
        self.expect_phase(&[CombatPhase::Targeting], CombatPhase::Selection)?;
        handler.cancel_targeting();
        self.highlighter.set_active(false);
        self.set_phase(CombatPhase::Selection);
        self.events.emit(CombatEvent::PlayerTurnStarted);
        Ok(())
    }

    /// Close the player's input window
    pub fn notify_player_action_submitted(&mut self) -> Result<()> {
        self.expect_phase(
            &[CombatPhase::Selection, CombatPhase::Targeting],
            CombatPhase::Execution,
        )?;
        self.highlighter.set_active(false);
        self.events.emit(CombatEvent::PlayerTurnEnded);
        Ok(())
    }

    pub fn start_execution_phase(&mut self, queued: usize) -> Result<()> {
        self.expect_phase(
            &[CombatPhase::Selection, CombatPhase::Targeting],
            CombatPhase::Execution,
        )?;
        tracing::debug!(queued, "execution phase");
        self.highlighter.set_active(false);
        self.set_phase(CombatPhase::Execution);
        Ok(())
    }

    /// Enter the terminal phase; fails if combat already ended
    pub fn end_combat(&mut self, player_won: bool) -> Result<CombatPhase> {
        let target = if player_won {
            CombatPhase::Victory
        } else {
            CombatPhase::Defeat
        };
        match self.phase {
            None => return Err(CombatError::CombatNotInitialized),
            Some(current) if current.is_terminal() => {
                return Err(CombatError::InvalidTransition {
                    from: current,
                    to: target,
                })
            }
            Some(_) => {}
        }
        self.highlighter.set_active(false);
        self.set_phase(target);
        Ok(target)
    }

    fn expect_phase(&self, allowed: &[CombatPhase], to: CombatPhase) -> Result<()> {
        match self.phase {
            Some(current) if allowed.contains(&current) => Ok(()),
            Some(current) => Err(CombatError::InvalidTransition { from: current, to }),
            None => Err(CombatError::CombatNotInitialized),
        }
    }

    fn set_phase(&mut self, phase: CombatPhase) {
        if self.phase != Some(phase) {
            tracing::info!(%phase, "phase changed");
        }
        self.phase = Some(phase);
        self.events.emit(CombatEvent::PhaseChanged(phase));
    }
}
