//! Combat flow orchestrator
//!
//! Drives one encounter from `start_combat` to Victory/Defeat:
//!
//! 1. Selection (and Targeting): wait for the player's submission
//! 2. AI planning: every eligible brain queues an action
//! 3. Execution: fastest first, with a pacing pause and a win check after each
//! 4. Next turn, or end of combat
//!
//! The only suspension point is the pacing pause. Cancellation is observed
//! there and between actions; nothing runs after it is seen.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, watch};

use crate::ability::Ability;
use crate::combat::action::{sort_for_execution, PendingAction};
use crate::combat::ai::AiManager;
use crate::combat::events::{CombatEvent, EventBus, TurnSnapshot};
use crate::combat::executor::execute_action;
use crate::combat::log::{LogCategory, LogSink};
use crate::combat::phase::{CombatPhase, TurnScheduler};
use crate::combat::player_action::{PlayerActionHandler, Submission};
use crate::combat::state::CombatState;
use crate::combat::upgrades::UpgradeContext;
use crate::combat::win_condition::{check_combat_result, CombatResult};
use crate::combatant::Participant;
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::CombatantId;

/// Cooperative cancellation for an in-flight turn
///
/// Cloning shares the flag. Once cancelled it stays cancelled; the
/// orchestrator swaps in a fresh handle when the next combat starts.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            let flag = *rx.borrow_and_update();
            if flag || rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Wait out `delay` unless cancelled first
    pub async fn pause(&self, delay: Duration) -> Result<()> {
        if self.is_cancelled() {
            return Err(CombatError::Cancelled);
        }
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancelled() => {}
            }
        }
        if self.is_cancelled() {
            Err(CombatError::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a player submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ability waits for a target; phase is now Targeting
    AwaitingTarget,
    /// The turn ran to completion
    TurnResolved(TurnResolution),
}

/// How a turn's execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnResolution {
    /// Nobody won; a new Selection phase is open
    NextTurn,
    Victory,
    Defeat,
    /// Cancelled mid-turn; combat state was released
    Cancelled,
}

pub struct CombatFlowOrchestrator {
    config: CombatConfig,
    upgrades: UpgradeContext,
    state: CombatState,
    scheduler: TurnScheduler,
    handler: PlayerActionHandler,
    ai: AiManager,
    events: EventBus,
    log: Box<dyn LogSink>,
    rng: ChaCha8Rng,
    cancel: CancelHandle,
    turn: u32,
    outcome: Option<CombatResult>,
    /// Roster as it stood when combat ended
    final_snapshot: Option<TurnSnapshot>,
}

impl CombatFlowOrchestrator {
    pub fn new(config: CombatConfig, upgrades: UpgradeContext, log: impl LogSink + 'static) -> Self {
        let events = EventBus::new(config.event_capacity);
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            scheduler: TurnScheduler::new(events.clone()),
            handler: PlayerActionHandler::new(config.min_ap_cost, events.clone()),
            config,
            upgrades,
            state: CombatState::new(),
            ai: AiManager::new(),
            events,
            log: Box::new(log),
            rng,
            cancel: CancelHandle::new(),
            turn: 0,
            outcome: None,
            final_snapshot: None,
        }
    }

    /// Publish on an externally owned bus so subscribers can attach early
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.scheduler = TurnScheduler::new(events.clone());
        self.handler = PlayerActionHandler::new(self.config.min_ap_cost, events.clone());
        self.events = events;
        self
    }

    /// Share an externally owned cancel flag
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Set up a new encounter from an arena's participant table
    ///
    /// Fails with `PlayerNotFound` (and leaves nothing initialized) when no
    /// participant is on the player side. A cancel handle tripped by an
    /// earlier encounter is replaced, so clones taken before this call no
    /// longer reach the new combat.
    pub fn start_combat<I>(&mut self, participants: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<Participant>>,
    {
        if self.is_active() {
            tracing::warn!(turn = self.turn, "starting combat over an active encounter");
        }
        if self.cancel.is_cancelled() {
            tracing::debug!("previous encounter was cancelled, using a fresh cancel handle");
            self.cancel = CancelHandle::new();
        }
        self.scheduler.reset();
        self.turn = 0;
        self.outcome = None;
        self.final_snapshot = None;

        let handles = self.state.initialize(participants);
        let Some(player) = self.state.player() else {
            tracing::error!("no player among participants, combat not started");
            self.state.clear();
            return Err(CombatError::PlayerNotFound);
        };
        self.scheduler.set_target_handles(handles);
        self.sync_player(player);

        tracing::info!(
            combatants = self.state.all_combatants().len(),
            enemies = self.state.enemies().len(),
            "combat started"
        );
        self.events
            .emit(CombatEvent::CombatStarted(self.state.identities()));
        self.open_turn()
    }

    /// Player max AP / health come from progression; both start full
    fn sync_player(&mut self, player: CombatantId) {
        match self.state.action_points_mut(player) {
            Some(ap) => {
                ap.set_max(self.upgrades.max_action_points);
                ap.restore_full();
            }
            None => tracing::warn!("player has no action point pool"),
        }
        match self.state.health_mut(player) {
            Some(health) => {
                health.set_max(self.upgrades.max_health);
                health.restore_full();
            }
            None => tracing::warn!("player has no health pool"),
        }
    }

    fn open_turn(&mut self) -> Result<()> {
        self.scheduler.start_turn(&mut self.state, &mut self.handler)?;
        self.turn += 1;
        if self.turn > 1 && self.upgrades.action_point_regen > 0 {
            self.regenerate_player_ap();
        }
        tracing::info!(turn = self.turn, "turn opened");
        self.events
            .emit(CombatEvent::TurnOpened(self.state.snapshot(self.turn)));
        Ok(())
    }

    fn regenerate_player_ap(&mut self) {
        let regen = self.upgrades.action_point_regen;
        let Some(player) = self.state.player() else {
            return;
        };
        if let Some(ap) = self.state.action_points_mut(player) {
            let gained = ap.affect(regen);
            if gained > 0 {
                self.log
                    .record(LogCategory::ActionPoints, format!("Recovered {} AP", gained));
            }
        }
    }

    /// Submit the player's ability, optionally with a target
    ///
    /// While targeting, `ability` is ignored and `target` completes the
    /// pending ability. A committed action runs the whole turn before
    /// returning. Rejections leave the phase unchanged.
    pub async fn submit_player_action(
        &mut self,
        ability: Option<Arc<Ability>>,
        target: Option<CombatantId>,
    ) -> Result<SubmitOutcome> {
        let Some(phase) = self.scheduler.phase() else {
            return Err(CombatError::CombatNotInitialized);
        };

        let submission =
            self.handler
                .try_submit_action(ability, target, phase, &mut self.state, &self.upgrades);
        match submission {
            Ok(Submission::TargetingStarted(_)) => {
                self.scheduler.enter_targeting_phase()?;
                Ok(SubmitOutcome::AwaitingTarget)
            }
            Ok(Submission::Submitted(_)) => {
                self.scheduler.notify_player_action_submitted()?;
                let resolution = self.finalize_selection_and_execute_turn().await?;
                Ok(SubmitOutcome::TurnResolved(resolution))
            }
            Err(CombatError::ActionRejected(reason)) => {
                self.events.emit(CombatEvent::SubmissionRejected(reason));
                Err(CombatError::ActionRejected(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Pick the target for the ability waiting in targeting mode
    pub async fn select_target(&mut self, target: CombatantId) -> Result<SubmitOutcome> {
        self.submit_player_action(None, Some(target)).await
    }

    pub fn cancel_targeting(&mut self) -> Result<()> {
        self.scheduler.cancel_targeting(&mut self.handler)
    }

    /// End the player's window without acting; AI actions still resolve
    pub async fn pass_turn(&mut self) -> Result<TurnResolution> {
        if self.scheduler.phase() == Some(CombatPhase::Targeting) {
            self.handler.cancel_targeting();
        }
        self.scheduler.notify_player_action_submitted()?;
        tracing::info!(turn = self.turn, "player passed");
        self.finalize_selection_and_execute_turn().await
    }

    /// Plan AI actions and run the turn's queue to completion
    ///
    /// Cancellation releases combat state and reports `Cancelled`. Any other
    /// failure in the loop ends combat as a defeat.
    pub async fn finalize_selection_and_execute_turn(&mut self) -> Result<TurnResolution> {
        if !self.is_active() {
            return Err(CombatError::CombatNotInitialized);
        }

        let planned = self.ai.plan_actions(&mut self.state, &mut self.rng);
        let ordered = sort_for_execution(
            self.state.pending_actions(),
            self.state.player(),
            self.upgrades.global_action_speed_bonus,
        );
        tracing::debug!(planned, queued = ordered.len(), "turn planned");
        self.scheduler.start_execution_phase(ordered.len())?;

        let result = match self.run_execution(ordered).await {
            Ok(result) => self.conclude_turn(result),
            Err(e) => Err(e),
        };

        match result {
            Ok(resolution) => Ok(resolution),
            Err(e) if e.is_cancelled() => {
                tracing::debug!(turn = self.turn, "turn cancelled");
                self.release();
                Ok(TurnResolution::Cancelled)
            }
            Err(e) => {
                tracing::error!(error = %e, turn = self.turn, "turn loop failed, forcing defeat");
                if self.scheduler.phase().map_or(false, |p| p.is_terminal()) {
                    self.release();
                } else {
                    self.end_combat(false)?;
                }
                Ok(TurnResolution::Defeat)
            }
        }
    }

    async fn run_execution(&mut self, ordered: Vec<PendingAction>) -> Result<CombatResult> {
        let delay = self.config.action_delay();

        for action in ordered {
            if self.cancel.is_cancelled() {
                return Err(CombatError::Cancelled);
            }

            let outcome = execute_action(
                &action,
                &mut self.state,
                &self.upgrades,
                self.log.as_mut(),
                &mut self.rng,
            );
            self.events.emit(CombatEvent::ActionResolved {
                caster: action.caster,
                ability: action.ability.name.clone(),
                outcome,
            });

            self.cancel.pause(delay).await?;

            let result = check_combat_result(&self.state);
            if result.is_over() {
                tracing::debug!(?result, "decisive result, remaining actions dropped");
                return Ok(result);
            }
        }
        Ok(CombatResult::Ongoing)
    }

    fn conclude_turn(&mut self, result: CombatResult) -> Result<TurnResolution> {
        match result {
            CombatResult::Ongoing => {
                self.open_turn()?;
                Ok(TurnResolution::NextTurn)
            }
            CombatResult::Victory => {
                self.end_combat(true)?;
                Ok(TurnResolution::Victory)
            }
            CombatResult::Defeat => {
                self.end_combat(false)?;
                Ok(TurnResolution::Defeat)
            }
        }
    }

    /// Enter Victory or Defeat and release the encounter
    ///
    /// Fails if combat already ended, so cleanup never runs twice.
    pub fn end_combat(&mut self, player_won: bool) -> Result<()> {
        self.scheduler.end_combat(player_won)?;
        let result = if player_won {
            CombatResult::Victory
        } else {
            CombatResult::Defeat
        };

        self.final_snapshot = Some(self.state.snapshot(self.turn));
        self.release();
        self.outcome = Some(result);

        tracing::info!(?result, turns = self.turn, "combat ended");
        self.events.emit(CombatEvent::CombatEnded(result));
        if player_won {
            self.events.emit(CombatEvent::RewardSelectionRequested);
        }
        Ok(())
    }

    /// Drop roster and target handles; safe to repeat
    fn release(&mut self) {
        self.scheduler.clear_target_handles();
        self.handler.clear();
        self.state.clear();
    }

    pub fn current_phase(&self) -> Option<CombatPhase> {
        self.scheduler.phase()
    }

    /// An encounter is set up and has not ended
    pub fn is_active(&self) -> bool {
        self.state.is_initialized() && self.scheduler.phase().map_or(false, |p| !p.is_terminal())
    }

    pub fn is_in_targeting_mode(&self) -> bool {
        self.handler.is_in_targeting_mode()
    }

    pub fn all_combatants(&self) -> &[CombatantId] {
        self.state.all_combatants()
    }

    pub fn enemies(&self) -> &[CombatantId] {
        self.state.enemies()
    }

    pub fn player(&self) -> Option<CombatantId> {
        self.state.player()
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn upgrades(&self) -> &UpgradeContext {
        &self.upgrades
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn outcome(&self) -> Option<CombatResult> {
        self.outcome
    }

    pub fn snapshot(&self) -> TurnSnapshot {
        self.state.snapshot(self.turn)
    }

    pub fn final_snapshot(&self) -> Option<&TurnSnapshot> {
        self.final_snapshot.as_ref()
    }

    /// AP the player would pay for `ability` with current upgrades
    pub fn player_cost_of(&self, ability: &Ability) -> i32 {
        self.handler.cost_of(ability, &self.upgrades)
    }
}

impl std::fmt::Debug for CombatFlowOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatFlowOrchestrator")
            .field("phase", &self.scheduler.phase())
            .field("turn", &self.turn)
            .field("combatants", &self.state.all_combatants().len())
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}
