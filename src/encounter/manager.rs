//! Encounter lifecycle
//!
//! Acquire an arena, run combat to an end while feeding it player commands,
//! release the arena, report. The arena is released on every exit path.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::ability::AbilityCatalog;
use crate::combat::events::{CombatEvent, CombatantSnapshot, EventBus};
use crate::combat::log::LogSink;
use crate::combat::orchestrator::{CancelHandle, CombatFlowOrchestrator, SubmitOutcome, TurnResolution};
use crate::combat::upgrades::UpgradeContext;
use crate::combat::win_condition::CombatResult;
use crate::core::config::CombatConfig;
use crate::core::error::{CombatError, Result};
use crate::core::types::CombatantId;
use crate::encounter::arena::{Arena, ArenaProvider, EncounterDefinition};

/// Input from whoever drives the player (UI, REPL, auto-player)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerCommand {
    /// Use an ability by name, with a target if already known
    UseAbility {
        ability: String,
        target: Option<CombatantId>,
    },
    /// Complete the ability waiting in targeting mode
    SelectTarget(CombatantId),
    CancelTargeting,
    /// End the turn without acting
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterOutcome {
    Victory,
    Defeat,
    /// Stopped, cancelled, or the command stream closed
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterReport {
    pub encounter: String,
    pub outcome: EncounterOutcome,
    pub turns: u32,
    /// Living combatants when combat ended
    pub survivors: Vec<CombatantSnapshot>,
}

pub struct CombatEncounterManager<P: ArenaProvider> {
    provider: P,
    catalog: AbilityCatalog,
    config: CombatConfig,
    upgrades: UpgradeContext,
    events: EventBus,
    stop: CancelHandle,
}

impl<P: ArenaProvider> CombatEncounterManager<P> {
    pub fn new(provider: P, catalog: AbilityCatalog, config: CombatConfig, upgrades: UpgradeContext) -> Self {
        let events = EventBus::new(config.event_capacity);
        Self {
            provider,
            catalog,
            config,
            upgrades,
            events,
            stop: CancelHandle::new(),
        }
    }

    /// Events of every encounter this manager runs
    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.events.subscribe()
    }

    /// Cancelling aborts the running encounter and any later ones
    pub fn stop_handle(&self) -> CancelHandle {
        self.stop.clone()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn upgrades(&self) -> &UpgradeContext {
        &self.upgrades
    }

    /// Run one encounter to completion
    ///
    /// Setup failures (no arena, no player) are errors. Once combat runs,
    /// rejected commands are logged and ignored; the encounter ends with a
    /// report.
    pub async fn run_encounter(
        &mut self,
        encounter: &EncounterDefinition,
        commands: &mut mpsc::Receiver<PlayerCommand>,
        log: impl LogSink + 'static,
    ) -> Result<EncounterReport> {
        tracing::info!(encounter = %encounter.name, "encounter starting");
        let arena = self.provider.acquire(encounter).await?;
        let arena_id = arena.id;

        let report = self.fight(encounter, arena, commands, log).await;

        self.provider.release(arena_id).await;
        match &report {
            Ok(r) => tracing::info!(encounter = %r.encounter, outcome = ?r.outcome, turns = r.turns, "encounter finished"),
            Err(e) => tracing::error!(encounter = %encounter.name, error = %e, "encounter failed"),
        }
        report
    }

    async fn fight(
        &self,
        encounter: &EncounterDefinition,
        arena: Arena,
        commands: &mut mpsc::Receiver<PlayerCommand>,
        log: impl LogSink + 'static,
    ) -> Result<EncounterReport> {
        let mut orchestrator = CombatFlowOrchestrator::new(self.config.clone(), self.upgrades.clone(), log)
            .with_event_bus(self.events.clone())
            .with_cancel_handle(self.stop.clone());
        orchestrator.start_combat(arena.participants)?;

        while orchestrator.is_active() {
            if self.stop.is_cancelled() {
                tracing::info!("stop requested, aborting encounter");
                break;
            }
            let command = tokio::select! {
                command = commands.recv() => command,
                _ = self.stop.cancelled() => None,
            };
            let Some(command) = command else {
                tracing::info!("player input closed or stopped, aborting encounter");
                break;
            };

            match self.apply(&mut orchestrator, command).await {
                Ok(Some(TurnResolution::Cancelled)) => break,
                Ok(_) => {}
                Err(e @ CombatError::ActionRejected(_))
                | Err(e @ CombatError::UnknownAbility(_))
                | Err(e @ CombatError::InvalidTransition { .. }) => {
                    tracing::warn!(error = %e, "player command ignored");
                }
                Err(e) => return Err(e),
            }
        }

        let outcome = match orchestrator.outcome() {
            Some(CombatResult::Victory) => EncounterOutcome::Victory,
            Some(CombatResult::Defeat) => EncounterOutcome::Defeat,
            _ => EncounterOutcome::Aborted,
        };
        let survivors = orchestrator
            .final_snapshot()
            .map(|snapshot| {
                snapshot
                    .combatants
                    .iter()
                    .filter(|c| c.is_alive())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(EncounterReport {
            encounter: encounter.name.clone(),
            outcome,
            turns: orchestrator.turn(),
            survivors,
        })
    }

    async fn apply(
        &self,
        orchestrator: &mut CombatFlowOrchestrator,
        command: PlayerCommand,
    ) -> Result<Option<TurnResolution>> {
        let submitted = match command {
            PlayerCommand::UseAbility { ability, target } => {
                let ability = self.catalog.require(&ability)?;
                orchestrator.submit_player_action(Some(ability), target).await?
            }
            PlayerCommand::SelectTarget(target) => orchestrator.select_target(target).await?,
            PlayerCommand::CancelTargeting => {
                orchestrator.cancel_targeting()?;
                return Ok(None);
            }
            PlayerCommand::Pass => return orchestrator.pass_turn().await.map(Some),
        };
        Ok(match submitted {
            SubmitOutcome::AwaitingTarget => None,
            SubmitOutcome::TurnResolved(resolution) => Some(resolution),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::log::CombatLog;
    use crate::encounter::arena::{PlayerTemplate, TemplateArenaProvider};

    const CATALOG: &str = r#"
[[ability]]
name = "Slash"
ap_cost = 20
targeting = "single_enemy"
action_speed = 150
effect = { kind = "damage", amount = 40 }

[[ability]]
name = "Nibble"
ap_cost = 5
targeting = "single_enemy"
action_speed = 40
effect = { kind = "damage", amount = 2 }
"#;

    const ENCOUNTER: &str = r#"
name = "Cellar"

[[enemy]]
name = "Rat"
slot = "center"
health = 20
action_points = 20
abilities = ["Nibble"]
brain = { mistake_chance = 0.0 }
"#;

    fn manager(capacity: usize) -> CombatEncounterManager<TemplateArenaProvider> {
        let catalog = AbilityCatalog::from_toml_str(CATALOG).expect("catalog parses");
        let player = PlayerTemplate {
            name: "Hero".into(),
            abilities: vec!["Slash".into()],
        };
        let provider = TemplateArenaProvider::new(catalog.clone(), player, capacity);
        CombatEncounterManager::new(provider, catalog, CombatConfig::headless(9), UpgradeContext::default())
    }

    fn rat_id(rx: &mut broadcast::Receiver<CombatEvent>) -> Option<CombatantId> {
        while let Ok(event) = rx.try_recv() {
            if let CombatEvent::TurnOpened(snapshot) = event {
                return snapshot.living_enemies().next().map(|c| c.identity.id);
            }
        }
        None
    }

    #[tokio::test]
    async fn test_victory_report_and_arena_released() {
        let mut manager = manager(1);
        let mut events = manager.subscribe();
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (tx, mut rx) = mpsc::channel(8);

        // Targeting by command round trip: pick, then select
        let driver = async {
            tokio::task::yield_now().await;
            let rat = loop {
                if let Some(id) = rat_id(&mut events) {
                    break id;
                }
                tokio::task::yield_now().await;
            };
            let _ = tx
                .send(PlayerCommand::UseAbility {
                    ability: "Slash".into(),
                    target: None,
                })
                .await;
            let _ = tx.send(PlayerCommand::SelectTarget(rat)).await;
        };

        let (report, _) = tokio::join!(manager.run_encounter(&encounter, &mut rx, CombatLog::new()), driver);
        let report = report.expect("encounter runs");

        assert_eq!(report.outcome, EncounterOutcome::Victory);
        assert_eq!(report.turns, 1);
        assert_eq!(report.survivors.len(), 1);
        assert_eq!(report.survivors[0].identity.name, "Hero");
        assert_eq!(manager.provider().available(), 1);
    }

    #[tokio::test]
    async fn test_closed_input_aborts() {
        let mut manager = manager(1);
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (tx, mut rx) = mpsc::channel::<PlayerCommand>(1);
        drop(tx);

        let report = manager
            .run_encounter(&encounter, &mut rx, CombatLog::new())
            .await
            .expect("aborts cleanly");
        assert_eq!(report.outcome, EncounterOutcome::Aborted);
        assert!(report.survivors.is_empty());
        assert_eq!(manager.provider().available(), 1);
    }

    #[tokio::test]
    async fn test_bad_commands_are_ignored() {
        let mut manager = manager(1);
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(PlayerCommand::UseAbility {
            ability: "Fireball".into(),
            target: None,
        })
        .await
        .expect("queued");
        tx.send(PlayerCommand::CancelTargeting).await.expect("queued");
        tx.send(PlayerCommand::Pass).await.expect("queued");
        drop(tx);

        let report = manager
            .run_encounter(&encounter, &mut rx, CombatLog::new())
            .await
            .expect("runs");
        assert_eq!(report.outcome, EncounterOutcome::Aborted);
        assert_eq!(report.turns, 2, "the pass still resolved a turn");
    }

    #[tokio::test]
    async fn test_stop_handle_aborts_waiting_encounter() {
        let mut manager = manager(1);
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (_tx, mut rx) = mpsc::channel::<PlayerCommand>(1);
        manager.stop_handle().cancel();

        let report = manager
            .run_encounter(&encounter, &mut rx, CombatLog::new())
            .await
            .expect("aborts");
        assert_eq!(report.outcome, EncounterOutcome::Aborted);
    }

    #[tokio::test]
    async fn test_stop_wins_over_queued_commands() {
        let mut manager = manager(1);
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(PlayerCommand::Pass).await.expect("queued");
        manager.stop_handle().cancel();

        let report = manager
            .run_encounter(&encounter, &mut rx, CombatLog::new())
            .await
            .expect("aborts");
        assert_eq!(report.outcome, EncounterOutcome::Aborted);
        assert_eq!(report.turns, 1, "the queued pass never ran");
        assert_eq!(manager.provider().available(), 1);
    }

    #[tokio::test]
    async fn test_no_arena_is_an_error() {
        let mut manager = manager(0);
        let encounter = EncounterDefinition::from_toml_str(ENCOUNTER).expect("parses");
        let (_tx, mut rx) = mpsc::channel::<PlayerCommand>(1);

        let result = manager.run_encounter(&encounter, &mut rx, CombatLog::new()).await;
        assert!(matches!(result, Err(CombatError::ArenaUnavailable(_))));
    }
}
