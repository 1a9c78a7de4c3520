//! Turn-based combat flow
//!
//! Leaves first: state -> targeting -> executor -> win condition ->
//! player action / AI -> phase machine -> orchestrator.

pub mod action;
pub mod ai;
pub mod events;
pub mod executor;
pub mod log;
pub mod orchestrator;
pub mod phase;
pub mod player_action;
pub mod state;
pub mod targeting;
pub mod upgrades;
pub mod win_condition;

pub use action::{sort_for_execution, PendingAction};
pub use ai::{AiManager, Brain, BrainContext, BrainProfile, OpportunistBrain};
pub use events::{CombatEvent, CombatantSnapshot, EventBus, Meter, TurnSnapshot};
pub use executor::{execute_action, ExecutionOutcome, SkipReason};
pub use log::{CombatLog, LogCategory, LogEntry, LogSink, SharedLog, TracingLogSink};
pub use orchestrator::{CancelHandle, CombatFlowOrchestrator, SubmitOutcome, TurnResolution};
pub use phase::{CombatPhase, TargetHighlighter, TurnScheduler};
pub use player_action::{PlayerActionHandler, Submission};
pub use state::{CombatState, TargetHandles};
pub use targeting::{random_target_count, resolve_targets};
pub use upgrades::UpgradeContext;
pub use win_condition::{check_combat_result, CombatResult};
