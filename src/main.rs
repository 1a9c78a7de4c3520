//! Turn Combat - Entry Point
//!
//! Plays one encounter in the terminal. Stdin is read on its own thread and
//! turned into player commands; the encounter runs on the async runtime and
//! reports back through combat events.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use turn_combat::ability::{Ability, AbilityCatalog};
use turn_combat::combat::{
    CombatEvent, CombatPhase, CombatResult, ExecutionOutcome, LogCategory, LogSink, TurnSnapshot,
    UpgradeContext,
};
use turn_combat::core::config::CombatConfig;
use turn_combat::core::error::Result;
use turn_combat::core::types::{CombatantId, PositionSlot, Side};
use turn_combat::encounter::{
    CombatEncounterManager, EncounterDefinition, PlayerCommand, PlayerTemplate, TemplateArenaProvider,
};

const DATA_DIR: &str = "data";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("turn_combat=warn")),
        )
        .init();

    tracing::info!("Turn Combat starting...");

    let rt = Runtime::new()?;
    rt.block_on(run())
}

/// Prints narrative messages as they happen
struct ConsoleLog;

impl LogSink for ConsoleLog {
    fn record(&mut self, category: LogCategory, message: String) {
        match category {
            LogCategory::Critical => println!("  !! {}", message),
            LogCategory::Death => println!("  xx {}", message),
            _ => println!("  {}", message),
        }
    }
}

/// What the input loop knows about the fight
struct Console {
    loadout: Vec<Arc<Ability>>,
    upgrades: UpgradeContext,
    min_ap_cost: i32,
    snapshot: Option<TurnSnapshot>,
}

async fn run() -> Result<()> {
    let encounter_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "goblin_ambush".to_string());
    let data = std::path::Path::new(DATA_DIR);

    let config = CombatConfig::load(data.join("combat.toml"))?;
    config.validate()?;
    let upgrades = UpgradeContext::load(data.join("upgrades.toml"))?;
    let catalog = AbilityCatalog::load(data.join("abilities.toml"))?;
    let player = PlayerTemplate::load(data.join("player.toml"))?;
    let encounter = EncounterDefinition::load(
        data.join("encounters")
            .join(format!("{}.toml", encounter_name)),
    )?;

    let mut console = Console {
        loadout: catalog.loadout(&player.abilities)?,
        upgrades: upgrades.clone(),
        min_ap_cost: config.min_ap_cost,
        snapshot: None,
    };

    let provider = TemplateArenaProvider::new(catalog.clone(), player, 1);
    let mut manager = CombatEncounterManager::new(provider, catalog, config, upgrades);
    let mut events = manager.subscribe();
    let stop = manager.stop_handle();

    // Display welcome message
    println!("\n=== TURN COMBAT ===");
    println!("{}", encounter.name);
    if !encounter.description.is_empty() {
        println!("{}", encounter.description);
    }
    print_help();

    let (command_tx, mut command_rx) = mpsc::channel(8);
    let mut encounter_task = tokio::spawn(async move {
        manager
            .run_encounter(&encounter, &mut command_rx, ConsoleLog)
            .await
    });
    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            joined = &mut encounter_task => {
                match joined {
                    Ok(Ok(report)) => {
                        println!();
                        println!("Encounter over: {:?} after {} turn(s)", report.outcome, report.turns);
                        for survivor in &report.survivors {
                            println!("  {} is still standing", survivor.identity.name);
                        }
                    }
                    Ok(Err(e)) => println!("Encounter failed: {}", e),
                    Err(e) => println!("Encounter task failed: {}", e),
                }
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => console.show(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "display fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                }
            }
            line = lines.recv(), if stdin_open => {
                let Some(line) = line else {
                    stdin_open = false;
                    stop.cancel();
                    continue;
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input == "quit" || input == "q" {
                    stop.cancel();
                    continue;
                }
                if let Some(command) = console.parse(input) {
                    if command_tx.send(command).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  abilities / a             - List your abilities and their cost");
    println!("  use <ability|#> [slot]    - Use an ability, optionally on left/center/right");
    println!("  target <slot> / t <slot>  - Pick the target for the ability being aimed");
    println!("  cancel / c                - Stop aiming");
    println!("  pass / p                  - End the turn without acting");
    println!("  status / s                - Show everyone's health and AP");
    println!("  quit / q                  - Leave the encounter");
    println!();
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

impl Console {
    fn show(&mut self, event: CombatEvent) {
        match event {
            CombatEvent::CombatStarted(roster) => {
                let names: Vec<&str> = roster.iter().map(|c| c.name.as_str()).collect();
                println!("Combatants: {}", names.join(", "));
            }
            CombatEvent::PhaseChanged(phase) => {
                if phase == CombatPhase::Targeting {
                    println!("Choose a target: target left|center|right (or cancel)");
                    prompt();
                }
            }
            CombatEvent::TurnOpened(snapshot) => {
                println!();
                println!("=== Turn {} ===", snapshot.turn);
                self.snapshot = Some(snapshot);
                self.print_status();
                prompt();
            }
            CombatEvent::SubmissionRejected(reason) => {
                println!("Can't do that: {}", reason);
                prompt();
            }
            CombatEvent::ActionResolved {
                caster,
                ability,
                outcome,
            } => {
                let name = self
                    .snapshot
                    .as_ref()
                    .and_then(|s| s.get(caster))
                    .map(|c| c.identity.name.clone())
                    .unwrap_or_else(|| caster.to_string());
                match outcome {
                    ExecutionOutcome::Executed { .. } => println!("{} used {}", name, ability),
                    ExecutionOutcome::Skipped(_) => {}
                    ExecutionOutcome::Failed { reason, .. } => {
                        println!("{}'s {} fizzled ({})", name, ability, reason)
                    }
                }
            }
            CombatEvent::CombatEnded(result) => match result {
                CombatResult::Victory => println!("\n*** VICTORY ***"),
                CombatResult::Defeat => println!("\n*** DEFEAT ***"),
                CombatResult::Ongoing => {}
            },
            CombatEvent::RewardSelectionRequested => {
                println!("Your upgrades await between encounters.");
            }
            _ => {}
        }
    }

    fn print_status(&self) {
        let Some(snapshot) = &self.snapshot else {
            println!("No combat in progress.");
            return;
        };
        for c in &snapshot.combatants {
            let slot = c
                .identity
                .slot
                .map(|s| format!("[{:?}] ", s).to_lowercase())
                .unwrap_or_default();
            let health = c
                .health
                .map(|h| format!("HP {}/{}", h.current, h.max))
                .unwrap_or_default();
            let ap = c
                .action_points
                .filter(|_| c.identity.side == Side::Player)
                .map(|a| format!("  AP {}/{}", a.current, a.max))
                .unwrap_or_default();
            let state = if c.is_alive() { "" } else { "  (down)" };
            println!("  {}{:<12} {}{}{}", slot, c.identity.name, health, ap, state);
        }
    }

    fn print_abilities(&self) {
        for (i, ability) in self.loadout.iter().enumerate() {
            let cost = self
                .upgrades
                .effective_ap_cost(ability.ap_cost, self.min_ap_cost);
            println!(
                "  {}. {:<14} {:>3} AP  speed {:>3}  {:?}",
                i + 1,
                ability.name,
                cost,
                ability.action_speed,
                ability.targeting
            );
        }
    }

    fn slot_target(&self, slot: PositionSlot) -> Option<CombatantId> {
        self.snapshot
            .as_ref()
            .and_then(|s| s.enemy_in_slot(slot))
            .map(|c| c.identity.id)
    }

    fn find_ability(&self, name: &str) -> Option<&Arc<Ability>> {
        if let Ok(index) = name.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| self.loadout.get(i));
        }
        self.loadout
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Turn a line into a command; prints and returns `None` for local commands
    fn parse(&self, input: &str) -> Option<PlayerCommand> {
        let mut words = input.split_whitespace();
        let verb = words.next()?;
        let rest: Vec<&str> = words.collect();

        match verb {
            "help" | "h" => {
                print_help();
                None
            }
            "status" | "s" => {
                self.print_status();
                None
            }
            "abilities" | "a" => {
                self.print_abilities();
                None
            }
            "pass" | "p" => Some(PlayerCommand::Pass),
            "cancel" | "c" => Some(PlayerCommand::CancelTargeting),
            "target" | "t" => {
                let slot = rest.first().and_then(|s| PositionSlot::parse(s));
                match slot.and_then(|s| self.slot_target(s)) {
                    Some(id) => Some(PlayerCommand::SelectTarget(id)),
                    None => {
                        println!("Usage: target left|center|right (an occupied slot)");
                        None
                    }
                }
            }
            "use" | "u" => {
                // Trailing slot is optional: "use second wind", "use slash left"
                let (name_words, slot) = match rest.split_last() {
                    Some((last, init)) if PositionSlot::parse(last).is_some() => {
                        (init.to_vec(), PositionSlot::parse(last))
                    }
                    _ => (rest.clone(), None),
                };
                let name = name_words.join(" ");
                let Some(ability) = self.find_ability(&name) else {
                    println!("Unknown ability '{}'. Type 'abilities' for the list.", name);
                    return None;
                };
                let target = match slot {
                    Some(slot) => match self.slot_target(slot) {
                        Some(id) => Some(id),
                        None => {
                            println!("Nobody stands in that slot.");
                            return None;
                        }
                    },
                    None => None,
                };
                Some(PlayerCommand::UseAbility {
                    ability: ability.name.clone(),
                    target,
                })
            }
            _ => {
                println!("Unknown command. Type 'help' for commands.");
                None
            }
        }
    }
}
