//! Headless Encounter Runner
//!
//! Plays an encounter with the auto-player and prints a report. Useful for
//! balancing data files and for reproducing a seed.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tokio::sync::mpsc;

use turn_combat::ability::AbilityCatalog;
use turn_combat::combat::{LogSink, SharedLog, TracingLogSink, UpgradeContext};
use turn_combat::core::config::CombatConfig;
use turn_combat::core::error::Result;
use turn_combat::encounter::{
    AutoPlayer, CombatEncounterManager, EncounterDefinition, EncounterReport, PlayerTemplate,
    TemplateArenaProvider,
};

/// Headless Encounter Runner - auto-played encounters for balancing
#[derive(Parser, Debug)]
#[command(name = "encounter_runner")]
#[command(about = "Run an encounter with an automatic player and report the outcome")]
struct Args {
    /// Encounter name (loaded from <data-dir>/encounters/<name>.toml)
    #[arg(long, default_value = "goblin_ambush")]
    encounter: String,

    /// Directory holding combat.toml, upgrades.toml, abilities.toml, player.toml
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Turns before the run is abandoned
    #[arg(long, default_value_t = 50)]
    max_turns: u32,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Echo the narrative combat log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunResult {
    #[serde(flatten)]
    report: EncounterReport,
    seed: u64,
    log: Vec<String>,
}

/// Narrative sink that keeps the log and optionally echoes it
struct RunnerLog {
    shared: SharedLog,
    echo: Option<TracingLogSink>,
}

impl LogSink for RunnerLog {
    fn record(&mut self, category: turn_combat::combat::LogCategory, message: String) {
        if let Some(echo) = self.echo.as_mut() {
            echo.record(category, message.clone());
        }
        self.shared.record(category, message);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        "turn_combat=info,combat_log=info"
    } else {
        "turn_combat=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = CombatConfig::load(args.data_dir.join("combat.toml"))?;
    config.action_delay_ms = 0;
    config.rng_seed = Some(seed);
    config.validate()?;

    let upgrades = UpgradeContext::load(args.data_dir.join("upgrades.toml"))?;
    let catalog = AbilityCatalog::load(args.data_dir.join("abilities.toml"))?;
    let player = PlayerTemplate::load(args.data_dir.join("player.toml"))?;
    let encounter = EncounterDefinition::load(
        args.data_dir
            .join("encounters")
            .join(format!("{}.toml", args.encounter)),
    )?;

    let loadout = catalog.loadout(&player.abilities)?;
    let auto = AutoPlayer::new(loadout, upgrades.clone(), config.min_ap_cost);
    let provider = TemplateArenaProvider::new(catalog.clone(), player, 1);
    let mut manager = CombatEncounterManager::new(provider, catalog, config.clone(), upgrades);

    let (tx, mut rx) = mpsc::channel(8);
    let driver = tokio::spawn(auto.drive(manager.subscribe(), tx, args.max_turns, manager.stop_handle()));

    let log = SharedLog::new();
    let sink = RunnerLog {
        shared: log.clone(),
        echo: args.verbose.then_some(TracingLogSink),
    };
    let report = manager.run_encounter(&encounter, &mut rx, sink).await?;
    driver.abort();

    let result = RunResult {
        report,
        seed,
        log: log.snapshot().messages().map(str::to_string).collect(),
    };

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            println!("Encounter Result");
            println!("================");
            println!("Encounter: {}", result.report.encounter);
            println!("Outcome:   {:?}", result.report.outcome);
            println!("Turns:     {}", result.report.turns);
            println!("Seed:      {}", result.seed);
            println!();
            println!("Survivors:");
            for survivor in &result.report.survivors {
                let health = survivor
                    .health
                    .map(|h| format!("{}/{}", h.current, h.max))
                    .unwrap_or_else(|| "-".to_string());
                println!("  {} ({:?}) HP {}", survivor.identity.name, survivor.identity.side, health);
            }
            if args.verbose {
                println!();
                println!("Log:");
                for line in &result.log {
                    println!("  {}", line);
                }
            }
        }
    }
    Ok(())
}
