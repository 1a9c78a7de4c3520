//! Encounter integration tests
//!
//! Play the shipped data files end to end with the auto-player.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use turn_combat::ability::AbilityCatalog;
use turn_combat::combat::{CombatLog, UpgradeContext};
use turn_combat::core::config::CombatConfig;
use turn_combat::core::types::Side;
use turn_combat::encounter::{
    AutoPlayer, CombatEncounterManager, EncounterDefinition, EncounterOutcome, EncounterReport,
    PlayerTemplate, TemplateArenaProvider,
};

fn data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

struct Content {
    catalog: AbilityCatalog,
    player: PlayerTemplate,
    upgrades: UpgradeContext,
}

fn content() -> Content {
    let data = data_dir();
    Content {
        catalog: AbilityCatalog::load(data.join("abilities.toml")).expect("abilities load"),
        player: PlayerTemplate::load(data.join("player.toml")).expect("player loads"),
        upgrades: UpgradeContext::load(data.join("upgrades.toml")).expect("upgrades load"),
    }
}

fn encounter(name: &str) -> EncounterDefinition {
    EncounterDefinition::load(data_dir().join("encounters").join(format!("{}.toml", name)))
        .expect("encounter loads")
}

async fn autoplay(name: &str, seed: u64) -> (EncounterReport, usize) {
    let Content {
        catalog,
        player,
        upgrades,
    } = content();
    let config = CombatConfig {
        event_capacity: 1024,
        ..CombatConfig::headless(seed)
    };

    let loadout = catalog.loadout(&player.abilities).expect("loadout resolves");
    let auto = AutoPlayer::new(loadout, upgrades.clone(), config.min_ap_cost);
    let provider = TemplateArenaProvider::new(catalog.clone(), player, 1);
    let mut manager = CombatEncounterManager::new(provider, catalog, config, upgrades);

    let (tx, mut rx) = mpsc::channel(8);
    let driver = tokio::spawn(auto.drive(manager.subscribe(), tx, 60, manager.stop_handle()));
    let report = manager
        .run_encounter(&encounter(name), &mut rx, CombatLog::new())
        .await
        .expect("encounter runs");
    driver.abort();

    (report, manager.provider().available())
}

#[test]
fn test_every_encounter_file_loads() {
    let catalog = content().catalog;
    let provider = TemplateArenaProvider::new(catalog, content().player, 1);

    let entries = std::fs::read_dir(data_dir().join("encounters")).expect("encounters dir");
    let mut loaded = 0;
    for entry in entries {
        let path = entry.expect("dir entry").path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let definition = EncounterDefinition::load(&path).expect("encounter parses");
        let participants = provider
            .build_participants(&definition)
            .expect("abilities resolve");
        let player_count = participants
            .iter()
            .flatten()
            .filter(|p| p.identity.side == Side::Player)
            .count();
        assert!(player_count >= 1, "{} has a player", definition.name);
        loaded += 1;
    }
    assert!(loaded >= 2);
}

#[test]
fn test_player_loadout_exists_in_catalog() {
    let Content { catalog, player, .. } = content();
    let loadout = catalog.loadout(&player.abilities).expect("every ability known");
    assert_eq!(loadout.len(), player.abilities.len());
}

#[tokio::test]
async fn test_goblin_ambush_plays_to_an_end() {
    for seed in [1, 7, 42] {
        let (report, available) = autoplay("goblin_ambush", seed).await;
        assert_ne!(
            report.outcome,
            EncounterOutcome::Aborted,
            "seed {} stalled after {} turns",
            seed,
            report.turns
        );
        assert!(report.turns >= 1);
        assert_eq!(available, 1, "arena returned to the pool");

        match report.outcome {
            EncounterOutcome::Victory => {
                assert!(report
                    .survivors
                    .iter()
                    .all(|c| c.identity.side != Side::Enemy));
            }
            EncounterOutcome::Defeat => {
                assert!(report
                    .survivors
                    .iter()
                    .all(|c| c.identity.side != Side::Player));
            }
            EncounterOutcome::Aborted => unreachable!(),
        }
    }
}

#[tokio::test]
async fn test_rat_cellar_is_won() {
    let (report, _) = autoplay("rat_cellar", 3).await;
    assert_eq!(report.outcome, EncounterOutcome::Victory);
    assert_eq!(report.encounter, "Rat Cellar");
    assert_eq!(report.survivors.len(), 1);
    assert_eq!(report.survivors[0].identity.name, "Hero");
}

#[tokio::test]
async fn test_report_serializes() {
    let (report, _) = autoplay("rat_cellar", 5).await;
    let json = serde_json::to_value(&report).expect("serializes");
    assert_eq!(json["outcome"], "victory");
    assert!(json["turns"].as_u64().unwrap_or(0) >= 1);
}
