//! Combat flow integration tests
//!
//! Drive whole encounters through the public API: turn ordering, re-targeting,
//! allies and neutrals, seeded reproducibility.

use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::broadcast;

use turn_combat::ability::{Ability, AbilityCatalog, Damage, TargetingStyle};
use turn_combat::combat::{
    execute_action, Brain, BrainContext, BrainProfile, CombatEvent, CombatFlowOrchestrator,
    CombatLog, CombatPhase, CombatResult, CombatState, ExecutionOutcome, OpportunistBrain,
    PendingAction, SubmitOutcome, TurnResolution, UpgradeContext,
};
use turn_combat::combatant::Participant;
use turn_combat::core::config::CombatConfig;
use turn_combat::core::types::{CombatantId, Side};

/// Always uses its ability on the first opponent
struct Striker(Arc<Ability>);

impl Brain for Striker {
    fn choose_action(&self, ctx: &mut BrainContext<'_>) -> Option<PendingAction> {
        let target = ctx.opponents.first().copied();
        Some(PendingAction::new(self.0.clone(), ctx.me, target))
    }
}

fn strike(name: &str, cost: i32, speed: i32, damage: i32) -> Arc<Ability> {
    Arc::new(Ability::new(
        name,
        cost,
        TargetingStyle::SingleEnemy,
        speed,
        Damage::flat(damage),
    ))
}

fn config(seed: u64) -> CombatConfig {
    CombatConfig {
        event_capacity: 1024,
        ..CombatConfig::headless(seed)
    }
}

fn drain(rx: &mut broadcast::Receiver<CombatEvent>) -> Vec<CombatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn hero() -> Participant {
    Participant::new("Hero", Side::Player)
        .with_health(100)
        .with_action_points(100)
}

fn health(orch: &CombatFlowOrchestrator, id: CombatantId) -> i32 {
    orch.state().health(id).map(|h| h.current()).unwrap_or(-1)
}

/// Player slashes E1 dead; E2 survives and hits back; next turn opens
#[tokio::test]
async fn test_two_enemy_turn() {
    let mut orch = CombatFlowOrchestrator::new(config(1), UpgradeContext::default(), CombatLog::new());
    let mut rx = orch.subscribe();

    let hero = hero();
    let e1 = Participant::new("E1", Side::Enemy).with_health(30);
    let e2 = Participant::new("E2", Side::Enemy)
        .with_health(30)
        .with_action_points(30)
        .with_brain(Striker(strike("Stab", 10, 50, 5)));
    let (h, e1_id, e2_id) = (hero.id(), e1.id(), e2.id());
    orch.start_combat(vec![Some(hero), Some(e1), Some(e2)])
        .expect("combat starts");

    let outcome = orch
        .submit_player_action(Some(strike("Slash", 20, 150, 40)), Some(e1_id))
        .await
        .expect("turn runs");
    assert_eq!(outcome, SubmitOutcome::TurnResolved(TurnResolution::NextTurn));

    let events = drain(&mut rx);
    let casters: Vec<CombatantId> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::ActionResolved { caster, .. } => Some(*caster),
            _ => None,
        })
        .collect();
    assert_eq!(casters, vec![h, e2_id]);
    assert!(!orch.state().is_active(e1_id));
    assert_eq!(health(&orch, h), 95);
    assert_eq!(orch.state().action_points(h).map(|a| a.current()), Some(80));
    assert_eq!(orch.state().action_points(e2_id).map(|a| a.current()), Some(20));
    assert_eq!(orch.current_phase(), Some(CombatPhase::Selection));

    // Opening turn plus the one that followed
    let opened: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::TurnOpened(snapshot) => Some(snapshot.turn),
            _ => None,
        })
        .collect();
    assert_eq!(opened, vec![1, 2]);
}

#[test]
fn test_dead_target_retargets_to_healthiest() {
    let hero = hero();
    let mut e1 = Participant::new("E1", Side::Enemy).with_health(30);
    if let Some(h) = e1.health.as_mut() {
        h.set(0);
    }
    let e2 = Participant::new("E2", Side::Enemy).with_health(50);
    let e3 = Participant::new("E3", Side::Enemy).with_health(10);
    let (h, e1_id, e2_id) = (hero.id(), e1.id(), e2.id());

    let mut state = CombatState::new();
    let _ = state.initialize(vec![Some(hero), Some(e1), Some(e2), Some(e3)]);

    let action = PendingAction::new(strike("Slash", 20, 150, 40), h, Some(e1_id));
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut log = CombatLog::new();
    let outcome = execute_action(&action, &mut state, &UpgradeContext::default(), &mut log, &mut rng);

    assert_eq!(
        outcome,
        ExecutionOutcome::Executed {
            targets: vec![e2_id],
            retargeted_to: Some(e2_id),
        }
    );
    assert_eq!(state.health(e2_id).map(|p| p.current()), Some(10));
}

#[tokio::test]
async fn test_ally_finishes_the_fight() {
    let mut orch = CombatFlowOrchestrator::new(config(2), UpgradeContext::default(), CombatLog::new());
    let mut rx = orch.subscribe();

    let hero = hero();
    let squire = Participant::new("Squire", Side::Player)
        .with_health(40)
        .with_action_points(40)
        .with_brain(Striker(strike("Spear", 10, 70, 50)));
    let rat = Participant::new("Rat", Side::Enemy).with_health(20);
    let (squire_id, rat_id) = (squire.id(), rat.id());
    orch.start_combat(vec![Some(hero), Some(squire), Some(rat)])
        .expect("combat starts");

    let resolution = orch.pass_turn().await.expect("turn runs");
    assert_eq!(resolution, TurnResolution::Victory);
    assert_eq!(orch.outcome(), Some(CombatResult::Victory));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        CombatEvent::ActionResolved { caster, outcome: ExecutionOutcome::Executed { targets, .. }, .. }
            if *caster == squire_id && targets == &vec![rat_id]
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::RewardSelectionRequested)));
}

#[tokio::test]
async fn test_neutrals_do_not_block_victory() {
    let mut orch = CombatFlowOrchestrator::new(config(3), UpgradeContext::default(), CombatLog::new());

    let hero = hero();
    let crow = Participant::new("Crow", Side::Neutral)
        .with_health(5)
        .with_action_points(10)
        .with_brain(Striker(strike("Peck", 1, 300, 99)));
    let rat = Participant::new("Rat", Side::Enemy).with_health(20);
    let rat_id = rat.id();
    orch.start_combat(vec![Some(hero), Some(crow), Some(rat)])
        .expect("combat starts");
    assert_eq!(orch.enemies(), &[rat_id]);

    let outcome = orch
        .submit_player_action(Some(strike("Slash", 20, 150, 40)), Some(rat_id))
        .await
        .expect("turn runs");
    assert_eq!(outcome, SubmitOutcome::TurnResolved(TurnResolution::Victory));
    let last = orch.final_snapshot().expect("kept");
    assert_eq!(last.player().and_then(|p| p.health).map(|h| h.current), Some(100));
}

#[tokio::test]
async fn test_unknown_target_rejected() {
    let mut orch = CombatFlowOrchestrator::new(config(4), UpgradeContext::default(), CombatLog::new());
    let rat = Participant::new("Rat", Side::Enemy).with_health(20);
    orch.start_combat(vec![Some(hero()), Some(rat)]).expect("starts");

    let err = orch
        .submit_player_action(Some(strike("Slash", 20, 150, 40)), Some(CombatantId::new()))
        .await
        .expect_err("stranger is not a target");
    assert!(err.to_string().contains("not in this combat"));
    assert_eq!(orch.state().action_points(orch.player().expect("player")).map(|a| a.current()), Some(100));
    assert_eq!(orch.current_phase(), Some(CombatPhase::Selection));
}

/// Scripted fight with catalog abilities and real brains
async fn scripted_fight(seed: u64) -> (Option<CombatResult>, u32, Vec<(String, i32)>) {
    let catalog = AbilityCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/abilities.toml"))
        .expect("catalog loads");
    let slash = catalog.require("Slash").expect("slash");
    let claw = catalog.require("Claw").expect("claw");
    let stab = catalog.require("Rusty Stab").expect("stab");

    let upgrades = UpgradeContext {
        action_point_regen: 20,
        ..UpgradeContext::default()
    };
    let mut orch = CombatFlowOrchestrator::new(config(seed), upgrades, CombatLog::new());
    let wolf = Participant::new("Wolf", Side::Enemy)
        .with_health(45)
        .with_action_points(60)
        .with_brain(OpportunistBrain::new(vec![claw.clone()], BrainProfile::default()));
    let bandit = Participant::new("Bandit", Side::Enemy)
        .with_health(70)
        .with_action_points(60)
        .with_brain(OpportunistBrain::new(vec![claw, stab], BrainProfile::default()));
    orch.start_combat(vec![Some(hero()), Some(wolf), Some(bandit)])
        .expect("starts");

    let mut last = None;
    while orch.is_active() && orch.turn() < 40 {
        let target = orch
            .enemies()
            .iter()
            .copied()
            .find(|&e| orch.state().is_active(e));
        let submitted = orch.submit_player_action(Some(slash.clone()), target).await;
        if submitted.is_err() {
            orch.pass_turn().await.expect("pass runs");
        }
        last = orch.final_snapshot().cloned();
    }

    let survivors = last
        .map(|snapshot| {
            snapshot
                .combatants
                .iter()
                .map(|c| (c.identity.name.clone(), c.health.map(|h| h.current).unwrap_or(0)))
                .collect()
        })
        .unwrap_or_default();
    (orch.outcome(), orch.turn(), survivors)
}

#[tokio::test]
async fn test_fight_reaches_an_end() {
    let (outcome, turns, survivors) = scripted_fight(11).await;
    assert!(outcome.is_some(), "fight ended within {} turns", turns);
    assert_eq!(survivors.len(), 3);
}

#[tokio::test]
async fn test_same_seed_same_fight() {
    let first = scripted_fight(99).await;
    let second = scripted_fight(99).await;
    assert_eq!(first, second);
}
