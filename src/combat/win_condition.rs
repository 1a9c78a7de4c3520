//! End-of-combat detection

use serde::{Deserialize, Serialize};

use crate::combat::state::CombatState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatResult {
    Ongoing,
    Victory,
    Defeat,
}

impl CombatResult {
    pub fn is_over(&self) -> bool {
        !matches!(self, CombatResult::Ongoing)
    }
}

/// Evaluate the roster
///
/// Defeat is checked first, so a mutual wipe is a defeat. A roster without a
/// player (or a player without health) counts as defeated. An empty enemy
/// list counts as already won.
pub fn check_combat_result(state: &CombatState) -> CombatResult {
    let player_alive = state.player().map_or(false, |p| state.is_active(p));
    if !player_alive {
        return CombatResult::Defeat;
    }

    if state.enemies().iter().all(|&e| !state.is_active(e)) {
        return CombatResult::Victory;
    }

    CombatResult::Ongoing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::Participant;
    use crate::core::types::{CombatantId, Side};

    fn roster(player_hp: i32, enemy_hp: &[i32]) -> (CombatState, CombatantId, Vec<CombatantId>) {
        let mut hero = Participant::new("Hero", Side::Player).with_health(100);
        if let Some(h) = hero.health.as_mut() {
            h.set(player_hp);
        }
        let hero_id = hero.id();
        let mut participants = vec![Some(hero)];
        let mut enemies = Vec::new();
        for (i, &hp) in enemy_hp.iter().enumerate() {
            let mut e = Participant::new(format!("E{}", i), Side::Enemy).with_health(50);
            if let Some(h) = e.health.as_mut() {
                h.set(hp);
            }
            enemies.push(e.id());
            participants.push(Some(e));
        }
        let mut state = CombatState::new();
        state.initialize(participants);
        (state, hero_id, enemies)
    }

    #[test]
    fn test_ongoing() {
        let (state, _, _) = roster(40, &[0, 10]);
        assert_eq!(check_combat_result(&state), CombatResult::Ongoing);
    }

    #[test]
    fn test_victory_when_all_enemies_down() {
        let (state, _, _) = roster(40, &[0, 0]);
        assert_eq!(check_combat_result(&state), CombatResult::Victory);
    }

    #[test]
    fn test_mutual_wipe_is_defeat() {
        let (state, _, _) = roster(0, &[0]);
        assert_eq!(check_combat_result(&state), CombatResult::Defeat);
    }

    #[test]
    fn test_missing_player_is_defeat() {
        let goblin = Participant::new("Goblin", Side::Enemy).with_health(10);
        let mut state = CombatState::new();
        state.initialize(vec![Some(goblin)]);
        assert_eq!(check_combat_result(&state), CombatResult::Defeat);
    }

    #[test]
    fn test_no_enemies_is_victory() {
        let (state, _, _) = roster(40, &[]);
        assert_eq!(check_combat_result(&state), CombatResult::Victory);
    }

    #[test]
    fn test_enemy_without_health_counts_as_defeated() {
        let hero = Participant::new("Hero", Side::Player).with_health(100);
        let totem = Participant::new("Totem", Side::Enemy);
        let mut state = CombatState::new();
        state.initialize(vec![Some(hero), Some(totem)]);
        assert_eq!(check_combat_result(&state), CombatResult::Victory);
    }
}
