//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for combatants
///
/// Stable for the lifetime of an encounter. An id that is no longer in the
/// roster is a stale handle and is treated like a missing combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CombatantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First block of the uuid is plenty for log lines
        let full = self.0.simple().to_string();
        write!(f, "{}", &full[..8])
    }
}

/// Which side of the fight a combatant is on
///
/// Resolved once when the arena is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player,
    Enemy,
    /// Present in the roster but fights for no one
    Neutral,
}

impl Side {
    /// The side this side attacks, if any
    pub fn opposing(&self) -> Option<Side> {
        match self {
            Side::Player => Some(Side::Enemy),
            Side::Enemy => Some(Side::Player),
            Side::Neutral => None,
        }
    }
}

/// Arena placement, assigned once at arena setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSlot {
    Left,
    Center,
    Right,
}

impl PositionSlot {
    pub const ALL: [PositionSlot; 3] = [PositionSlot::Left, PositionSlot::Center, PositionSlot::Right];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" | "l" => Some(PositionSlot::Left),
            "center" | "centre" | "c" => Some(PositionSlot::Center),
            "right" | "r" => Some(PositionSlot::Right),
            _ => None,
        }
    }
}

/// Arena instance identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArenaId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combatant_id_unique() {
        let a = CombatantId::new();
        let b = CombatantId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_combatant_id_display_is_short() {
        let id = CombatantId::new();
        assert_eq!(id.to_string().len(), 8);
    }

    #[test]
    fn test_side_opposition() {
        assert_eq!(Side::Player.opposing(), Some(Side::Enemy));
        assert_eq!(Side::Enemy.opposing(), Some(Side::Player));
        assert_eq!(Side::Neutral.opposing(), None);
    }

    #[test]
    fn test_slot_parse() {
        assert_eq!(PositionSlot::parse("Left"), Some(PositionSlot::Left));
        assert_eq!(PositionSlot::parse(" c "), Some(PositionSlot::Center));
        assert_eq!(PositionSlot::parse("middle"), None);
    }
}
