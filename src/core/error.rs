use thiserror::Error;

use crate::combat::phase::CombatPhase;
use crate::core::types::CombatantId;

/// Why a player submission was turned down.
///
/// None of these change combat state; the player stays in the phase they were in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    WrongPhase(CombatPhase),
    NoAbility,
    NoPendingAbility,
    NotInitialized,
    NoPlayer,
    NoActionPoints,
    InsufficientActionPoints { required: i32, available: i32 },
    MissingTarget,
    UnknownTarget(CombatantId),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::WrongPhase(phase) => write!(f, "cannot act during {:?}", phase),
            RejectReason::NoAbility => write!(f, "no ability selected"),
            RejectReason::NoPendingAbility => write!(f, "no ability is waiting for a target"),
            RejectReason::NotInitialized => write!(f, "combat is not initialized"),
            RejectReason::NoPlayer => write!(f, "no player combatant"),
            RejectReason::NoActionPoints => write!(f, "player has no action point pool"),
            RejectReason::InsufficientActionPoints {
                required,
                available,
            } => write!(f, "needs {} AP, has {}", required, available),
            RejectReason::MissingTarget => write!(f, "ability needs a target"),
            RejectReason::UnknownTarget(id) => write!(f, "target {} is not in this combat", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum CombatError {
    #[error("Combat is not initialized")]
    CombatNotInitialized,

    #[error("No player combatant among participants")]
    PlayerNotFound,

    #[error("Action rejected: {0}")]
    ActionRejected(RejectReason),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition { from: CombatPhase, to: CombatPhase },

    #[error("Ability '{ability}' failed: {reason}")]
    AbilityFailed { ability: String, reason: String },

    #[error("Unknown ability: {0}")]
    UnknownAbility(String),

    #[error("Arena unavailable: {0}")]
    ArenaUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Combat cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl CombatError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CombatError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, CombatError>;
