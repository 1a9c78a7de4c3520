pub mod config;
pub mod error;
pub mod types;

pub use config::CombatConfig;
pub use error::{CombatError, RejectReason, Result};
pub use types::{ArenaId, CombatantId, PositionSlot, Side};
