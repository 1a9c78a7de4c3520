//! Turn Combat - Turn-Based Combat Flow Engine
//!
//! Selection, targeting, speed-ordered execution and win checks for a player
//! against up to three slotted enemies. Presentation hooks, AI brains and
//! arenas plug in through traits; everything observable goes out as events.

pub mod ability;
pub mod combat;
pub mod combatant;
pub mod core;
pub mod encounter;
