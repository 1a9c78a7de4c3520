//! Presentation-side capabilities a combatant may expose
//!
//! The combat core only pokes these; it never depends on them for correctness.

/// Plays a caster-side animation when an ability goes off
pub trait CastAnimator: Send + Sync {
    fn play_cast(&self, ability_name: &str);
}

/// Whether an enemy can currently be clicked/tapped as a target
pub trait TargetSelectable: Send + Sync {
    fn set_collider_active(&mut self, active: bool);
}
