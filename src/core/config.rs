//! Combat flow configuration
//!
//! Pacing and reproducibility knobs for an encounter. Content balance (damage,
//! costs, health pools) lives in the data files, not here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CombatError, Result};

/// Configuration for the combat flow orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    // === PACING ===
    /// Pause after each executed action (milliseconds)
    ///
    /// Gives presentation a window to play hit reactions before the next
    /// action resolves. Zero is valid and used by headless runs and tests.
    pub action_delay_ms: u64,

    // === DETERMINISM ===
    /// Seed for the encounter RNG
    ///
    /// Drives random target subsets, crit/miss rolls and brain hesitation.
    /// `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    // === EVENTS ===
    /// Buffered events per subscriber before slow subscribers start lagging
    pub event_capacity: usize,

    // === COSTS ===
    /// Floor for a player ability's AP cost after upgrade reductions
    pub min_ap_cost: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            action_delay_ms: 1000,
            rng_seed: None,
            event_capacity: 64,
            min_ap_cost: 1,
        }
    }
}

impl CombatConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config for headless runs: no pacing delay, fixed seed
    pub fn headless(seed: u64) -> Self {
        Self {
            action_delay_ms: 0,
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn action_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.action_delay_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(CombatError::InvalidConfig(
                "event_capacity must be at least 1".into(),
            ));
        }

        // A zero floor would let fully-reduced abilities cost nothing
        if self.min_ap_cost < 1 {
            return Err(CombatError::InvalidConfig(format!(
                "min_ap_cost ({}) must be >= 1",
                self.min_ap_cost
            )));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: CombatConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file (see `data/combat.toml`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CombatConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.action_delay_ms, 1000);
        assert_eq!(config.min_ap_cost, 1);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CombatConfig {
            event_capacity: 0,
            ..CombatConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CombatError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = CombatConfig::from_toml_str("action_delay_ms = 250\nrng_seed = 7\n")
            .expect("valid toml");
        assert_eq!(config.action_delay_ms, 250);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_invalid_toml_value_rejected() {
        let result = CombatConfig::from_toml_str("min_ap_cost = 0\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_data_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/combat.toml");
        let config = CombatConfig::load(path).expect("Should load data/combat.toml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_headless_has_no_delay() {
        let config = CombatConfig::headless(3);
        assert_eq!(config.action_delay(), std::time::Duration::ZERO);
        assert_eq!(config.rng_seed, Some(3));
    }
}
