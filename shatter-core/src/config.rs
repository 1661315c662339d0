//! Configuration for the progression core.
//!
//! Maps directly to `shatter.toml`. Every field has a default, so an empty
//! document yields the tuned values the game ships with.

use serde::{Deserialize, Serialize};

use crate::state::ResumePolicy;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShatterConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Base stats and progression tuning.
    #[serde(default)]
    pub stats: StatsConfig,
    /// Ability slot settings.
    #[serde(default)]
    pub abilities: AbilityConfig,
    /// Game-mode state machine settings.
    #[serde(default)]
    pub state: StateConfig,
    /// Save slot settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl ShatterConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ShatterError::Config` if the TOML is invalid or a tuning
    /// value is out of range.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::ShatterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Check that tuning values are usable.
    ///
    /// # Errors
    /// Returns `ShatterError::Config` naming the first bad field.
    pub fn validate(&self) -> crate::error::Result<()> {
        let s = &self.stats;
        if s.base_max_health <= 0.0 {
            return Err(crate::ShatterError::Config(
                "stats.base_max_health must be positive".to_string(),
            ));
        }
        if s.dream_damage_factor <= 0.0 || s.dream_defense_factor <= 0.0 {
            return Err(crate::ShatterError::Config(
                "stats.dream_*_factor must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&s.starting_energy_fraction) {
            return Err(crate::ShatterError::Config(
                "stats.starting_energy_fraction must be within [0, 1]".to_string(),
            ));
        }
        if self.abilities.max_active_slots == 0 {
            return Err(crate::ShatterError::Config(
                "abilities.max_active_slots must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Base stats and boost tuning for the player stat block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Max health before boosts.
    #[serde(default = "default_100")]
    pub base_max_health: f32,
    /// Attack damage before boosts.
    #[serde(default = "default_10")]
    pub base_damage: f32,
    /// Defense before boosts.
    #[serde(default = "default_5")]
    pub base_defense: f32,
    /// Move speed before boosts.
    #[serde(default = "default_5")]
    pub base_move_speed: f32,
    /// Memory energy regenerated per second before boosts.
    #[serde(default = "default_5")]
    pub base_energy_regen: f32,
    /// Memory energy capacity before boosts.
    #[serde(default = "default_100")]
    pub base_max_energy: f32,
    /// Damage multiplier applied while in the dream world.
    #[serde(default = "default_1_5")]
    pub dream_damage_factor: f32,
    /// Defense multiplier applied while in the dream world.
    #[serde(default = "default_1_2")]
    pub dream_defense_factor: f32,
    /// Boost granted per story phase of a collected core memory.
    #[serde(default = "default_0_05")]
    pub core_boost_per_phase: f32,
    /// Fraction of the boost sum that applies to move speed.
    #[serde(default = "default_0_5")]
    pub move_speed_boost_weight: f32,
    /// Fraction of defense subtracted from incoming damage.
    #[serde(default = "default_0_5")]
    pub defense_mitigation: f32,
    /// Floor on damage taken per hit.
    #[serde(default = "default_1")]
    pub minimum_damage: f32,
    /// Refill health when a core memory is collected.
    #[serde(default = "default_true")]
    pub heal_on_core_collect: bool,
    /// Energy a fresh session starts with, as a fraction of max.
    #[serde(default = "default_0_5")]
    pub starting_energy_fraction: f32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            base_max_health: 100.0,
            base_damage: 10.0,
            base_defense: 5.0,
            base_move_speed: 5.0,
            base_energy_regen: 5.0,
            base_max_energy: 100.0,
            dream_damage_factor: 1.5,
            dream_defense_factor: 1.2,
            core_boost_per_phase: 0.05,
            move_speed_boost_weight: 0.5,
            defense_mitigation: 0.5,
            minimum_damage: 1.0,
            heal_on_core_collect: true,
            starting_energy_fraction: 0.5,
        }
    }
}

/// Ability slot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilityConfig {
    /// Number of ability slots shown to the player.
    #[serde(default = "default_4")]
    pub max_active_slots: usize,
}

impl Default for AbilityConfig {
    fn default() -> Self {
        Self {
            max_active_slots: 4,
        }
    }
}

/// Game-mode state machine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateConfig {
    /// Where resuming from pause returns to.
    #[serde(default)]
    pub resume_policy: ResumePolicy,
}

/// Save slot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for the save database.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a checksum alongside each slot.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_0_05() -> f32 { 0.05 }
fn default_0_5() -> f32 { 0.5 }
fn default_1() -> f32 { 1.0 }
fn default_1_2() -> f32 { 1.2 }
fn default_1_5() -> f32 { 1.5 }
fn default_5() -> f32 { 5.0 }
fn default_10() -> f32 { 10.0 }
fn default_100() -> f32 { 100.0 }
fn default_4() -> usize { 4 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = ShatterConfig::from_toml("").expect("parse");
        assert!((config.stats.dream_damage_factor - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.abilities.max_active_slots, 4);
        assert_eq!(config.state.resume_policy, ResumePolicy::RestorePrevious);
    }

    #[test]
    fn partial_sections_override_single_fields() {
        let config = ShatterConfig::from_toml(
            r#"
            [stats]
            base_max_health = 150.0

            [state]
            resume_policy = "always_waking"
            "#,
        )
        .expect("parse");
        assert!((config.stats.base_max_health - 150.0).abs() < f32::EPSILON);
        assert!((config.stats.base_defense - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.state.resume_policy, ResumePolicy::AlwaysWaking);
    }

    #[test]
    fn zero_slots_is_rejected() {
        let err = ShatterConfig::from_toml("[abilities]\nmax_active_slots = 0\n");
        assert!(matches!(err, Err(crate::ShatterError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = ShatterConfig::from_toml("[stats\nbase_damage = ");
        assert!(matches!(err, Err(crate::ShatterError::Config(_))));
    }
}
