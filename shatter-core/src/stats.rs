//! Player stat block: derived stats from base values, boosts and world
//! context.
//!
//! Derived stats are always recomputed from scratch:
//!
//! ```text
//! derived      = base × (1 + Σ boosts)
//! move_speed   = base × (1 + Σ boosts × move_speed_weight)
//! dream world  : damage × dream_damage_factor, defense × dream_defense_factor
//! ```
//!
//! Boosts are keyed by their source (usually a memory id), so re-applying the
//! same source replaces its value instead of stacking. They live in a
//! `BTreeMap` so the summation order, and therefore the float result, does
//! not depend on insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::StatsConfig;

/// Stats before any boost or world modifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Max health.
    pub max_health: f32,
    /// Attack damage.
    pub damage: f32,
    /// Defense.
    pub defense: f32,
    /// Move speed.
    pub move_speed: f32,
    /// Energy regenerated per second.
    pub energy_regen: f32,
    /// Energy capacity.
    pub max_energy: f32,
}

impl From<&StatsConfig> for BaseStats {
    fn from(config: &StatsConfig) -> Self {
        Self {
            max_health: config.base_max_health,
            damage: config.base_damage,
            defense: config.base_defense,
            move_speed: config.base_move_speed,
            energy_regen: config.base_energy_regen,
            max_energy: config.base_max_energy,
        }
    }
}

/// Stats after boosts and world modifiers.
pub type DerivedStats = BaseStats;

/// Constants that shape the recomputation and damage formulas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StatTuning {
    dream_damage_factor: f32,
    dream_defense_factor: f32,
    move_speed_boost_weight: f32,
    defense_mitigation: f32,
    minimum_damage: f32,
}

impl From<&StatsConfig> for StatTuning {
    fn from(config: &StatsConfig) -> Self {
        Self {
            dream_damage_factor: config.dream_damage_factor,
            dream_defense_factor: config.dream_defense_factor,
            move_speed_boost_weight: config.move_speed_boost_weight,
            defense_mitigation: config.defense_mitigation,
            minimum_damage: config.minimum_damage,
        }
    }
}

/// The player's stats for one session.
#[derive(Debug, Clone)]
pub struct PlayerStatBlock {
    base: BaseStats,
    tuning: StatTuning,
    boosts: BTreeMap<String, f32>,
    dream_active: bool,
    derived: DerivedStats,
    current_health: f32,
}

impl PlayerStatBlock {
    /// Create a stat block at full health with no boosts.
    #[must_use]
    pub fn new(config: &StatsConfig) -> Self {
        let base = BaseStats::from(config);
        Self {
            base,
            tuning: StatTuning::from(config),
            boosts: BTreeMap::new(),
            dream_active: false,
            derived: base,
            current_health: base.max_health,
        }
    }

    // ------------------------------------------------------------------
    // Boosts
    // ------------------------------------------------------------------

    /// Insert or replace the boost from `source` and recompute.
    ///
    /// Returns the previous amount for that source, if any.
    pub fn add_boost(&mut self, source: impl Into<String>, amount: f32) -> Option<f32> {
        let source = source.into();
        let previous = self.boosts.insert(source.clone(), amount);
        debug!(source = %source, amount, ?previous, "Stat boost upserted");
        self.recompute();
        previous
    }

    /// Remove the boost from `source` and recompute.
    pub fn remove_boost(&mut self, source: &str) -> Option<f32> {
        let removed = self.boosts.remove(source);
        if removed.is_some() {
            self.recompute();
        }
        removed
    }

    /// Replace every boost with `boosts` and recompute once.
    pub fn replace_boosts(&mut self, boosts: BTreeMap<String, f32>) {
        debug!(count = boosts.len(), "Stat boosts replaced");
        self.boosts = boosts;
        self.recompute();
    }

    /// Active boosts, sorted by source.
    #[must_use]
    pub fn boosts(&self) -> &BTreeMap<String, f32> {
        &self.boosts
    }

    /// Sum of all boost amounts.
    #[must_use]
    pub fn total_boost(&self) -> f32 {
        self.boosts.values().sum()
    }

    /// Boost multiplier applied to full-weight stats (`1 + Σ boosts`).
    #[must_use]
    pub fn damage_multiplier(&self) -> f32 {
        1.0 + self.total_boost()
    }

    // ------------------------------------------------------------------
    // Recomputation
    // ------------------------------------------------------------------

    /// Rebuild derived stats from base values, boosts and world context.
    ///
    /// Current health is clamped to the new max.
    pub fn recompute(&mut self) {
        let total = self.total_boost();
        let full = 1.0 + total;
        let speed = 1.0 + total * self.tuning.move_speed_boost_weight;

        let mut derived = DerivedStats {
            max_health: self.base.max_health * full,
            damage: self.base.damage * full,
            defense: self.base.defense * full,
            move_speed: self.base.move_speed * speed,
            energy_regen: self.base.energy_regen * full,
            max_energy: self.base.max_energy * full,
        };

        if self.dream_active {
            derived.damage *= self.tuning.dream_damage_factor;
            derived.defense *= self.tuning.dream_defense_factor;
        }

        self.derived = derived;
        self.current_health = self.current_health.clamp(0.0, self.max_health_bound());
    }

    /// Switch dream modifiers on or off.
    ///
    /// Returns `false` (and changes nothing) when already in the requested
    /// context, so repeated transitions cannot stack the multiplier.
    pub fn set_dream_context(&mut self, active: bool) -> bool {
        if self.dream_active == active {
            debug!(active, "Dream context unchanged");
            return false;
        }
        self.dream_active = active;
        self.recompute();
        true
    }

    /// Whether dream modifiers are applied.
    #[must_use]
    pub fn is_dream_context(&self) -> bool {
        self.dream_active
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Apply a hit and return the damage actually dealt.
    ///
    /// `actual = max(minimum_damage, amount − defense × mitigation)`.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let amount = if amount.is_nan() { 0.0 } else { amount };
        let mitigated = amount - self.derived.defense * self.tuning.defense_mitigation;
        let actual = mitigated.max(self.tuning.minimum_damage);
        let before = self.current_health;
        self.current_health = (self.current_health - actual).clamp(0.0, self.max_health_bound());
        before - self.current_health
    }

    /// Restore health and return the amount actually healed.
    ///
    /// Negative and NaN amounts heal nothing.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount).clamp(0.0, self.max_health_bound());
        self.current_health - before
    }

    /// Refill health to max.
    pub fn restore_to_full(&mut self) {
        self.current_health = self.max_health_bound();
    }

    /// Set health directly, clamped to `[0, max]`. Used when restoring saves.
    pub fn set_current_health(&mut self, health: f32) {
        let health = if health.is_nan() { 0.0 } else { health };
        self.current_health = health.clamp(0.0, self.max_health_bound());
    }

    /// Whether health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current_health <= 0.0
    }

    /// Current health.
    #[must_use]
    pub fn current_health(&self) -> f32 {
        self.current_health
    }

    /// Current health over max, in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        let max = self.max_health_bound();
        if max <= 0.0 { 0.0 } else { self.current_health / max }
    }

    // ------------------------------------------------------------------
    // Derived stat accessors
    // ------------------------------------------------------------------

    /// All derived stats.
    #[must_use]
    pub fn derived(&self) -> &DerivedStats {
        &self.derived
    }

    /// Base stats.
    #[must_use]
    pub fn base(&self) -> &BaseStats {
        &self.base
    }

    /// Max health.
    #[must_use]
    pub fn max_health(&self) -> f32 {
        self.derived.max_health
    }

    /// Attack damage.
    #[must_use]
    pub fn damage(&self) -> f32 {
        self.derived.damage
    }

    /// Defense.
    #[must_use]
    pub fn defense(&self) -> f32 {
        self.derived.defense
    }

    /// Move speed.
    #[must_use]
    pub fn move_speed(&self) -> f32 {
        self.derived.move_speed
    }

    /// Energy regenerated per second.
    #[must_use]
    pub fn energy_regen(&self) -> f32 {
        self.derived.energy_regen
    }

    /// Energy capacity.
    #[must_use]
    pub fn max_energy(&self) -> f32 {
        self.derived.max_energy
    }

    /// Drop all boosts, leave the dream world and refill health.
    pub fn reset(&mut self) {
        self.boosts.clear();
        self.dream_active = false;
        self.recompute();
        self.restore_to_full();
    }

    // Negative boost sums can push max health below zero; health stays >= 0.
    fn max_health_bound(&self) -> f32 {
        self.derived.max_health.max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Energy pool
// ---------------------------------------------------------------------------

/// Memory energy spent on abilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPool {
    current: f32,
    max: f32,
}

impl EnergyPool {
    /// Create a pool holding `fraction` of `max`.
    #[must_use]
    pub fn new(max: f32, fraction: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max * fraction.clamp(0.0, 1.0),
            max,
        }
    }

    /// Current energy.
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Capacity.
    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Change the capacity, clamping current energy to it.
    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.current = self.current.min(self.max);
    }

    /// Set current energy directly, clamped to `[0, max]`.
    pub fn set_current(&mut self, energy: f32) {
        let energy = if energy.is_nan() { 0.0 } else { energy };
        self.current = energy.clamp(0.0, self.max);
    }

    /// Add energy (pickups), returning the amount actually gained.
    pub fn add(&mut self, amount: f32) -> f32 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + amount).min(self.max);
        self.current - before
    }

    /// Regenerate at `rate` per second for `seconds`.
    pub fn regenerate(&mut self, rate: f32, seconds: f32) -> f32 {
        self.add(rate * seconds)
    }

    /// Deduct `cost` if affordable. Returns whether it was deducted.
    pub fn spend(&mut self, cost: f32) -> bool {
        if self.current < cost {
            return false;
        }
        self.current = (self.current - cost).max(0.0);
        true
    }
}
