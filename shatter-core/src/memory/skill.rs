//! Skill memories: "what I know how to do".
//!
//! Each skill memory carries exactly one ability. Abilities cost memory
//! energy, have a cooldown the host enforces, and are either usable in both
//! worlds or locked to the dream world.

use serde::{Deserialize, Serialize};

use crate::types::{AbilityId, WorldContext};

/// Energy cost never drops below this after upgrades.
const MIN_ENERGY_COST: f32 = 1.0;
/// Cooldown never drops below this after upgrades.
const MIN_COOLDOWN_SECS: f32 = 0.1;

/// An ability unlocked by a skill memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    /// Unique ability id.
    pub id: AbilityId,
    /// Display name.
    pub name: String,
    /// Tooltip text.
    #[serde(default)]
    pub description: String,
    /// Memory energy consumed per use.
    #[serde(default = "default_energy_cost")]
    pub energy_cost: f32,
    /// Seconds before the ability can be used again.
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: f32,
    /// Whether the ability also works outside the dream world.
    #[serde(default)]
    pub available_in_waking_world: bool,
}

impl AbilityDefinition {
    /// Create a dream-only ability with the default cooldown.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, energy_cost: f32) -> Self {
        Self {
            id: AbilityId::new(id),
            name: name.into(),
            description: String::new(),
            energy_cost,
            cooldown_secs: default_cooldown(),
            available_in_waking_world: false,
        }
    }

    /// Make the ability usable in the waking world too.
    #[must_use]
    pub fn usable_while_awake(mut self) -> Self {
        self.available_in_waking_world = true;
        self
    }

    /// Set the cooldown.
    #[must_use]
    pub fn with_cooldown(mut self, cooldown_secs: f32) -> Self {
        self.cooldown_secs = cooldown_secs;
        self
    }

    /// Whether the ability is usable in `context`.
    #[must_use]
    pub fn is_available_in(&self, context: WorldContext) -> bool {
        context.is_dream() || self.available_in_waking_world
    }

    /// Whether `current_energy` covers the cost.
    #[must_use]
    pub fn can_use(&self, current_energy: f32) -> bool {
        current_energy >= self.energy_cost
    }

    /// Apply an upgrade, flooring cost and cooldown.
    pub fn apply_upgrade(&mut self, upgrade: &AbilityUpgrade) {
        self.energy_cost = (self.energy_cost - upgrade.energy_cost_reduction).max(MIN_ENERGY_COST);
        self.cooldown_secs = (self.cooldown_secs - upgrade.cooldown_reduction).max(MIN_COOLDOWN_SECS);
    }
}

/// Payload of a skill memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillPayload {
    /// The ability this memory unlocks.
    pub ability: AbilityDefinition,
}

/// A reduction applied to an unlocked ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityUpgrade {
    /// Upgrade id.
    pub id: String,
    /// Ability the upgrade applies to.
    pub target: AbilityId,
    /// Energy cost reduction.
    #[serde(default)]
    pub energy_cost_reduction: f32,
    /// Cooldown reduction in seconds.
    #[serde(default)]
    pub cooldown_reduction: f32,
}

fn default_energy_cost() -> f32 {
    20.0
}

fn default_cooldown() -> f32 {
    5.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dream_only_ability_is_locked_while_awake() {
        let ability = AbilityDefinition::new("veil", "Veil Step", 20.0);
        assert!(!ability.is_available_in(WorldContext::Waking));
        assert!(ability.is_available_in(WorldContext::Dream));
        assert!(ability.usable_while_awake().is_available_in(WorldContext::Waking));
    }

    #[test]
    fn upgrades_floor_cost_and_cooldown() {
        let mut ability = AbilityDefinition::new("veil", "Veil Step", 20.0).with_cooldown(1.0);
        ability.apply_upgrade(&AbilityUpgrade {
            id: "veil_plus".to_string(),
            target: AbilityId::from("veil"),
            energy_cost_reduction: 50.0,
            cooldown_reduction: 5.0,
        });
        assert!((ability.energy_cost - 1.0).abs() < f32::EPSILON);
        assert!((ability.cooldown_secs - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn can_use_is_inclusive() {
        let ability = AbilityDefinition::new("veil", "Veil Step", 20.0);
        assert!(ability.can_use(20.0));
        assert!(!ability.can_use(19.9));
    }
}
