//! Ability registry: abilities unlocked through skill memories.
//!
//! Unlock order is the order of first insertion and never changes, even when
//! an ability is re-unlocked or upgraded. The active set is the first
//! `max_active_slots` unlocked abilities usable in the current world context;
//! anything beyond the slot count is silently dropped.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{Result, ShatterError};
use crate::memory::{AbilityDefinition, AbilityUpgrade, MemoryRecord};
use crate::types::{AbilityId, MemoryId, WorldContext};

/// Receipt for a successful ability use.
///
/// The registry does not own energy or timers: the caller deducts `cost`
/// and starts a cooldown of `cooldown_secs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityUse {
    /// Energy to deduct.
    pub cost: f32,
    /// Cooldown to apply, in seconds.
    pub cooldown_secs: f32,
}

#[derive(Debug, Clone)]
struct UnlockedAbility {
    definition: AbilityDefinition,
    source: MemoryId,
}

/// Unlocked abilities plus the active subset for the current context.
#[derive(Debug, Clone)]
pub struct AbilityRegistry {
    unlocked: Vec<UnlockedAbility>,
    index: HashMap<AbilityId, usize>,
    active: Vec<AbilityId>,
    context: WorldContext,
    max_active_slots: usize,
}

impl AbilityRegistry {
    /// Create an empty registry in the waking context.
    #[must_use]
    pub fn new(max_active_slots: usize) -> Self {
        Self {
            unlocked: Vec::new(),
            index: HashMap::new(),
            active: Vec::new(),
            context: WorldContext::Waking,
            max_active_slots,
        }
    }

    /// Unlock the ability carried by a skill memory.
    ///
    /// Returns `true` on first unlock. Re-unlocking replaces the definition
    /// in place without moving it in unlock order. Non-skill records are
    /// ignored. Does not recompute the active set.
    pub fn unlock_from_skill_memory(&mut self, record: &MemoryRecord) -> bool {
        let Some(ability) = record.ability() else {
            debug!(memory = %record.id, "Not a skill memory; nothing to unlock");
            return false;
        };

        if let Some(&slot) = self.index.get(&ability.id) {
            debug!(ability = %ability.id, "Ability already unlocked; definition replaced");
            self.unlocked[slot].definition = ability.clone();
            return false;
        }

        info!(ability = %ability.id, memory = %record.id, "Ability unlocked");
        self.index.insert(ability.id.clone(), self.unlocked.len());
        self.unlocked.push(UnlockedAbility {
            definition: ability.clone(),
            source: record.id.clone(),
        });
        true
    }

    /// Rebuild the active set for `context`.
    pub fn recompute_active_set(&mut self, context: WorldContext) {
        self.context = context;
        self.active = self
            .unlocked
            .iter()
            .filter(|a| a.definition.is_available_in(context))
            .take(self.max_active_slots)
            .map(|a| a.definition.id.clone())
            .collect();
        debug!(?context, active = self.active.len(), "Active ability set recomputed");
    }

    /// Active abilities in slot order.
    pub fn active_set(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.active.iter().filter_map(|id| self.get(id))
    }

    /// Number of active abilities.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether `id` is in the active set.
    #[must_use]
    pub fn is_active(&self, id: &AbilityId) -> bool {
        self.active.contains(id)
    }

    /// The active ability in `slot`, if any.
    #[must_use]
    pub fn ability_in_slot(&self, slot: usize) -> Option<&AbilityDefinition> {
        self.active.get(slot).and_then(|id| self.get(id))
    }

    /// All unlocked abilities in unlock order.
    pub fn unlocked(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.unlocked.iter().map(|a| &a.definition)
    }

    /// The skill memory that unlocked `id`.
    #[must_use]
    pub fn source_of(&self, id: &AbilityId) -> Option<&MemoryId> {
        self.index.get(id).map(|&slot| &self.unlocked[slot].source)
    }

    /// Look up an unlocked ability.
    #[must_use]
    pub fn get(&self, id: &AbilityId) -> Option<&AbilityDefinition> {
        self.index.get(id).map(|&slot| &self.unlocked[slot].definition)
    }

    /// Whether `id` is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, id: &AbilityId) -> bool {
        self.index.contains_key(id)
    }

    /// Whether `energy` covers the cost of `id`. Unknown ids are never usable.
    #[must_use]
    pub fn can_use(&self, id: &AbilityId, energy: f32) -> bool {
        self.get(id).is_some_and(|a| a.can_use(energy))
    }

    /// Check an ability use.
    ///
    /// # Errors
    /// - [`ShatterError::AbilityNotFound`] if `id` is not unlocked.
    /// - [`ShatterError::AbilityUnavailable`] if it is not in the active set.
    /// - [`ShatterError::InsufficientEnergy`] if `energy` is below the cost.
    pub fn use_ability(&self, id: &AbilityId, energy: f32) -> Result<AbilityUse> {
        let ability = self
            .get(id)
            .ok_or_else(|| ShatterError::AbilityNotFound(id.clone()))?;

        if !self.is_active(id) {
            warn!(ability = %id, context = ?self.context, "Ability not active");
            return Err(ShatterError::AbilityUnavailable(id.clone()));
        }

        if !ability.can_use(energy) {
            warn!(ability = %id, required = ability.energy_cost, available = energy, "Not enough energy");
            return Err(ShatterError::InsufficientEnergy {
                ability: id.clone(),
                required: ability.energy_cost,
                available: energy,
            });
        }

        Ok(AbilityUse {
            cost: ability.energy_cost,
            cooldown_secs: ability.cooldown_secs,
        })
    }

    /// Apply an upgrade to an unlocked ability.
    ///
    /// # Errors
    /// Returns [`ShatterError::AbilityNotFound`] if the target is not unlocked.
    pub fn apply_upgrade(&mut self, upgrade: &AbilityUpgrade) -> Result<()> {
        let slot = *self
            .index
            .get(&upgrade.target)
            .ok_or_else(|| ShatterError::AbilityNotFound(upgrade.target.clone()))?;
        let ability = &mut self.unlocked[slot].definition;
        ability.apply_upgrade(upgrade);
        info!(
            ability = %upgrade.target,
            upgrade = %upgrade.id,
            energy_cost = ability.energy_cost,
            cooldown_secs = ability.cooldown_secs,
            "Ability upgraded"
        );
        Ok(())
    }

    /// Context the active set was last computed for.
    #[must_use]
    pub fn context(&self) -> WorldContext {
        self.context
    }

    /// Forget every unlock (new game).
    pub fn reset(&mut self) {
        self.unlocked.clear();
        self.index.clear();
        self.active.clear();
        self.context = WorldContext::Waking;
    }
}

impl Default for AbilityRegistry {
    fn default() -> Self {
        Self::new(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(n: usize, awake: bool) -> MemoryRecord {
        let mut ability = AbilityDefinition::new(format!("a{n}"), format!("Ability {n}"), 10.0);
        ability.available_in_waking_world = awake;
        MemoryRecord::skill(format!("s{n}"), format!("Skill {n}"), ability)
    }

    #[test]
    fn dream_only_abilities_fill_slots_in_unlock_order() {
        let mut registry = AbilityRegistry::new(4);
        for n in 0..5 {
            assert!(registry.unlock_from_skill_memory(&skill(n, false)));
        }
        registry.recompute_active_set(WorldContext::Waking);
        assert_eq!(registry.active_count(), 0);

        registry.recompute_active_set(WorldContext::Dream);
        let ids: Vec<_> = registry.active_set().map(|a| a.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a0", "a1", "a2", "a3"]);
    }

    #[test]
    fn unlock_is_idempotent_and_keeps_order() {
        let mut registry = AbilityRegistry::new(4);
        registry.unlock_from_skill_memory(&skill(0, true));
        registry.unlock_from_skill_memory(&skill(1, true));
        assert!(!registry.unlock_from_skill_memory(&skill(0, true)));
        let ids: Vec<_> = registry.unlocked().map(|a| a.id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["a0", "a1"]);
    }

    #[test]
    fn non_skill_records_are_ignored() {
        let mut registry = AbilityRegistry::new(4);
        assert!(!registry.unlock_from_skill_memory(&MemoryRecord::core("c1", "Core", 1)));
        assert_eq!(registry.unlocked().count(), 0);
    }

    #[test]
    fn use_ability_reports_each_failure() {
        let mut registry = AbilityRegistry::new(4);
        registry.unlock_from_skill_memory(&skill(0, false));
        registry.recompute_active_set(WorldContext::Waking);
        let id = AbilityId::from("a0");

        assert!(matches!(
            registry.use_ability(&AbilityId::from("zzz"), 100.0),
            Err(ShatterError::AbilityNotFound(_))
        ));
        assert!(matches!(
            registry.use_ability(&id, 100.0),
            Err(ShatterError::AbilityUnavailable(_))
        ));

        registry.recompute_active_set(WorldContext::Dream);
        assert!(matches!(
            registry.use_ability(&id, 5.0),
            Err(ShatterError::InsufficientEnergy { .. })
        ));
        let receipt = registry.use_ability(&id, 10.0).expect("use");
        assert!((receipt.cost - 10.0).abs() < f32::EPSILON);
        assert!((receipt.cooldown_secs - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn slots_and_upgrades() {
        let mut registry = AbilityRegistry::new(2);
        for n in 0..3 {
            registry.unlock_from_skill_memory(&skill(n, true));
        }
        registry.recompute_active_set(WorldContext::Waking);
        assert_eq!(registry.ability_in_slot(1).map(|a| a.id.as_str()), Some("a1"));
        assert!(registry.ability_in_slot(2).is_none());
        assert_eq!(registry.source_of(&AbilityId::from("a2")), Some(&MemoryId::from("s2")));

        registry
            .apply_upgrade(&AbilityUpgrade {
                id: "cheaper".to_string(),
                target: AbilityId::from("a0"),
                energy_cost_reduction: 4.0,
                cooldown_reduction: 0.0,
            })
            .expect("upgrade");
        assert!(registry.can_use(&AbilityId::from("a0"), 6.0));
        assert!(!registry.can_use(&AbilityId::from("a1"), 6.0));
    }
}
