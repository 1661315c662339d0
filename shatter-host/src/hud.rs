//! HUD view model.
//!
//! A plain, owned snapshot of everything the HUD draws. Presentation code
//! captures one per frame and never reaches into the core directly.

use shatter_core::{GameState, PlayerState, WorldContext};

use crate::session::GameSession;

/// One ability slot as the HUD shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    /// Ability display name.
    pub name: String,
    /// Energy per use.
    pub energy_cost: f32,
    /// Seconds of cooldown left.
    pub cooldown_remaining: f32,
    /// Whether current energy covers the cost.
    pub affordable: bool,
}

/// Everything the HUD needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HudSnapshot {
    pub state: GameState,
    pub world: WorldContext,
    pub player: PlayerState,
    pub health: f32,
    pub max_health: f32,
    pub energy: f32,
    pub max_energy: f32,
    /// Collected core memories over total, in `[0, 1]`.
    pub story_progress: f32,
    pub collected_core: usize,
    pub total_core: usize,
    pub slots: Vec<SlotView>,
    /// Fade amount while in `Transition`.
    pub transition_progress: Option<f32>,
    /// Seconds until resonance can be used again.
    pub resonance_cooldown: f32,
    pub resonance_active: bool,
}

impl HudSnapshot {
    /// Read the session.
    #[must_use]
    pub fn capture(session: &GameSession) -> Self {
        let core = session.coordinator();
        let stats = core.stats();
        let energy = core.energy();

        let slots = core
            .abilities()
            .active_set()
            .map(|ability| SlotView {
                name: ability.name.clone(),
                energy_cost: ability.energy_cost,
                cooldown_remaining: session.cooldown_remaining(&ability.id),
                affordable: ability.can_use(energy.current()),
            })
            .collect();

        Self {
            state: core.state(),
            world: core.world_context(),
            player: core.player_state(),
            health: stats.current_health(),
            max_health: stats.max_health(),
            energy: energy.current(),
            max_energy: energy.max(),
            story_progress: core.progress(),
            collected_core: core.store().collected_core_count(),
            total_core: core.store().total_core_count(),
            slots,
            transition_progress: session.timer().progress(),
            resonance_cooldown: session.resonance().cooldown_remaining(),
            resonance_active: session.resonance().is_active(),
        }
    }

    /// Health over max in `[0, 1]`.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use crate::triggers::HostInput;
    use shatter_core::memory::{AbilityDefinition, MemoryCatalog, MemoryRecord};

    #[test]
    fn capture_reflects_session() {
        let catalog = MemoryCatalog {
            memories: vec![
                MemoryRecord::core("core_a", "A", 2),
                MemoryRecord::core("core_b", "B", 1),
                MemoryRecord::skill(
                    "skill_glow",
                    "Glow",
                    AbilityDefinition::new("glow", "Glow", 80.0).usable_while_awake(),
                ),
            ],
        };
        let mut session = GameSession::new(HostConfig::default(), catalog).expect("session");
        session.handle(HostInput::StartGame).expect("start");
        session.handle(HostInput::touch("core_a")).expect("touch");
        session.handle(HostInput::touch("skill_glow")).expect("touch");
        session.handle(HostInput::DamageTaken(20.0)).expect("hit");

        let hud = HudSnapshot::capture(&session);
        assert_eq!(hud.state, GameState::Waking);
        assert_eq!((hud.collected_core, hud.total_core), (1, 2));
        assert!((hud.story_progress - 0.5).abs() < f32::EPSILON);
        assert!((hud.max_health - 110.0).abs() < 1e-4);
        assert!(hud.health < hud.max_health);
        assert_eq!(hud.slots.len(), 1);
        assert!(!hud.slots[0].affordable);
        assert!(hud.transition_progress.is_none());
        assert_eq!(hud.player, PlayerState::Normal);
        assert!(!hud.resonance_active);
        assert!(hud.health_fraction() > 0.0 && hud.health_fraction() < 1.0);
    }
}
