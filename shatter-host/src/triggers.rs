//! Inputs the engine side feeds into a [`GameSession`](crate::session::GameSession).
//!
//! Each variant is one discrete thing that happened in the frame: the player
//! touched a memory pickup, used a sleep point, pressed an ability key, and
//! so on. Inputs are applied strictly in the order they are handed over.

use shatter_core::MemoryId;

/// A discrete input from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum HostInput {
    /// Title screen "start" or "continue".
    StartGame,
    /// The player touched a memory pickup, optionally guarded by a gate.
    MemoryTouched {
        /// The memory.
        memory: MemoryId,
        /// Hidden-trigger gate guarding it.
        gate: Option<String>,
    },
    /// The player used a sleep point.
    SleepPointUsed {
        /// Gate id of the sleep point.
        gate: String,
    },
    /// The player reached a dream exit.
    DreamExitReached {
        /// Gate id of the exit.
        gate: String,
    },
    /// Pause key pressed.
    PauseToggled,
    /// "Quit to menu" chosen from the pause menu.
    QuitToMenu,
    /// The player dismissed a flashback.
    FlashbackDismissed,
    /// The player was hit.
    DamageTaken(f32),
    /// The player picked up memory energy.
    EnergyPickup(f32),
    /// Ability key for `slot` pressed.
    AbilitySlotPressed(usize),
    /// A collected memory was opened from the journal.
    MemoryViewed(MemoryId),
    /// Memory resonance key pressed.
    ResonanceActivated,
    /// An enemy engaged the player.
    CombatStarted,
    /// The last enemy disengaged.
    CombatEnded,
    /// A cutscene or script took control of the character.
    PlayerDisabled,
    /// Control handed back to the player.
    PlayerEnabled,
}

impl HostInput {
    /// A memory pickup with no gate.
    #[must_use]
    pub fn touch(memory: impl Into<MemoryId>) -> Self {
        Self::MemoryTouched {
            memory: memory.into(),
            gate: None,
        }
    }

    /// A memory pickup behind a hidden-trigger gate.
    #[must_use]
    pub fn touch_hidden(memory: impl Into<MemoryId>, gate: impl Into<String>) -> Self {
        Self::MemoryTouched {
            memory: memory.into(),
            gate: Some(gate.into()),
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::MemoryTouched { .. } => "memory_touched",
            Self::SleepPointUsed { .. } => "sleep_point_used",
            Self::DreamExitReached { .. } => "dream_exit_reached",
            Self::PauseToggled => "pause_toggled",
            Self::QuitToMenu => "quit_to_menu",
            Self::FlashbackDismissed => "flashback_dismissed",
            Self::DamageTaken(_) => "damage_taken",
            Self::EnergyPickup(_) => "energy_pickup",
            Self::AbilitySlotPressed(_) => "ability_slot_pressed",
            Self::MemoryViewed(_) => "memory_viewed",
            Self::ResonanceActivated => "resonance_activated",
            Self::CombatStarted => "combat_started",
            Self::CombatEnded => "combat_ended",
            Self::PlayerDisabled => "player_disabled",
            Self::PlayerEnabled => "player_enabled",
        }
    }
}
