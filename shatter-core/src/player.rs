//! Player character state.
//!
//! Separate from the game mode: the game can be in `Waking` while the player
//! character is fighting or disabled by a cutscene. The game mode drives the
//! character through transitions and flashbacks; combat and disabling are
//! set by the host.
//!
//! ```text
//!  Normal ◀──exit_combat── InCombat
//!    │ ──enter_combat──▶
//!    │
//!    ├─ game → Transition ─▶ Transitioning ─ lands in a world ─▶ Normal
//!    ├─ game → Flashback  ─▶ InMemoryFlashback ─ flashback ends ─▶ Normal
//!    └─ disable ─▶ Disabled ─ enable ─▶ (state the game mode implies)
//! ```
//!
//! `Disabled` is sticky: game-mode changes do not clear it, except a return
//! to the menu.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::state::GameState;

/// What the player character is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    /// Free to move, collect and use abilities.
    #[default]
    Normal,
    /// Fighting. Abilities stay usable.
    InCombat,
    /// Moving between worlds.
    Transitioning,
    /// Watching a replayed memory.
    InMemoryFlashback,
    /// Input locked by the host.
    Disabled,
}

impl PlayerState {
    /// Whether the character accepts gameplay input.
    #[must_use]
    pub fn can_act(self) -> bool {
        matches!(self, Self::Normal | Self::InCombat)
    }

    /// The state a given game mode puts an enabled character in.
    #[must_use]
    pub fn implied_by(game: GameState) -> Self {
        match game {
            GameState::Transition => Self::Transitioning,
            GameState::Flashback => Self::InMemoryFlashback,
            _ => Self::Normal,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::InCombat => "in_combat",
            Self::Transitioning => "transitioning",
            Self::InMemoryFlashback => "in_memory_flashback",
            Self::Disabled => "disabled",
        };
        f.write_str(name)
    }
}

/// A committed player-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateChange {
    /// State before.
    pub from: PlayerState,
    /// State after.
    pub to: PlayerState,
}

/// The player character's state machine.
#[derive(Debug, Clone, Default)]
pub struct PlayerStateMachine {
    current: PlayerState,
}

impl PlayerStateMachine {
    /// Start in `Normal`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a saved state.
    #[must_use]
    pub fn from_state(current: PlayerState) -> Self {
        Self { current }
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> PlayerState {
        self.current
    }

    /// `Normal → InCombat`. `None` from any other state.
    pub fn enter_combat(&mut self) -> Option<PlayerStateChange> {
        if self.current != PlayerState::Normal {
            debug!(state = %self.current, "Enter combat ignored");
            return None;
        }
        Some(self.set(PlayerState::InCombat))
    }

    /// `InCombat → Normal`. `None` from any other state.
    pub fn exit_combat(&mut self) -> Option<PlayerStateChange> {
        if self.current != PlayerState::InCombat {
            debug!(state = %self.current, "Exit combat ignored");
            return None;
        }
        Some(self.set(PlayerState::Normal))
    }

    /// Lock the character. `None` if already disabled.
    pub fn disable(&mut self) -> Option<PlayerStateChange> {
        if self.current == PlayerState::Disabled {
            return None;
        }
        Some(self.set(PlayerState::Disabled))
    }

    /// Unlock the character into the state `game` implies. `None` unless
    /// disabled.
    pub fn enable(&mut self, game: GameState) -> Option<PlayerStateChange> {
        if self.current != PlayerState::Disabled {
            return None;
        }
        Some(self.set(PlayerState::implied_by(game)))
    }

    /// Follow a game-mode change.
    ///
    /// Pausing and resuming leave the character alone, so combat survives
    /// the pause menu. Landing in a world ends a transition or flashback.
    pub fn follow(&mut self, game: GameState) -> Option<PlayerStateChange> {
        let next = match (self.current, game) {
            (_, GameState::Menu) => PlayerState::Normal,
            (PlayerState::Disabled, _) | (_, GameState::Paused) => return None,
            (_, GameState::Transition) => PlayerState::Transitioning,
            (_, GameState::Flashback) => PlayerState::InMemoryFlashback,
            (PlayerState::Transitioning | PlayerState::InMemoryFlashback, _) => {
                PlayerState::Normal
            }
            (current, _) => current,
        };
        if next == self.current {
            return None;
        }
        Some(self.set(next))
    }

    /// Back to `Normal` (new game).
    pub fn reset(&mut self) {
        self.current = PlayerState::Normal;
    }

    fn set(&mut self, to: PlayerState) -> PlayerStateChange {
        let change = PlayerStateChange {
            from: self.current,
            to,
        };
        self.current = to;
        info!(from = %change.from, to = %change.to, "Player state changed");
        change
    }
}
