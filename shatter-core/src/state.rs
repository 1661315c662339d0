//! Game-mode state machine.
//!
//! ```text
//!  Menu ──start──▶ Waking ◀──resolve── Transition ◀──request── Dream
//!                  │  ▲                    ▲                     │ ▲
//!                  │  └──────resolve───────┤◀──────request───────┘ │
//!                  ▼                                               │
//!           Flashback / Paused  (return to the state they came from)
//!  Paused ──quit──▶ Menu
//! ```
//!
//! Every operation either applies one legal transition and returns the
//! [`StateChange`], or fails with [`ShatterError::IllegalTransition`] and
//! leaves the machine untouched. The machine has no notion of time: the hold
//! in `Transition` is timed by the host, which calls
//! [`GameStateMachine::resolve_transition`] when it elapses.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ShatterError};
use crate::types::{MemoryId, WorldContext};

/// The session's current mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    /// Title screen. Initial state.
    #[default]
    Menu,
    /// Playing in the waking world.
    Waking,
    /// Playing in the dream world.
    Dream,
    /// Moving between worlds.
    Transition,
    /// Replaying a collected memory.
    Flashback,
    /// Pause menu open.
    Paused,
}

impl GameState {
    /// Whether this is one of the two playable world states.
    #[must_use]
    pub fn is_world(self) -> bool {
        matches!(self, Self::Waking | Self::Dream)
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Menu => "menu",
            Self::Waking => "waking",
            Self::Dream => "dream",
            Self::Transition => "transition",
            Self::Flashback => "flashback",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Where `resume` returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Return to the state the pause was entered from.
    #[default]
    RestorePrevious,
    /// Always return to `Waking`, even when paused from `Dream`.
    AlwaysWaking,
}

/// A committed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// State before.
    pub from: GameState,
    /// State after.
    pub to: GameState,
}

/// Serializable image of the machine, for saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineSnapshot {
    /// Current state.
    pub current: GameState,
    /// Target of an in-flight transition.
    #[serde(default)]
    pub transition_target: Option<GameState>,
    /// World the in-flight transition started from.
    #[serde(default)]
    pub transition_origin: Option<GameState>,
    /// State a flashback returns to.
    #[serde(default)]
    pub flashback_return: Option<GameState>,
    /// Memory being replayed.
    #[serde(default)]
    pub flashback_memory: Option<MemoryId>,
    /// State the pause was entered from.
    #[serde(default)]
    pub pause_return: Option<GameState>,
}

/// The game-mode state machine.
#[derive(Debug, Clone, Default)]
pub struct GameStateMachine {
    current: GameState,
    transition_target: Option<GameState>,
    transition_origin: Option<GameState>,
    flashback_return: Option<GameState>,
    flashback_memory: Option<MemoryId>,
    pause_return: Option<GameState>,
    policy: ResumePolicy,
}

impl GameStateMachine {
    /// Create a machine in `Menu`.
    #[must_use]
    pub fn new(policy: ResumePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Rebuild a machine from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: StateMachineSnapshot, policy: ResumePolicy) -> Self {
        Self {
            current: snapshot.current,
            transition_target: snapshot.transition_target,
            transition_origin: snapshot.transition_origin,
            flashback_return: snapshot.flashback_return,
            flashback_memory: snapshot.flashback_memory,
            pause_return: snapshot.pause_return,
            policy,
        }
    }

    /// Capture the machine for a save.
    #[must_use]
    pub fn snapshot(&self) -> StateMachineSnapshot {
        StateMachineSnapshot {
            current: self.current,
            transition_target: self.transition_target,
            transition_origin: self.transition_origin,
            flashback_return: self.flashback_return,
            flashback_memory: self.flashback_memory.clone(),
            pause_return: self.pause_return,
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current state.
    #[must_use]
    pub fn current(&self) -> GameState {
        self.current
    }

    /// Target of the in-flight transition, if any.
    #[must_use]
    pub fn pending_target(&self) -> Option<GameState> {
        self.transition_target
    }

    /// Memory being replayed, while in `Flashback`.
    #[must_use]
    pub fn flashback_memory(&self) -> Option<&MemoryId> {
        self.flashback_memory.as_ref()
    }

    /// Resume policy.
    #[must_use]
    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    /// The world the player is in underneath overlays such as `Paused`.
    ///
    /// During `Transition` this is the world being left.
    #[must_use]
    pub fn underlying_world(&self) -> WorldContext {
        let world = match self.current {
            GameState::Transition => self.transition_origin,
            GameState::Flashback => self.flashback_return,
            GameState::Paused => self.pause_return,
            other => Some(other),
        };
        if world == Some(GameState::Dream) {
            WorldContext::Dream
        } else {
            WorldContext::Waking
        }
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// `Menu → Waking`.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Menu`.
    pub fn start_game(&mut self) -> Result<StateChange> {
        if self.current != GameState::Menu {
            return Err(self.illegal(GameState::Waking));
        }
        Ok(self.commit(GameState::Waking))
    }

    /// Request a world change.
    ///
    /// From `Menu`, a request for `Waking` starts the game directly. Between
    /// worlds the machine enters `Transition` holding `target`. While already
    /// in `Transition`, a new request replaces the pending target and `None`
    /// is returned since the state itself does not change.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] for any other request.
    pub fn request_transition(&mut self, target: GameState) -> Result<Option<StateChange>> {
        match (self.current, target) {
            (GameState::Menu, GameState::Waking) => Ok(Some(self.commit(GameState::Waking))),
            (GameState::Waking, GameState::Dream) | (GameState::Dream, GameState::Waking) => {
                self.transition_origin = Some(self.current);
                self.transition_target = Some(target);
                Ok(Some(self.commit(GameState::Transition)))
            }
            (GameState::Transition, GameState::Waking | GameState::Dream) => {
                info!(previous = ?self.transition_target, target = %target, "Pending transition superseded");
                self.transition_target = Some(target);
                Ok(None)
            }
            _ => Err(self.illegal(target)),
        }
    }

    /// Commit the pending transition.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Transition`.
    pub fn resolve_transition(&mut self) -> Result<StateChange> {
        let target = match (self.current, self.transition_target) {
            (GameState::Transition, Some(target)) => target,
            _ => return Err(self.illegal(self.current)),
        };
        self.transition_target = None;
        self.transition_origin = None;
        Ok(self.commit(target))
    }

    /// `{Waking, Dream} → Flashback` to replay `memory`.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] outside the two world states.
    pub fn begin_flashback(&mut self, memory: MemoryId) -> Result<StateChange> {
        if !self.current.is_world() {
            return Err(self.illegal(GameState::Flashback));
        }
        self.flashback_return = Some(self.current);
        self.flashback_memory = Some(memory);
        Ok(self.commit(GameState::Flashback))
    }

    /// `Flashback →` the world it was entered from.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Flashback`.
    pub fn end_flashback(&mut self) -> Result<StateChange> {
        if self.current != GameState::Flashback {
            return Err(self.illegal(self.current));
        }
        let target = self.flashback_return.take().unwrap_or(GameState::Waking);
        self.flashback_memory = None;
        Ok(self.commit(target))
    }

    /// `{Waking, Dream} → Paused`.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] outside the two world states.
    pub fn pause(&mut self) -> Result<StateChange> {
        if !self.current.is_world() {
            return Err(self.illegal(GameState::Paused));
        }
        self.pause_return = Some(self.current);
        Ok(self.commit(GameState::Paused))
    }

    /// `Paused →` the previous world, or `Waking` under
    /// [`ResumePolicy::AlwaysWaking`].
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Paused`.
    pub fn resume(&mut self) -> Result<StateChange> {
        if self.current != GameState::Paused {
            return Err(self.illegal(GameState::Waking));
        }
        let previous = self.pause_return.take().unwrap_or(GameState::Waking);
        let target = match self.policy {
            ResumePolicy::RestorePrevious => previous,
            ResumePolicy::AlwaysWaking => GameState::Waking,
        };
        Ok(self.commit(target))
    }

    /// `Paused → Menu`.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Paused`.
    pub fn return_to_menu(&mut self) -> Result<StateChange> {
        if self.current != GameState::Paused {
            return Err(self.illegal(GameState::Menu));
        }
        self.pause_return = None;
        Ok(self.commit(GameState::Menu))
    }

    /// Back to `Menu` with nothing pending (new game).
    pub fn reset(&mut self) {
        *self = Self::new(self.policy);
    }

    fn commit(&mut self, to: GameState) -> StateChange {
        let change = StateChange {
            from: self.current,
            to,
        };
        info!(from = %change.from, to = %change.to, "Game state changed");
        self.current = to;
        change
    }

    fn illegal(&self, to: GameState) -> ShatterError {
        warn!(from = %self.current, to = %to, "Illegal state transition rejected");
        ShatterError::IllegalTransition {
            from: self.current,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing() -> GameStateMachine {
        let mut machine = GameStateMachine::default();
        machine.start_game().expect("start");
        machine
    }

    #[test]
    fn menu_cannot_jump_to_dream() {
        let mut machine = GameStateMachine::default();
        let err = machine.request_transition(GameState::Dream);
        assert!(matches!(
            err,
            Err(ShatterError::IllegalTransition {
                from: GameState::Menu,
                to: GameState::Dream
            })
        ));
        assert_eq!(machine.current(), GameState::Menu);
    }

    #[test]
    fn waking_to_dream_passes_through_transition() {
        let mut machine = playing();
        let change = machine
            .request_transition(GameState::Dream)
            .expect("request")
            .expect("state change");
        assert_eq!(change.to, GameState::Transition);
        assert_eq!(machine.pending_target(), Some(GameState::Dream));
        assert_eq!(machine.underlying_world(), WorldContext::Waking);

        let change = machine.resolve_transition().expect("resolve");
        assert_eq!(
            change,
            StateChange {
                from: GameState::Transition,
                to: GameState::Dream
            }
        );
        assert_eq!(machine.pending_target(), None);
    }

    #[test]
    fn second_request_supersedes_first() {
        let mut machine = playing();
        machine.request_transition(GameState::Dream).expect("request");
        assert_eq!(machine.request_transition(GameState::Waking).expect("request"), None);
        machine.resolve_transition().expect("resolve");
        assert_eq!(machine.current(), GameState::Waking);
    }

    #[test]
    fn resolve_outside_transition_is_illegal() {
        let mut machine = playing();
        assert!(machine.resolve_transition().is_err());
        assert_eq!(machine.current(), GameState::Waking);
    }

    #[test]
    fn flashback_returns_to_origin_world() {
        let mut machine = playing();
        machine.request_transition(GameState::Dream).expect("request");
        machine.resolve_transition().expect("resolve");
        machine.begin_flashback(MemoryId::from("c1")).expect("flashback");
        assert_eq!(machine.flashback_memory(), Some(&MemoryId::from("c1")));
        assert!(machine.pause().is_err());
        let change = machine.end_flashback().expect("end");
        assert_eq!(change.to, GameState::Dream);
        assert_eq!(machine.flashback_memory(), None);
    }

    #[test]
    fn resume_policy_decides_return_state() {
        let mut machine = GameStateMachine::new(ResumePolicy::RestorePrevious);
        machine.start_game().expect("start");
        machine.request_transition(GameState::Dream).expect("request");
        machine.resolve_transition().expect("resolve");
        machine.pause().expect("pause");
        assert_eq!(machine.resume().expect("resume").to, GameState::Dream);

        let mut legacy = GameStateMachine::new(ResumePolicy::AlwaysWaking);
        legacy.start_game().expect("start");
        legacy.request_transition(GameState::Dream).expect("request");
        legacy.resolve_transition().expect("resolve");
        legacy.pause().expect("pause");
        assert_eq!(legacy.resume().expect("resume").to, GameState::Waking);
    }

    #[test]
    fn paused_can_quit_to_menu() {
        let mut machine = playing();
        assert!(machine.return_to_menu().is_err());
        machine.pause().expect("pause");
        machine.return_to_menu().expect("quit");
        assert_eq!(machine.current(), GameState::Menu);
        assert!(machine.start_game().is_ok());
    }

    #[test]
    fn snapshot_restores_pending_transition() {
        let mut machine = playing();
        machine.request_transition(GameState::Dream).expect("request");
        let snapshot = machine.snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: StateMachineSnapshot = serde_json::from_str(&json).expect("deserialize");
        let mut restored = GameStateMachine::from_snapshot(back, ResumePolicy::default());
        assert_eq!(restored.current(), GameState::Transition);
        assert_eq!(restored.resolve_transition().expect("resolve").to, GameState::Dream);
    }

    #[test]
    fn resume_policy_parses_from_snake_case() {
        let policy: ResumePolicy = serde_json::from_str("\"always_waking\"").expect("parse");
        assert_eq!(policy, ResumePolicy::AlwaysWaking);
    }
}
