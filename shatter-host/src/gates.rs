//! Memory gates: interaction points that open only once the player has
//! collected a particular memory.
//!
//! Sleep points send the player into the dream world and are usable only
//! while awake. Dream exits lead back and are usable only while dreaming.
//! Hidden triggers guard a memory pickup that stays out of reach until its
//! required memory is collected. A hidden trigger flagged
//! `requires_resonance` is also invisible until a memory resonance reveals
//! it (see [`crate::resonance`]).

use serde::{Deserialize, Serialize};
use shatter_core::{GameState, MemoryId, MemoryStore};

/// What a gate does when used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    /// Waking world → dream world.
    SleepPoint,
    /// Dream world → waking world.
    DreamExit,
    /// Guards a hidden memory pickup.
    HiddenTrigger,
}

impl GateKind {
    /// The only state the gate can be used from, if restricted.
    #[must_use]
    pub fn usable_from(self) -> Option<GameState> {
        match self {
            Self::SleepPoint => Some(GameState::Waking),
            Self::DreamExit => Some(GameState::Dream),
            Self::HiddenTrigger => None,
        }
    }
}

/// A gated interaction point placed in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryGate {
    /// Level-unique id.
    pub id: String,
    /// Display name for prompts.
    #[serde(default)]
    pub name: String,
    /// What the gate does.
    pub kind: GateKind,
    /// Memory that must be collected first.
    #[serde(default)]
    pub required_memory: Option<MemoryId>,
    /// Designer toggle; a locked gate never opens.
    #[serde(default = "default_unlocked")]
    pub unlocked: bool,
    /// Hidden until revealed by resonance.
    #[serde(default)]
    pub requires_resonance: bool,
}

impl MemoryGate {
    /// An unlocked gate with no requirement.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: GateKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            required_memory: None,
            unlocked: true,
            requires_resonance: false,
        }
    }

    /// Hide the gate until a resonance reveals it.
    #[must_use]
    pub fn hidden_until_resonance(mut self) -> Self {
        self.requires_resonance = true;
        self
    }

    /// Require `memory` to be collected.
    #[must_use]
    pub fn requiring(mut self, memory: impl Into<MemoryId>) -> Self {
        self.required_memory = Some(memory.into());
        self
    }

    /// Whether the gate's requirement is met.
    #[must_use]
    pub fn is_open(&self, store: &MemoryStore) -> bool {
        self.unlocked
            && self
                .required_memory
                .as_ref()
                .is_none_or(|memory| store.is_collected(memory))
    }

    /// Whether a resonance pulse can reveal this gate now.
    #[must_use]
    pub fn revealable(&self, store: &MemoryStore) -> bool {
        self.requires_resonance && self.is_open(store)
    }

    /// Whether the gate can be used from `state`.
    #[must_use]
    pub fn usable_in(&self, state: GameState) -> bool {
        self.kind.usable_from().is_none_or(|required| required == state)
    }
}

fn default_unlocked() -> bool {
    true
}
