//! Events raised by the progression core.
//!
//! The core never calls into the host. It pushes events onto an
//! [`EventQueue`] and the host drains the queue once per frame, in the order
//! the events were raised.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::memory::{AbilityDefinition, MemoryRecord, WorldChangeSet};
use crate::state::StateChange;
use crate::types::{GameTimestamp, MemoryId};

/// Something presentation code may want to react to.
#[derive(Debug, Clone)]
pub enum ProgressionEvent {
    /// A memory was collected for the first time.
    MemoryCollected {
        /// The memory.
        record: Arc<MemoryRecord>,
        /// When it was collected.
        timestamp: GameTimestamp,
    },
    /// A skill memory unlocked a new ability.
    AbilityUnlocked {
        /// The ability.
        ability: AbilityDefinition,
        /// The skill memory that carried it.
        source: MemoryId,
    },
    /// The game state machine moved.
    StateChanged(StateChange),
    /// Health reached zero. Raised once per death.
    PlayerDied,
    /// A core memory changed the world.
    WorldChangesTriggered {
        /// The core memory.
        memory: MemoryId,
        /// What to enable, disable and unlock.
        changes: WorldChangeSet,
    },
    /// A collected memory was replayed.
    MemoryViewed {
        /// The memory.
        memory: MemoryId,
        /// How many times it has been viewed, including this one.
        view_count: u32,
        /// Titles of linked peripheral peers not collected yet.
        connection_hints: Vec<String>,
    },
}

impl ProgressionEvent {
    /// Short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MemoryCollected { .. } => "memory_collected",
            Self::AbilityUnlocked { .. } => "ability_unlocked",
            Self::StateChanged(_) => "state_changed",
            Self::PlayerDied => "player_died",
            Self::WorldChangesTriggered { .. } => "world_changes_triggered",
            Self::MemoryViewed { .. } => "memory_viewed",
        }
    }
}

/// FIFO of pending events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pending: VecDeque<ProgressionEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: ProgressionEvent) {
        self.pending.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = ProgressionEvent> + '_ {
        self.pending.drain(..)
    }

    /// Take the oldest pending event.
    pub fn pop(&mut self) -> Option<ProgressionEvent> {
        self.pending.pop_front()
    }

    /// Pending events without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &ProgressionEvent> {
        self.pending.iter()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
