//! Error types for the progression core.

use thiserror::Error;

use crate::state::GameState;
use crate::types::{AbilityId, MemoryId};

/// Top-level error type for all progression operations.
///
/// Load-time variants (`DuplicateId`, `Config`) abort construction of a
/// session. Every other variant is returned from a single call and leaves
/// the session untouched.
#[derive(Error, Debug)]
pub enum ShatterError {
    /// No memory record with this id was loaded.
    #[error("Memory not found: {0}")]
    NotFound(MemoryId),

    /// No ability with this id has been unlocked.
    #[error("Ability not found: {0}")]
    AbilityNotFound(AbilityId),

    /// Two definitions share the same id.
    #[error("Duplicate memory id in definitions: {0}")]
    DuplicateId(MemoryId),

    /// The game-mode state machine rejected a transition.
    #[error("Illegal transition: {from:?} -> {to:?}")]
    IllegalTransition {
        /// State the machine was in.
        from: GameState,
        /// State that was requested.
        to: GameState,
    },

    /// Not enough memory energy to use an ability.
    #[error("Insufficient energy for {ability}: need {required:.1}, have {available:.1}")]
    InsufficientEnergy {
        /// Which ability was attempted.
        ability: AbilityId,
        /// Energy cost of the ability.
        required: f32,
        /// Energy the caller had.
        available: f32,
    },

    /// The ability is unlocked but not usable in the current world context.
    #[error("Ability unavailable in current world context: {0}")]
    AbilityUnavailable(AbilityId),

    /// Journal connection references a memory that is not in the journal.
    #[error("Journal has no node for memory: {0}")]
    UnknownNode(MemoryId),

    /// Journal connection from a memory to itself.
    #[error("Cannot connect memory to itself: {0}")]
    SelfConnection(MemoryId),

    /// The memory exists but has not been collected yet.
    #[error("Memory not collected yet: {0}")]
    NotCollected(MemoryId),

    /// Configuration or definition data is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored save failed its integrity check.
    #[error("Save slot {slot} is corrupted: {reason}")]
    Corrupted {
        /// Slot number.
        slot: u32,
        /// What failed.
        reason: String,
    },

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ShatterError>;
