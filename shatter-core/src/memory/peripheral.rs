//! Peripheral memories: optional backstory that links other memories
//! together in the journal.

use serde::{Deserialize, Serialize};

use crate::types::MemoryId;

/// Payload of a peripheral memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralPayload {
    /// Memories this one connects to in the journal.
    #[serde(default)]
    pub connected_ids: Vec<MemoryId>,
    /// Narrative weight, 1 (trivia) to 5 (pivotal).
    #[serde(default = "default_importance")]
    pub narrative_importance: u8,
    /// Dialogue options this memory unlocks.
    #[serde(default)]
    pub unlocked_dialogue_ids: Vec<String>,
    /// Character the memory is about, if any.
    #[serde(default)]
    pub related_character_id: Option<String>,
}

impl PeripheralPayload {
    /// Create a payload linking to `peers`.
    #[must_use]
    pub fn new<I, P>(peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<MemoryId>,
    {
        Self {
            connected_ids: peers.into_iter().map(Into::into).collect(),
            narrative_importance: default_importance(),
            unlocked_dialogue_ids: Vec::new(),
            related_character_id: None,
        }
    }

    /// Narrative importance clamped to `1..=5`.
    #[must_use]
    pub fn importance(&self) -> u8 {
        self.narrative_importance.clamp(1, 5)
    }
}

fn default_importance() -> u8 {
    1
}
