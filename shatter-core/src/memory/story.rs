//! Core memories: "what happened to me".
//!
//! Collecting one advances the story to its phase, grants a stat boost that
//! scales with the phase, and hands a [`WorldChangeSet`] to the host so it can
//! toggle objects, unlock areas and fire scripted events.

use serde::{Deserialize, Serialize};

/// Ids of world objects the host should change when a core memory lands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldChangeSet {
    /// Objects to enable.
    #[serde(default)]
    pub enabled_object_ids: Vec<String>,
    /// Objects to disable.
    #[serde(default)]
    pub disabled_object_ids: Vec<String>,
    /// Areas to unlock.
    #[serde(default)]
    pub unlocked_area_ids: Vec<String>,
    /// NPCs whose behaviour changes.
    #[serde(default)]
    pub changed_npc_ids: Vec<String>,
    /// Scripted events to trigger.
    #[serde(default)]
    pub triggered_event_ids: Vec<String>,
}

impl WorldChangeSet {
    /// Whether the set changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled_object_ids.is_empty()
            && self.disabled_object_ids.is_empty()
            && self.unlocked_area_ids.is_empty()
            && self.changed_npc_ids.is_empty()
            && self.triggered_event_ids.is_empty()
    }
}

/// Payload of a core memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorePayload {
    /// Story phase this memory belongs to (1-based).
    pub story_phase: u32,
    /// World changes applied on collection.
    #[serde(default)]
    pub world_changes: WorldChangeSet,
}

impl CorePayload {
    /// Create a payload with no world changes.
    #[must_use]
    pub fn new(story_phase: u32) -> Self {
        Self {
            story_phase,
            world_changes: WorldChangeSet::default(),
        }
    }

    /// Attach world changes.
    #[must_use]
    pub fn with_world_changes(mut self, changes: WorldChangeSet) -> Self {
        self.world_changes = changes;
        self
    }
}
