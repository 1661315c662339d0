//! Memory record definitions.
//!
//! A [`MemoryRecord`] is one collectible memory fragment. Its category is a
//! closed set (`Core`, `Skill`, `Peripheral`) and the category-specific data
//! lives in [`MemoryPayload`], so a record can never claim one category while
//! carrying another category's payload.

pub mod catalog;
pub mod peripheral;
pub mod skill;
pub mod story;

pub use self::catalog::MemoryCatalog;
pub use self::peripheral::PeripheralPayload;
pub use self::skill::{AbilityDefinition, AbilityUpgrade, SkillPayload};
pub use self::story::{CorePayload, WorldChangeSet};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ColorTag, MemoryId};

/// The three memory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    /// Main-story memory. Advances the story and boosts stats.
    Core,
    /// Unlocks an ability.
    Skill,
    /// Optional backstory linked to other memories.
    Peripheral,
}

impl fmt::Display for MemoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Core => "core",
            Self::Skill => "skill",
            Self::Peripheral => "peripheral",
        };
        f.write_str(name)
    }
}

/// Category-specific data, tagged by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum MemoryPayload {
    /// Story phase and world changes.
    Core(CorePayload),
    /// The ability this memory unlocks.
    Skill(SkillPayload),
    /// Links to peer memories.
    Peripheral(PeripheralPayload),
}

impl MemoryPayload {
    /// The category this payload belongs to.
    #[must_use]
    pub fn category(&self) -> MemoryCategory {
        match self {
            Self::Core(_) => MemoryCategory::Core,
            Self::Skill(_) => MemoryCategory::Skill,
            Self::Peripheral(_) => MemoryCategory::Peripheral,
        }
    }
}

/// A single collectible memory, immutable once loaded.
///
/// Collection state (whether and when it was collected) is tracked by the
/// [`MemoryStore`](crate::store::MemoryStore), not by the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique, author-assigned id.
    pub id: MemoryId,
    /// Short display title.
    pub title: String,
    /// Longer description shown in the journal.
    #[serde(default)]
    pub description: String,
    /// Colour used by the journal and HUD.
    #[serde(default)]
    pub color: ColorTag,
    /// Lines spoken or shown when the memory is viewed.
    #[serde(default)]
    pub dialogue_lines: Vec<String>,
    /// Category-specific payload.
    pub payload: MemoryPayload,
}

impl MemoryRecord {
    /// Create a record with an empty description and no dialogue.
    #[must_use]
    pub fn new(id: impl Into<MemoryId>, title: impl Into<String>, payload: MemoryPayload) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            color: ColorTag::default(),
            dialogue_lines: Vec::new(),
            payload,
        }
    }

    /// Shorthand for a core memory.
    #[must_use]
    pub fn core(id: impl Into<MemoryId>, title: impl Into<String>, story_phase: u32) -> Self {
        Self::new(id, title, MemoryPayload::Core(CorePayload::new(story_phase)))
    }

    /// Shorthand for a skill memory.
    #[must_use]
    pub fn skill(id: impl Into<MemoryId>, title: impl Into<String>, ability: AbilityDefinition) -> Self {
        Self::new(id, title, MemoryPayload::Skill(SkillPayload { ability }))
    }

    /// Shorthand for a peripheral memory linked to `peers`.
    #[must_use]
    pub fn peripheral<I, P>(id: impl Into<MemoryId>, title: impl Into<String>, peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<MemoryId>,
    {
        Self::new(
            id,
            title,
            MemoryPayload::Peripheral(PeripheralPayload::new(peers)),
        )
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the colour tag.
    #[must_use]
    pub fn with_color(mut self, color: ColorTag) -> Self {
        self.color = color;
        self
    }

    /// Set the dialogue lines.
    #[must_use]
    pub fn with_dialogue<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dialogue_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    /// The record's category, derived from its payload.
    #[must_use]
    pub fn category(&self) -> MemoryCategory {
        self.payload.category()
    }

    /// Core payload, if this is a core memory.
    #[must_use]
    pub fn as_core(&self) -> Option<&CorePayload> {
        match &self.payload {
            MemoryPayload::Core(core) => Some(core),
            _ => None,
        }
    }

    /// Unlocked ability, if this is a skill memory.
    #[must_use]
    pub fn ability(&self) -> Option<&AbilityDefinition> {
        match &self.payload {
            MemoryPayload::Skill(skill) => Some(&skill.ability),
            _ => None,
        }
    }

    /// Peer ids, empty unless this is a peripheral memory.
    #[must_use]
    pub fn peers(&self) -> &[MemoryId] {
        match &self.payload {
            MemoryPayload::Peripheral(p) => &p.connected_ids,
            _ => &[],
        }
    }
}
