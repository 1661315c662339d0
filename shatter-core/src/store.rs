//! The memory record store.
//!
//! Holds every memory definition for the session, keyed by id, plus the
//! collection state of each. Records are shared as `Arc<MemoryRecord>` so
//! the journal and emitted events can hold them without copying.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ShatterError};
use crate::memory::{MemoryCategory, MemoryRecord};
use crate::types::{GameTimestamp, MemoryId};

/// A loaded record and its collection state.
#[derive(Debug, Clone)]
pub struct StoredMemory {
    /// The immutable record.
    pub record: Arc<MemoryRecord>,
    /// When the memory was first collected; `None` until then.
    pub collected_at: Option<GameTimestamp>,
    /// How many times the player has replayed the memory.
    pub view_count: u32,
}

impl StoredMemory {
    /// Whether the memory has been collected.
    #[must_use]
    pub fn is_collected(&self) -> bool {
        self.collected_at.is_some()
    }
}

/// Result of [`MemoryStore::mark_collected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// First collection; the timestamp was recorded.
    Collected,
    /// Already collected earlier; nothing changed.
    AlreadyCollected,
}

/// Id → record mapping with collection state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<MemoryId, StoredMemory>,
    load_order: Vec<MemoryId>,
    collected_order: Vec<MemoryId>,
    /// Peer id → peripheral records that list it.
    referrers: HashMap<MemoryId, Vec<MemoryId>>,
}

impl MemoryStore {
    /// Build the store from definitions.
    ///
    /// # Errors
    /// - [`ShatterError::DuplicateId`] if two definitions share an id.
    /// - [`ShatterError::Config`] if a core memory has story phase 0.
    pub fn load<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = MemoryRecord>,
    {
        let mut store = Self::default();

        for record in definitions {
            if store.entries.contains_key(&record.id) {
                return Err(ShatterError::DuplicateId(record.id));
            }
            if let Some(core) = record.as_core() {
                if core.story_phase < 1 {
                    return Err(ShatterError::Config(format!(
                        "core memory {} has story phase 0",
                        record.id
                    )));
                }
            }
            for peer in record.peers() {
                store
                    .referrers
                    .entry(peer.clone())
                    .or_default()
                    .push(record.id.clone());
            }

            store.load_order.push(record.id.clone());
            store.entries.insert(
                record.id.clone(),
                StoredMemory {
                    record: Arc::new(record),
                    collected_at: None,
                    view_count: 0,
                },
            );
        }

        Ok(store)
    }

    /// Look up a record.
    ///
    /// # Errors
    /// Returns [`ShatterError::NotFound`] for an unknown id.
    pub fn get(&self, id: &MemoryId) -> Result<&Arc<MemoryRecord>> {
        self.entries
            .get(id)
            .map(|e| &e.record)
            .ok_or_else(|| ShatterError::NotFound(id.clone()))
    }

    /// Look up a record together with its collection state.
    #[must_use]
    pub fn entry(&self, id: &MemoryId) -> Option<&StoredMemory> {
        self.entries.get(id)
    }

    /// Mark a memory collected at `timestamp`.
    ///
    /// Calling this twice is not an error: duplicate trigger events from the
    /// host are expected, and the second call reports `AlreadyCollected`.
    ///
    /// # Errors
    /// Returns [`ShatterError::NotFound`] for an unknown id.
    pub fn mark_collected(&mut self, id: &MemoryId, timestamp: GameTimestamp) -> Result<MarkOutcome> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ShatterError::NotFound(id.clone()))?;

        if entry.collected_at.is_some() {
            debug!(memory = %id, "Memory already collected");
            return Ok(MarkOutcome::AlreadyCollected);
        }

        entry.collected_at = Some(timestamp);
        self.collected_order.push(id.clone());
        Ok(MarkOutcome::Collected)
    }

    /// Count a replay of a collected memory, returning the new view count.
    ///
    /// # Errors
    /// [`ShatterError::NotFound`] for an unknown id,
    /// [`ShatterError::NotCollected`] if the memory has not been collected.
    pub fn record_view(&mut self, id: &MemoryId) -> Result<u32> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| ShatterError::NotFound(id.clone()))?;
        if !entry.is_collected() {
            return Err(ShatterError::NotCollected(id.clone()));
        }
        entry.view_count += 1;
        Ok(entry.view_count)
    }

    /// Whether `id` exists and has been collected.
    #[must_use]
    pub fn is_collected(&self, id: &MemoryId) -> bool {
        self.entries.get(id).is_some_and(StoredMemory::is_collected)
    }

    /// When `id` was collected, if it was.
    #[must_use]
    pub fn collected_at(&self, id: &MemoryId) -> Option<GameTimestamp> {
        self.entries.get(id).and_then(|e| e.collected_at)
    }

    /// Collected ids in collection order.
    #[must_use]
    pub fn collected_ids(&self) -> &[MemoryId] {
        &self.collected_order
    }

    /// Collected records in collection order.
    pub fn collected_records(&self) -> impl Iterator<Item = &Arc<MemoryRecord>> {
        self.collected_order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.record))
    }

    /// All records in load order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<MemoryRecord>> {
        self.load_order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| &e.record))
    }

    /// Peripheral records that list `id` as a peer.
    #[must_use]
    pub fn referrers(&self, id: &MemoryId) -> &[MemoryId] {
        self.referrers.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Titles of the peers of `id` that exist but are not collected yet.
    ///
    /// Used for connection hints when a peripheral memory is viewed. Peers
    /// that were never defined are skipped.
    ///
    /// # Errors
    /// Returns [`ShatterError::NotFound`] for an unknown id.
    pub fn uncollected_peers(&self, id: &MemoryId) -> Result<Vec<&str>> {
        let record = self.get(id)?;
        Ok(record
            .peers()
            .iter()
            .filter_map(|peer| self.entries.get(peer))
            .filter(|e| !e.is_collected())
            .map(|e| e.record.title.as_str())
            .collect())
    }

    /// Number of core memories defined.
    #[must_use]
    pub fn total_core_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.record.category() == MemoryCategory::Core)
            .count()
    }

    /// Number of core memories collected.
    #[must_use]
    pub fn collected_core_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.is_collected() && e.record.category() == MemoryCategory::Core)
            .count()
    }

    /// Story progress in `[0, 1]`: collected core memories over total.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        let total = self.total_core_count();
        if total == 0 {
            return 0.0;
        }
        self.collected_core_count() as f32 / total as f32
    }

    /// Forget all collection state (new game). Definitions are kept.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.collected_at = None;
            entry.view_count = 0;
        }
        self.collected_order.clear();
    }

    /// Number of loaded records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no records were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
