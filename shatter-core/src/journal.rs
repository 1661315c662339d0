//! Memory journal: an undirected graph over collected memories.
//!
//! Nodes are added when a memory is collected; edges come from peripheral
//! peer links whose other end is already collected. Node and edge order is
//! insertion order, which is also the display order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::error::{Result, ShatterError};
use crate::memory::{MemoryCategory, MemoryRecord};
use crate::types::{GameTimestamp, MemoryId};

/// A collected memory placed in the journal.
#[derive(Debug, Clone)]
pub struct JournalNode {
    /// The memory.
    pub record: Arc<MemoryRecord>,
    /// When it was collected.
    pub collected_at: GameTimestamp,
}

/// Undirected graph of collected memories.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    nodes: Vec<JournalNode>,
    index: HashMap<MemoryId, usize>,
    edges: Vec<(MemoryId, MemoryId)>,
    /// Normalized `(min, max)` pairs for duplicate checks.
    edge_set: HashSet<(MemoryId, MemoryId)>,
}

impl MemoryJournal {
    /// Create an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns `false` if it was already present.
    pub fn add_node(&mut self, record: Arc<MemoryRecord>, collected_at: GameTimestamp) -> bool {
        if self.index.contains_key(&record.id) {
            debug!(memory = %record.id, "Journal node already present");
            return false;
        }
        self.index.insert(record.id.clone(), self.nodes.len());
        self.nodes.push(JournalNode {
            record,
            collected_at,
        });
        true
    }

    /// Connect two nodes. Returns `false` if the edge already existed.
    ///
    /// # Errors
    /// - [`ShatterError::SelfConnection`] if `a == b`.
    /// - [`ShatterError::UnknownNode`] if either end is absent.
    pub fn connect(&mut self, a: &MemoryId, b: &MemoryId) -> Result<bool> {
        if a == b {
            return Err(ShatterError::SelfConnection(a.clone()));
        }
        for end in [a, b] {
            if !self.index.contains_key(end) {
                return Err(ShatterError::UnknownNode(end.clone()));
            }
        }

        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        if self.edge_set.contains(&key) {
            debug!(a = %a, b = %b, "Journal edge already present");
            return Ok(false);
        }

        debug!(a = %a, b = %b, "Journal edge added");
        self.edge_set.insert(key);
        self.edges.push((a.clone(), b.clone()));
        Ok(true)
    }

    /// Ids connected to `id`, in edge insertion order.
    #[must_use]
    pub fn neighbors(&self, id: &MemoryId) -> Vec<&MemoryId> {
        self.edges
            .iter()
            .filter_map(|(a, b)| {
                if a == id {
                    Some(b)
                } else if b == id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Whether `a` and `b` are connected.
    #[must_use]
    pub fn are_connected(&self, a: &MemoryId, b: &MemoryId) -> bool {
        let key = if a < b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        self.edge_set.contains(&key)
    }

    /// Nodes of one category in insertion order.
    pub fn by_category(&self, category: MemoryCategory) -> impl Iterator<Item = &JournalNode> {
        self.nodes
            .iter()
            .filter(move |n| n.record.category() == category)
    }

    /// Nodes sorted by collection tick; ties keep insertion order.
    #[must_use]
    pub fn by_timeline(&self) -> Vec<&JournalNode> {
        let mut nodes: Vec<&JournalNode> = self.nodes.iter().collect();
        nodes.sort_by_key(|n| n.collected_at.tick);
        nodes
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[JournalNode] {
        &self.nodes
    }

    /// Edges in insertion order, as they were connected.
    #[must_use]
    pub fn edges(&self) -> &[(MemoryId, MemoryId)] {
        &self.edges
    }

    /// Whether `id` is in the journal.
    #[must_use]
    pub fn contains(&self, id: &MemoryId) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: &MemoryId) -> Option<&JournalNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Remove every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.edges.clear();
        self.edge_set.clear();
    }
}
