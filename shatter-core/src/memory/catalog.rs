//! Static memory definitions loaded at session start.
//!
//! ```toml
//! [[memories]]
//! id = "core_lighthouse"
//! title = "The Lighthouse"
//! [memories.payload]
//! category = "core"
//! story_phase = 1
//! ```

use serde::{Deserialize, Serialize};

use super::MemoryRecord;
use crate::error::{Result, ShatterError};

/// An ordered list of memory definitions.
///
/// The catalog does not check ids for uniqueness; that happens when the
/// records are loaded into a [`MemoryStore`](crate::store::MemoryStore).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryCatalog {
    /// Definitions in authoring order.
    #[serde(default)]
    pub memories: Vec<MemoryRecord>,
}

impl MemoryCatalog {
    /// Parse a catalog from a TOML string.
    ///
    /// # Errors
    /// Returns `ShatterError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ShatterError::Config(e.to_string()))
    }

    /// Parse a catalog from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memories.len()
    }

    /// Whether the catalog has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }
}
