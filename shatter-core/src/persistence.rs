//! Save state and SQLite-backed save slots.
//!
//! [`SaveState`] is everything needed to rebuild a session: the collected
//! ids with their timestamps, the boost map, the world-context flag, the
//! state machine, the player character state, and current health and energy. Rebuilding replays the
//! collections in timestamp order (see
//! [`ProgressionCoordinator::restore`](crate::coordinator::ProgressionCoordinator::restore)).
//!
//! [`SaveStore`] keeps one JSON document per slot:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS save_slots (
//!     slot       INTEGER PRIMARY KEY,
//!     session_id TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     saved_at   TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{Result, ShatterError};
use crate::memory::AbilityUpgrade;
use crate::player::PlayerState;
use crate::state::StateMachineSnapshot;
use crate::types::{GameTimestamp, MemoryId, SessionId};

/// Current save format version.
pub const SAVE_FORMAT_VERSION: u32 = 1;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS save_slots (
    slot       INTEGER PRIMARY KEY,
    session_id TEXT NOT NULL,
    data       BLOB NOT NULL,
    saved_at   TEXT NOT NULL,
    checksum   TEXT
);";

// ---------------------------------------------------------------------------
// Save state
// ---------------------------------------------------------------------------

/// One collected memory in a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedEntry {
    /// The memory.
    pub id: MemoryId,
    /// When it was collected.
    pub timestamp: GameTimestamp,
}

/// Serializable image of a progression session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    /// Format version.
    pub version: u32,
    /// Playthrough this save belongs to.
    pub session_id: SessionId,
    /// Wall-clock time of the save.
    pub saved_at: DateTime<Utc>,
    /// Collected memories in collection order.
    pub collected: Vec<CollectedEntry>,
    /// Stat boosts by source.
    #[serde(default)]
    pub boosts: BTreeMap<String, f32>,
    /// Whether dream modifiers were active.
    #[serde(default)]
    pub dream_context: bool,
    /// State machine image.
    #[serde(default)]
    pub machine: StateMachineSnapshot,
    /// Health at save time.
    pub current_health: f32,
    /// Memory energy at save time.
    pub current_energy: f32,
    /// Ability upgrades applied, in order.
    #[serde(default)]
    pub upgrades: Vec<AbilityUpgrade>,
    /// Player character state.
    #[serde(default)]
    pub player: PlayerState,
}

impl SaveState {
    /// Collected entries sorted by timestamp; ties keep collection order.
    #[must_use]
    pub fn replay_order(&self) -> Vec<&CollectedEntry> {
        let mut entries: Vec<&CollectedEntry> = self.collected.iter().collect();
        entries.sort_by_key(|e| e.timestamp);
        entries
    }

    /// Encode as JSON.
    ///
    /// # Errors
    /// Returns [`ShatterError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ShatterError::Serialization(e.to_string()))
    }

    /// Decode from JSON, rejecting saves from a newer format.
    ///
    /// # Errors
    /// Returns [`ShatterError::Serialization`] if decoding fails or the
    /// version is unsupported.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let state: Self =
            serde_json::from_slice(data).map_err(|e| ShatterError::Serialization(e.to_string()))?;
        if state.version > SAVE_FORMAT_VERSION {
            return Err(ShatterError::Serialization(format!(
                "save format version {} is newer than supported version {SAVE_FORMAT_VERSION}",
                state.version
            )));
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309 polynomial, reflected).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ POLY } else { crc >> 1 };
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// SaveStore
// ---------------------------------------------------------------------------

/// Summary row for a save slot menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSummary {
    /// Slot number.
    pub slot: u32,
    /// Playthrough id stored in the slot.
    pub session_id: String,
    /// RFC 3339 save time.
    pub saved_at: String,
}

/// Save slots in an SQLite database.
///
/// ```no_run
/// # use shatter_core::persistence::SaveStore;
/// # use shatter_core::config::PersistenceConfig;
/// let store = SaveStore::open("saves.db", &PersistenceConfig::default())?;
/// for summary in store.list_slots()? {
///     println!("slot {} saved at {}", summary.slot, summary.saved_at);
/// }
/// # Ok::<(), shatter_core::error::ShatterError>(())
/// ```
pub struct SaveStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for SaveStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SaveStore {
    /// Open (or create) the save database at `path`.
    ///
    /// # Errors
    /// Returns [`ShatterError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = config.wal_mode, "Save store opened");

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns [`ShatterError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Write `state` to `slot`, replacing whatever was there.
    ///
    /// # Errors
    /// [`ShatterError::Serialization`] or [`ShatterError::Database`].
    pub fn save_slot(&self, slot: u32, state: &SaveState) -> Result<()> {
        let start = Instant::now();
        let json = state.to_json()?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&json));

        self.conn.execute(
            "INSERT INTO save_slots (slot, session_id, data, saved_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(slot) DO UPDATE SET
                session_id = excluded.session_id,
                data = excluded.data,
                saved_at = excluded.saved_at,
                checksum = excluded.checksum",
            params![
                slot,
                state.session_id.to_string(),
                json,
                state.saved_at.to_rfc3339(),
                checksum
            ],
        )?;

        info!(
            slot,
            session = %state.session_id,
            collected = state.collected.len(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved slot"
        );
        Ok(())
    }

    /// Read `slot`. Returns `None` for an empty slot.
    ///
    /// # Errors
    /// - [`ShatterError::Corrupted`] if checksums are enabled and the stored
    ///   checksum does not match the data.
    /// - [`ShatterError::Serialization`] if the data cannot be decoded.
    /// - [`ShatterError::Database`] on SQLite failures.
    pub fn load_slot(&self, slot: u32) -> Result<Option<SaveState>> {
        let start = Instant::now();
        let mut stmt = self
            .conn
            .prepare_cached("SELECT data, checksum FROM save_slots WHERE slot = ?1")?;
        let row: Option<(Vec<u8>, Option<String>)> = stmt
            .query_row(params![slot], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;

        let Some((data, stored_checksum)) = row else {
            debug!(slot, "Save slot empty");
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(slot, expected = %expected, actual = %actual, "Save checksum mismatch");
                    return Err(ShatterError::Corrupted {
                        slot,
                        reason: format!("checksum {actual} does not match stored {expected}"),
                    });
                }
            }
        }

        let state = SaveState::from_json(&data)?;
        info!(
            slot,
            session = %state.session_id,
            collected = state.collected.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded slot"
        );
        Ok(Some(state))
    }

    /// Clear `slot`. Returns `true` if it held a save.
    ///
    /// # Errors
    /// Returns [`ShatterError::Database`] on SQLite failures.
    pub fn delete_slot(&self, slot: u32) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM save_slots WHERE slot = ?1", params![slot])?;
        Ok(deleted > 0)
    }

    /// Occupied slots in slot order.
    ///
    /// # Errors
    /// Returns [`ShatterError::Database`] on SQLite failures.
    pub fn list_slots(&self) -> Result<Vec<SlotSummary>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT slot, session_id, saved_at FROM save_slots ORDER BY slot")?;
        let rows = stmt.query_map([], |row| {
            Ok(SlotSummary {
                slot: row.get(0)?,
                session_id: row.get(1)?,
                saved_at: row.get(2)?,
            })
        })?;
        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    /// Returns [`ShatterError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(dest = %dest_path.as_ref().display(), "Save database backed up");
        Ok(())
    }

    /// Path of the database file, or `:memory:`.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GameState;

    fn sample() -> SaveState {
        SaveState {
            version: SAVE_FORMAT_VERSION,
            session_id: SessionId::new(),
            saved_at: Utc::now(),
            collected: vec![
                CollectedEntry {
                    id: MemoryId::from("c1"),
                    timestamp: GameTimestamp::now(20),
                },
                CollectedEntry {
                    id: MemoryId::from("p1"),
                    timestamp: GameTimestamp::now(10),
                },
            ],
            boosts: BTreeMap::from([("c1".to_string(), 0.05)]),
            dream_context: false,
            machine: StateMachineSnapshot {
                current: GameState::Waking,
                ..StateMachineSnapshot::default()
            },
            current_health: 80.0,
            current_energy: 42.0,
            upgrades: Vec::new(),
            player: PlayerState::Normal,
        }
    }

    #[test]
    fn replay_order_sorts_by_tick() {
        let state = sample();
        let ids: Vec<_> = state.replay_order().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "c1"]);
    }

    #[test]
    fn slot_save_load_delete() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        assert!(store.load_slot(1).expect("load").is_none());

        let state = sample();
        store.save_slot(1, &state).expect("save");
        let loaded = store.load_slot(1).expect("load").expect("present");
        assert_eq!(loaded, state);

        assert!(store.delete_slot(1).expect("delete"));
        assert!(!store.delete_slot(1).expect("delete again"));
    }

    #[test]
    fn list_slots_is_ordered() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        store.save_slot(3, &sample()).expect("save");
        store.save_slot(1, &sample()).expect("save");
        let slots: Vec<_> = store
            .list_slots()
            .expect("list")
            .into_iter()
            .map(|s| s.slot)
            .collect();
        assert_eq!(slots, vec![1, 3]);
    }

    #[test]
    fn checksum_mismatch_is_corruption() {
        let store = SaveStore::open_in_memory(&PersistenceConfig::default()).expect("open");
        store.save_slot(2, &sample()).expect("save");
        store
            .conn
            .execute("UPDATE save_slots SET checksum = 'deadbeef' WHERE slot = 2", [])
            .expect("tamper");
        assert!(matches!(
            store.load_slot(2),
            Err(ShatterError::Corrupted { slot: 2, .. })
        ));
    }

    #[test]
    fn newer_format_is_rejected() {
        let mut state = sample();
        state.version = SAVE_FORMAT_VERSION + 1;
        let json = serde_json::to_vec(&state).expect("encode");
        assert!(matches!(
            SaveState::from_json(&json),
            Err(ShatterError::Serialization(_))
        ));
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(crc32_compute(b"123456789"), 0xCBF4_3926);
    }
}
