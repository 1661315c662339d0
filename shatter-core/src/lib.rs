//! # Shatter Core
//!
//! Engine-agnostic progression core for a narrative action-adventure split
//! between a waking world and a dream world.
//!
//! The player collects memory fragments in three categories:
//!
//! - **Core**: main-story memories; each one boosts every stat
//! - **Skill**: unlocks an ability that costs memory energy
//! - **Peripheral**: backstory that links other memories in the journal
//!
//! A [`ProgressionCoordinator`] owns one session: the [`MemoryStore`], the
//! [`PlayerStatBlock`], the [`AbilityRegistry`], the [`MemoryJournal`], the
//! [`GameStateMachine`] and the [`PlayerStateMachine`]. The host calls into
//! it from its frame loop and drains [`ProgressionEvent`]s back out.
//!
//! ```
//! use shatter_core::{GameTimestamp, MemoryId, MemoryRecord, ProgressionCoordinator, ShatterConfig};
//!
//! let mut session = ProgressionCoordinator::new(
//!     ShatterConfig::default(),
//!     vec![MemoryRecord::core("core_lighthouse", "The Lighthouse", 3)],
//! )?;
//! session.collect(&MemoryId::from("core_lighthouse"), GameTimestamp::now(1))?;
//! assert!((session.stats().damage_multiplier() - 1.15).abs() < 1e-5);
//! # Ok::<(), shatter_core::ShatterError>(())
//! ```
//!
//! Everything is synchronous and single-threaded. Timed behaviour (the hold
//! while moving between worlds, ability cooldowns) belongs to the host.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod abilities;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod journal;
pub mod memory;
pub mod persistence;
pub mod player;
pub mod state;
pub mod stats;
pub mod store;
pub mod types;

pub use abilities::{AbilityRegistry, AbilityUse};
pub use config::ShatterConfig;
pub use coordinator::{CollectOutcome, ProgressionCoordinator};
pub use error::{Result, ShatterError};
pub use events::{EventQueue, ProgressionEvent};
pub use journal::MemoryJournal;
pub use memory::{MemoryCatalog, MemoryCategory, MemoryRecord};
pub use persistence::{SaveState, SaveStore};
pub use player::{PlayerState, PlayerStateChange, PlayerStateMachine};
pub use state::{GameState, GameStateMachine, ResumePolicy, StateChange};
pub use stats::{EnergyPool, PlayerStatBlock};
pub use store::MemoryStore;
pub use types::*;
