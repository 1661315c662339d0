//! Progression coordinator: the single entry point the host calls into.
//!
//! The coordinator owns every piece of per-session state (memory store, stat
//! block, energy, ability registry, journal and state machine) and applies
//! host inputs to them in call order. Each input either succeeds completely
//! or fails before mutating anything. Side effects the presentation layer
//! cares about are pushed to an [`EventQueue`] drained by the host.
//!
//! # Collection
//!
//! ```text
//! collect(id)
//!   ├─ look up record            (NotFound → fail, nothing changed)
//!   ├─ mark collected            (already collected → no-op)
//!   ├─ journal node + peer edges (both directions)
//!   ├─ category effect
//!   │    Core       → boost, heal, WorldChangesTriggered
//!   │    Skill      → unlock, active set, AbilityUnlocked
//!   │    Peripheral → nothing further
//!   └─ MemoryCollected
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::abilities::{AbilityRegistry, AbilityUse};
use crate::config::ShatterConfig;
use crate::error::{Result, ShatterError};
use crate::events::{EventQueue, ProgressionEvent};
use crate::journal::MemoryJournal;
use crate::memory::{AbilityUpgrade, MemoryCatalog, MemoryPayload, MemoryRecord};
use crate::persistence::{CollectedEntry, SAVE_FORMAT_VERSION, SaveState};
use crate::player::{PlayerState, PlayerStateChange, PlayerStateMachine};
use crate::state::{GameState, GameStateMachine, StateChange};
use crate::stats::{EnergyPool, PlayerStatBlock};
use crate::store::{MarkOutcome, MemoryStore};
use crate::types::{AbilityId, GameTimestamp, MemoryId, SessionId, WorldContext};

/// Where a collection is in its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectPhase {
    /// No collection in progress.
    #[default]
    Idle,
    /// Record marked collected; effects not yet applied.
    Collecting,
    /// Effects applied; completion event pending.
    Applied,
}

/// Result of [`ProgressionCoordinator::collect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// First collection; effects applied and events raised.
    Collected,
    /// Already collected; nothing changed.
    AlreadyCollected,
}

/// Per-session progression state.
#[derive(Debug)]
pub struct ProgressionCoordinator {
    config: ShatterConfig,
    session_id: SessionId,
    store: MemoryStore,
    stats: PlayerStatBlock,
    energy: EnergyPool,
    abilities: AbilityRegistry,
    journal: MemoryJournal,
    machine: GameStateMachine,
    player: PlayerStateMachine,
    events: EventQueue,
    phase: CollectPhase,
    upgrades: Vec<AbilityUpgrade>,
    death_reported: bool,
}

impl ProgressionCoordinator {
    /// Start a session over `definitions`.
    ///
    /// # Errors
    /// - [`ShatterError::Config`] if the config fails validation or a core
    ///   memory has story phase 0.
    /// - [`ShatterError::DuplicateId`] if two definitions share an id.
    pub fn new<I>(config: ShatterConfig, definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = MemoryRecord>,
    {
        config.validate()?;
        let store = MemoryStore::load(definitions)?;
        let stats = PlayerStatBlock::new(&config.stats);
        let energy = EnergyPool::new(stats.max_energy(), config.stats.starting_energy_fraction);
        let abilities = AbilityRegistry::new(config.abilities.max_active_slots);
        let machine = GameStateMachine::new(config.state.resume_policy);
        let session_id = SessionId::new();

        info!(
            session = %session_id,
            memories = store.len(),
            core_memories = store.total_core_count(),
            "Progression session created"
        );

        Ok(Self {
            config,
            session_id,
            store,
            stats,
            energy,
            abilities,
            journal: MemoryJournal::new(),
            machine,
            player: PlayerStateMachine::new(),
            events: EventQueue::new(),
            phase: CollectPhase::Idle,
            upgrades: Vec::new(),
            death_reported: false,
        })
    }

    /// Start a session over a parsed catalog.
    ///
    /// # Errors
    /// As for [`ProgressionCoordinator::new`].
    pub fn from_catalog(config: ShatterConfig, catalog: MemoryCatalog) -> Result<Self> {
        Self::new(config, catalog.memories)
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Collect the memory `id` at `timestamp`.
    ///
    /// # Errors
    /// Returns [`ShatterError::NotFound`] for an unknown id. Nothing is
    /// changed in that case.
    pub fn collect(&mut self, id: &MemoryId, timestamp: GameTimestamp) -> Result<CollectOutcome> {
        let record = Arc::clone(self.store.get(id)?);

        self.phase = CollectPhase::Collecting;
        if self.store.mark_collected(id, timestamp)? == MarkOutcome::AlreadyCollected {
            self.phase = CollectPhase::Idle;
            return Ok(CollectOutcome::AlreadyCollected);
        }

        self.journal.add_node(Arc::clone(&record), timestamp);
        self.wire_journal(&record);

        match &record.payload {
            MemoryPayload::Core(core) => {
                #[allow(clippy::cast_precision_loss)]
                let boost = self.config.stats.core_boost_per_phase * core.story_phase as f32;
                self.stats.add_boost(record.id.as_str(), boost);
                if self.config.stats.heal_on_core_collect {
                    self.stats.restore_to_full();
                }
                self.sync_stats();
                self.events.push(ProgressionEvent::WorldChangesTriggered {
                    memory: record.id.clone(),
                    changes: core.world_changes.clone(),
                });
            }
            MemoryPayload::Skill(_) => self.unlock_from(&record),
            MemoryPayload::Peripheral(_) => {}
        }

        self.phase = CollectPhase::Applied;
        info!(
            memory = %record.id,
            category = %record.category(),
            tick = timestamp.tick,
            progress = self.store.progress(),
            "Memory collected"
        );
        self.events.push(ProgressionEvent::MemoryCollected {
            record,
            timestamp,
        });
        self.phase = CollectPhase::Idle;
        Ok(CollectOutcome::Collected)
    }

    /// Connect a freshly added node to collected peers, in both directions.
    fn wire_journal(&mut self, record: &MemoryRecord) {
        for peer in record.peers() {
            if self.journal.contains(peer) {
                if let Err(e) = self.journal.connect(&record.id, peer) {
                    warn!(memory = %record.id, peer = %peer, error = %e, "Journal link skipped");
                }
            }
        }
        for referrer in self.store.referrers(&record.id) {
            if self.journal.contains(referrer) {
                if let Err(e) = self.journal.connect(referrer, &record.id) {
                    warn!(memory = %record.id, peer = %referrer, error = %e, "Journal link skipped");
                }
            }
        }
    }

    fn unlock_from(&mut self, record: &MemoryRecord) {
        let newly = self.abilities.unlock_from_skill_memory(record);
        self.abilities.recompute_active_set(self.world_context());
        if newly {
            if let Some(ability) = record.ability() {
                self.events.push(ProgressionEvent::AbilityUnlocked {
                    ability: ability.clone(),
                    source: record.id.clone(),
                });
            }
        }
    }

    /// Replay a collected memory as a flashback.
    ///
    /// Returns the new view count.
    ///
    /// # Errors
    /// - [`ShatterError::NotFound`] for an unknown id.
    /// - [`ShatterError::NotCollected`] if it has not been collected.
    /// - [`ShatterError::IllegalTransition`] outside the two world states.
    pub fn view_memory(&mut self, id: &MemoryId) -> Result<u32> {
        self.store.get(id)?;
        if !self.store.is_collected(id) {
            return Err(ShatterError::NotCollected(id.clone()));
        }
        let hints: Vec<String> = self
            .store
            .uncollected_peers(id)?
            .into_iter()
            .map(str::to_string)
            .collect();

        let change = self.machine.begin_flashback(id.clone())?;
        let view_count = self.store.record_view(id)?;
        self.push_state_change(change);
        self.events.push(ProgressionEvent::MemoryViewed {
            memory: id.clone(),
            view_count,
            connection_hints: hints,
        });
        Ok(view_count)
    }

    /// Leave the flashback and return to the world it was opened from.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Flashback`.
    pub fn acknowledge_flashback(&mut self) -> Result<StateChange> {
        let change = self.machine.end_flashback()?;
        self.push_state_change(change);
        Ok(change)
    }

    /// Unlock the ability of the collected skill memory `id`.
    ///
    /// Returns `true` on first unlock; non-skill memories unlock nothing.
    /// Collection already unlocks, so this only matters after the registry
    /// was reset independently of the store.
    ///
    /// # Errors
    /// - [`ShatterError::NotFound`] for an unknown id.
    /// - [`ShatterError::NotCollected`] if the memory has not been collected.
    pub fn unlock_ability(&mut self, id: &MemoryId) -> Result<bool> {
        let record = Arc::clone(self.store.get(id)?);
        if !self.store.is_collected(id) {
            warn!(memory = %id, "Unlock refused for uncollected memory");
            return Err(ShatterError::NotCollected(id.clone()));
        }
        let before = self.abilities.unlocked().count();
        self.unlock_from(&record);
        Ok(self.abilities.unlocked().count() > before)
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Upsert a stat boost from an arbitrary source.
    pub fn add_boost(&mut self, source: impl Into<String>, amount: f32) {
        self.stats.add_boost(source, amount);
        self.sync_stats();
    }

    /// Remove a stat boost. Returns the removed amount.
    pub fn remove_boost(&mut self, source: &str) -> Option<f32> {
        let removed = self.stats.remove_boost(source);
        self.sync_stats();
        removed
    }

    /// Apply a hit and return the damage dealt.
    ///
    /// Raises [`ProgressionEvent::PlayerDied`] the first time health reaches
    /// zero; further hits while dead raise nothing.
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let dealt = self.stats.take_damage(amount);
        if self.stats.is_dead() && !self.death_reported {
            self.death_reported = true;
            warn!(damage = dealt, "Player died");
            self.events.push(ProgressionEvent::PlayerDied);
        }
        dealt
    }

    /// Restore health and return the amount healed.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let healed = self.stats.heal(amount);
        self.sync_stats();
        healed
    }

    /// Switch dream modifiers on. Returns `false` if already on.
    pub fn enter_dream_context(&mut self) -> bool {
        self.set_context(WorldContext::Dream)
    }

    /// Switch dream modifiers off. Returns `false` if already off.
    pub fn exit_dream_context(&mut self) -> bool {
        self.set_context(WorldContext::Waking)
    }

    fn set_context(&mut self, context: WorldContext) -> bool {
        let changed = self.stats.set_dream_context(context.is_dream());
        if changed {
            self.abilities.recompute_active_set(context);
            self.sync_stats();
            info!(?context, "World context changed");
        }
        changed
    }

    /// Keep energy capacity and the death latch in line with the stat block.
    fn sync_stats(&mut self) {
        self.energy.set_max(self.stats.max_energy());
        if !self.stats.is_dead() {
            self.death_reported = false;
        }
    }

    // ------------------------------------------------------------------
    // Abilities and energy
    // ------------------------------------------------------------------

    /// Use an ability, deducting its cost from the energy pool.
    ///
    /// The returned receipt carries the cooldown for the host to run.
    ///
    /// # Errors
    /// - [`ShatterError::AbilityNotFound`] if the ability is not unlocked.
    /// - [`ShatterError::AbilityUnavailable`] if it is not active.
    /// - [`ShatterError::InsufficientEnergy`] if energy is short.
    pub fn use_ability(&mut self, id: &AbilityId) -> Result<AbilityUse> {
        let receipt = self.abilities.use_ability(id, self.energy.current())?;
        self.energy.spend(receipt.cost);
        info!(
            ability = %id,
            cost = receipt.cost,
            energy = self.energy.current(),
            "Ability used"
        );
        Ok(receipt)
    }

    /// Use the ability in active `slot`. Returns `None` for an empty slot.
    ///
    /// # Errors
    /// As for [`ProgressionCoordinator::use_ability`].
    pub fn use_ability_slot(&mut self, slot: usize) -> Result<Option<AbilityUse>> {
        let Some(id) = self.abilities.ability_in_slot(slot).map(|a| a.id.clone()) else {
            debug!(slot, "Ability slot empty");
            return Ok(None);
        };
        self.use_ability(&id).map(Some)
    }

    /// Apply an ability upgrade.
    ///
    /// # Errors
    /// Returns [`ShatterError::AbilityNotFound`] if the target is not unlocked.
    pub fn apply_upgrade(&mut self, upgrade: AbilityUpgrade) -> Result<()> {
        self.abilities.apply_upgrade(&upgrade)?;
        self.upgrades.push(upgrade);
        Ok(())
    }

    /// Regenerate energy for `seconds` at the derived regen rate.
    pub fn regen_energy(&mut self, seconds: f32) -> f32 {
        self.energy.regenerate(self.stats.energy_regen(), seconds)
    }

    /// Add energy from a pickup. Returns the amount actually gained.
    pub fn restore_energy(&mut self, amount: f32) -> f32 {
        self.energy.add(amount)
    }

    // ------------------------------------------------------------------
    // Game modes
    // ------------------------------------------------------------------

    /// `Menu → Waking`.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Menu`.
    pub fn start_game(&mut self) -> Result<StateChange> {
        let change = self.machine.start_game()?;
        self.land(change);
        Ok(change)
    }

    /// Request a world change. See
    /// [`GameStateMachine::request_transition`].
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] for an illegal request.
    pub fn request_transition(&mut self, target: GameState) -> Result<Option<StateChange>> {
        let change = self.machine.request_transition(target)?;
        if let Some(change) = change {
            self.land(change);
        }
        Ok(change)
    }

    /// Commit the pending transition and switch world context to match.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless in `Transition`.
    pub fn resolve_transition(&mut self) -> Result<StateChange> {
        let change = self.machine.resolve_transition()?;
        self.land(change);
        Ok(change)
    }

    /// Open the pause menu.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] outside the two world states.
    pub fn pause(&mut self) -> Result<StateChange> {
        let change = self.machine.pause()?;
        self.land(change);
        Ok(change)
    }

    /// Close the pause menu.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless paused.
    pub fn resume(&mut self) -> Result<StateChange> {
        let change = self.machine.resume()?;
        self.land(change);
        Ok(change)
    }

    /// Quit from the pause menu to the title screen.
    ///
    /// # Errors
    /// [`ShatterError::IllegalTransition`] unless paused.
    pub fn return_to_menu(&mut self) -> Result<StateChange> {
        let change = self.machine.return_to_menu()?;
        self.land(change);
        Ok(change)
    }

    /// Record a state change and, when it lands in a world, match the
    /// world context to it.
    fn land(&mut self, change: StateChange) {
        self.push_state_change(change);
        match change.to {
            GameState::Waking => {
                self.exit_dream_context();
            }
            GameState::Dream => {
                self.enter_dream_context();
            }
            _ => {}
        }
    }

    fn push_state_change(&mut self, change: StateChange) {
        self.player.follow(change.to);
        self.events.push(ProgressionEvent::StateChanged(change));
    }

    // ------------------------------------------------------------------
    // Player character
    // ------------------------------------------------------------------

    /// Put the character into combat. `None` unless `Normal`.
    pub fn enter_combat(&mut self) -> Option<PlayerStateChange> {
        self.player.enter_combat()
    }

    /// Take the character out of combat. `None` unless `InCombat`.
    pub fn exit_combat(&mut self) -> Option<PlayerStateChange> {
        self.player.exit_combat()
    }

    /// Lock character input. `None` if already disabled.
    pub fn disable_player(&mut self) -> Option<PlayerStateChange> {
        self.player.disable()
    }

    /// Unlock character input into the state the game mode implies.
    pub fn enable_player(&mut self) -> Option<PlayerStateChange> {
        self.player.enable(self.machine.current())
    }

    /// Throw away all progress and start a new playthrough in `Menu`.
    pub fn new_game(&mut self) {
        self.store.reset();
        self.stats.reset();
        self.energy = EnergyPool::new(
            self.stats.max_energy(),
            self.config.stats.starting_energy_fraction,
        );
        self.abilities.reset();
        self.journal.clear();
        self.machine.reset();
        self.player.reset();
        self.events.clear();
        self.upgrades.clear();
        self.phase = CollectPhase::Idle;
        self.death_reported = false;
        self.session_id = SessionId::new();
        info!(session = %self.session_id, "New game started");
    }

    // ------------------------------------------------------------------
    // Save / restore
    // ------------------------------------------------------------------

    /// Capture the session for a save.
    #[must_use]
    pub fn snapshot(&self) -> SaveState {
        let collected = self
            .store
            .collected_ids()
            .iter()
            .filter_map(|id| {
                self.store.collected_at(id).map(|timestamp| CollectedEntry {
                    id: id.clone(),
                    timestamp,
                })
            })
            .collect();

        SaveState {
            version: SAVE_FORMAT_VERSION,
            session_id: self.session_id,
            saved_at: chrono::Utc::now(),
            collected,
            boosts: self.stats.boosts().clone(),
            dream_context: self.stats.is_dream_context(),
            machine: self.machine.snapshot(),
            current_health: self.stats.current_health(),
            current_energy: self.energy.current(),
            upgrades: self.upgrades.clone(),
            player: self.player.current(),
        }
    }

    /// Rebuild a session from a save.
    ///
    /// Collections are replayed in timestamp order. The saved boost map then
    /// replaces whatever the replay produced, and world context, state
    /// machine, health and energy are applied on top.
    /// Events raised by the replay are discarded.
    ///
    /// # Errors
    /// - Any load error from [`ProgressionCoordinator::new`].
    /// - [`ShatterError::NotFound`] if the save names an unknown memory.
    /// - [`ShatterError::AbilityNotFound`] if an upgrade targets an ability
    ///   the replay did not unlock.
    pub fn restore<I>(config: ShatterConfig, definitions: I, save: &SaveState) -> Result<Self>
    where
        I: IntoIterator<Item = MemoryRecord>,
    {
        let mut session = Self::new(config, definitions)?;
        session.session_id = save.session_id;

        for entry in save.replay_order() {
            session.collect(&entry.id, entry.timestamp)?;
        }
        for upgrade in &save.upgrades {
            session.apply_upgrade(upgrade.clone())?;
        }
        session.stats.replace_boosts(save.boosts.clone());

        let context = if save.dream_context {
            WorldContext::Dream
        } else {
            WorldContext::Waking
        };
        session.stats.set_dream_context(save.dream_context);
        session.abilities.recompute_active_set(context);
        session.machine =
            GameStateMachine::from_snapshot(save.machine.clone(), session.config.state.resume_policy);
        session.player = PlayerStateMachine::from_state(save.player);

        session.stats.set_current_health(save.current_health);
        session.energy.set_max(session.stats.max_energy());
        session.energy.set_current(save.current_energy);
        session.death_reported = session.stats.is_dead();
        session.events.clear();

        info!(
            session = %session.session_id,
            collected = save.collected.len(),
            state = %session.machine.current(),
            "Progression session restored"
        );
        Ok(session)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Take all pending events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ProgressionEvent> {
        self.events.drain().collect()
    }

    /// Pending events.
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Current world context.
    #[must_use]
    pub fn world_context(&self) -> WorldContext {
        if self.stats.is_dream_context() {
            WorldContext::Dream
        } else {
            WorldContext::Waking
        }
    }

    /// Current game state.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.machine.current()
    }

    /// The state machine.
    #[must_use]
    pub fn machine(&self) -> &GameStateMachine {
        &self.machine
    }

    /// Current player character state.
    #[must_use]
    pub fn player_state(&self) -> PlayerState {
        self.player.current()
    }

    /// The memory store.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The stat block.
    #[must_use]
    pub fn stats(&self) -> &PlayerStatBlock {
        &self.stats
    }

    /// The energy pool.
    #[must_use]
    pub fn energy(&self) -> &EnergyPool {
        &self.energy
    }

    /// The ability registry.
    #[must_use]
    pub fn abilities(&self) -> &AbilityRegistry {
        &self.abilities
    }

    /// The journal.
    #[must_use]
    pub fn journal(&self) -> &MemoryJournal {
        &self.journal
    }

    /// The configuration the session was created with.
    #[must_use]
    pub fn config(&self) -> &ShatterConfig {
        &self.config
    }

    /// This playthrough's id.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Collection pipeline phase. `Idle` between calls.
    #[must_use]
    pub fn phase(&self) -> CollectPhase {
        self.phase
    }

    /// Story progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.store.progress()
    }
}
