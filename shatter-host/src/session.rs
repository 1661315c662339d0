//! A running game session: routes engine inputs into the progression core
//! and drives the host-side timers from the frame loop.
//!
//! ## Per-frame flow
//!
//! ```text
//! engine inputs ──handle()──▶ ProgressionCoordinator
//! frame tick    ──update()──▶ transition timer, ability cooldowns, resonance,
//!                               energy regen
//! presentation  ◀─drain_events() / HudSnapshot::capture()
//! ```

use std::collections::{HashMap, HashSet};

use shatter_core::memory::MemoryCatalog;
use shatter_core::persistence::SaveState;
use shatter_core::{
    AbilityId, CollectOutcome, GameState, GameTimestamp, ProgressionCoordinator, ProgressionEvent,
    Result,
};
use tracing::{debug, info};

use crate::config::HostConfig;
use crate::gates::{GateKind, MemoryGate};
use crate::resonance::{Resonance, ResonanceConfig};
use crate::timer::TransitionTimer;
use crate::triggers::HostInput;

/// What happened to one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// The input changed the session.
    Applied,
    /// The input was refused; presentation may show why.
    Blocked(BlockReason),
    /// The input had nothing to do in the current state.
    Ignored,
}

/// Why an input was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The gate's required memory is not collected, or it is locked.
    GateLocked,
    /// The gate cannot be used from the current world.
    WrongWorld,
    /// The ability is still cooling down.
    OnCooldown,
    /// No ability in that slot.
    EmptySlot,
    /// The character is transitioning, in a flashback or disabled.
    PlayerUnavailable,
    /// The gate is hidden until a resonance reveals it.
    Hidden,
}

/// One play session.
#[derive(Debug)]
pub struct GameSession {
    coordinator: ProgressionCoordinator,
    timer: TransitionTimer,
    gates: HashMap<String, MemoryGate>,
    revealed: HashSet<String>,
    resonance: Resonance,
    cooldowns: HashMap<AbilityId, f32>,
    tick: u64,
}

impl GameSession {
    /// Start a fresh session in `Menu`.
    ///
    /// # Errors
    /// Any load error from [`ProgressionCoordinator::new`].
    pub fn new(config: HostConfig, catalog: MemoryCatalog) -> Result<Self> {
        let coordinator = ProgressionCoordinator::from_catalog(config.core, catalog)?;
        Ok(Self::with_coordinator(
            coordinator,
            config.session.transition_duration_secs,
            &config.resonance,
            config.gates,
        ))
    }

    /// Rebuild a session from a save.
    ///
    /// # Errors
    /// Any error from [`ProgressionCoordinator::restore`].
    pub fn restore(config: HostConfig, catalog: MemoryCatalog, save: &SaveState) -> Result<Self> {
        let coordinator = ProgressionCoordinator::restore(config.core, catalog.memories, save)?;
        let mut session = Self::with_coordinator(
            coordinator,
            config.session.transition_duration_secs,
            &config.resonance,
            config.gates,
        );
        session.tick = save
            .collected
            .iter()
            .map(|e| e.timestamp.tick)
            .max()
            .unwrap_or(0);
        if session.state() == GameState::Transition {
            session.timer.start();
        }
        Ok(session)
    }

    fn with_coordinator(
        coordinator: ProgressionCoordinator,
        transition_duration_secs: f32,
        resonance: &ResonanceConfig,
        gates: Vec<MemoryGate>,
    ) -> Self {
        Self {
            coordinator,
            timer: TransitionTimer::new(transition_duration_secs),
            gates: gates.into_iter().map(|g| (g.id.clone(), g)).collect(),
            revealed: HashSet::new(),
            resonance: Resonance::new(resonance),
            cooldowns: HashMap::new(),
            tick: 0,
        }
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Apply one engine input.
    ///
    /// # Errors
    /// Whatever the coordinator rejects: illegal transitions, unknown
    /// memories, insufficient energy. The session is unchanged on error.
    pub fn handle(&mut self, input: HostInput) -> Result<InputOutcome> {
        debug!(input = input.kind(), state = %self.state(), "Host input");
        match input {
            HostInput::StartGame => {
                self.coordinator.start_game()?;
                Ok(InputOutcome::Applied)
            }
            HostInput::MemoryTouched { memory, gate } => {
                if !self.state().is_world() {
                    return Ok(InputOutcome::Ignored);
                }
                if !self.coordinator.player_state().can_act() {
                    return Ok(InputOutcome::Blocked(BlockReason::PlayerUnavailable));
                }
                if let Some(gate) = gate {
                    if let Some(reason) = self.check_gate(&gate, GateKind::HiddenTrigger) {
                        return Ok(InputOutcome::Blocked(reason));
                    }
                }
                let outcome = self.coordinator.collect(&memory, GameTimestamp::now(self.tick))?;
                Ok(match outcome {
                    CollectOutcome::Collected => InputOutcome::Applied,
                    CollectOutcome::AlreadyCollected => InputOutcome::Ignored,
                })
            }
            HostInput::SleepPointUsed { gate } => {
                self.use_world_gate(&gate, GateKind::SleepPoint, GameState::Dream)
            }
            HostInput::DreamExitReached { gate } => {
                self.use_world_gate(&gate, GateKind::DreamExit, GameState::Waking)
            }
            HostInput::PauseToggled => {
                match self.state() {
                    GameState::Paused => self.coordinator.resume()?,
                    GameState::Waking | GameState::Dream => self.coordinator.pause()?,
                    _ => return Ok(InputOutcome::Ignored),
                };
                Ok(InputOutcome::Applied)
            }
            HostInput::QuitToMenu => {
                self.coordinator.return_to_menu()?;
                self.timer.cancel();
                self.cooldowns.clear();
                self.resonance.reset();
                Ok(InputOutcome::Applied)
            }
            HostInput::FlashbackDismissed => {
                self.coordinator.acknowledge_flashback()?;
                Ok(InputOutcome::Applied)
            }
            HostInput::DamageTaken(amount) => {
                self.coordinator.take_damage(amount);
                Ok(InputOutcome::Applied)
            }
            HostInput::EnergyPickup(amount) => {
                self.coordinator.restore_energy(amount);
                Ok(InputOutcome::Applied)
            }
            HostInput::AbilitySlotPressed(slot) => self.press_slot(slot),
            HostInput::MemoryViewed(memory) => {
                self.coordinator.view_memory(&memory)?;
                Ok(InputOutcome::Applied)
            }
            HostInput::ResonanceActivated => Ok(self.activate_resonance()),
            HostInput::CombatStarted => Ok(applied_if(self.coordinator.enter_combat().is_some())),
            HostInput::CombatEnded => Ok(applied_if(self.coordinator.exit_combat().is_some())),
            HostInput::PlayerDisabled => Ok(applied_if(self.coordinator.disable_player().is_some())),
            HostInput::PlayerEnabled => Ok(applied_if(self.coordinator.enable_player().is_some())),
        }
    }

    /// Request a world change and (re)start the hold timer.
    ///
    /// A request made while already in `Transition` supersedes the pending
    /// one and restarts the countdown.
    ///
    /// # Errors
    /// [`shatter_core::ShatterError::IllegalTransition`] for an illegal
    /// request.
    pub fn request_transition(&mut self, target: GameState) -> Result<()> {
        self.coordinator.request_transition(target)?;
        if self.state() == GameState::Transition {
            self.timer.start();
        } else {
            self.timer.cancel();
        }
        Ok(())
    }

    fn use_world_gate(
        &mut self,
        gate: &str,
        kind: GateKind,
        target: GameState,
    ) -> Result<InputOutcome> {
        if let Some(reason) = self.check_gate(gate, kind) {
            return Ok(InputOutcome::Blocked(reason));
        }
        self.request_transition(target)?;
        info!(gate, ?kind, target = %target, "World gate used");
        Ok(InputOutcome::Applied)
    }

    /// Unregistered gate ids behave as open gates of `kind`.
    fn check_gate(&self, gate: &str, kind: GateKind) -> Option<BlockReason> {
        let state = self.state();
        let Some(gate) = self.gates.get(gate) else {
            return match kind.usable_from() {
                Some(required) if required != state => Some(BlockReason::WrongWorld),
                _ => None,
            };
        };
        if !gate.usable_in(state) {
            return Some(BlockReason::WrongWorld);
        }
        if gate.requires_resonance && !self.revealed.contains(&gate.id) {
            return Some(BlockReason::Hidden);
        }
        if !gate.is_open(self.coordinator.store()) {
            return Some(BlockReason::GateLocked);
        }
        None
    }

    fn press_slot(&mut self, slot: usize) -> Result<InputOutcome> {
        if !self.coordinator.player_state().can_act() {
            return Ok(InputOutcome::Blocked(BlockReason::PlayerUnavailable));
        }
        let Some(id) = self
            .coordinator
            .abilities()
            .ability_in_slot(slot)
            .map(|a| a.id.clone())
        else {
            return Ok(InputOutcome::Blocked(BlockReason::EmptySlot));
        };
        if self.cooldown_remaining(&id) > 0.0 {
            return Ok(InputOutcome::Blocked(BlockReason::OnCooldown));
        }
        let receipt = self.coordinator.use_ability(&id)?;
        self.cooldowns.insert(id, receipt.cooldown_secs);
        Ok(InputOutcome::Applied)
    }

    fn activate_resonance(&mut self) -> InputOutcome {
        if !self.state().is_world() {
            return InputOutcome::Ignored;
        }
        if !self.coordinator.player_state().can_act() {
            return InputOutcome::Blocked(BlockReason::PlayerUnavailable);
        }
        if !self.resonance.activate() {
            debug!(
                cooldown = self.resonance.cooldown_remaining(),
                "Resonance on cooldown"
            );
            return InputOutcome::Blocked(BlockReason::OnCooldown);
        }
        let revealed = self.reveal_hidden();
        info!(revealed = revealed.len(), "Memory resonance activated");
        InputOutcome::Applied
    }

    /// Reveal every resonance gate whose requirement is met. Returns the
    /// gates revealed by this call.
    fn reveal_hidden(&mut self) -> Vec<String> {
        let store = self.coordinator.store();
        let fresh: Vec<String> = self
            .gates
            .values()
            .filter(|g| !self.revealed.contains(&g.id) && g.revealable(store))
            .map(|g| g.id.clone())
            .collect();
        for id in &fresh {
            info!(gate = %id, "Hidden gate revealed");
            self.revealed.insert(id.clone());
        }
        fresh
    }

    // ------------------------------------------------------------------
    // Frame update
    // ------------------------------------------------------------------

    /// Advance host-side time by `dt` seconds.
    ///
    /// Resolves the transition when its hold elapses and regenerates energy
    /// while the player is in a world. Ability cooldowns and resonance tick
    /// in the worlds and during transitions; an open resonance window keeps
    /// revealing gates whose requirement becomes met.
    ///
    /// # Errors
    /// Propagates a failed transition resolve.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        self.tick += 1;
        let state = self.state();

        if matches!(state, GameState::Waking | GameState::Dream | GameState::Transition) {
            for remaining in self.cooldowns.values_mut() {
                *remaining -= dt;
            }
            self.cooldowns.retain(|_, remaining| *remaining > 0.0);
            self.resonance.advance(dt);
            if self.resonance.is_active() {
                self.reveal_hidden();
            }
        }

        match state {
            GameState::Transition => {
                if !self.timer.is_running() {
                    self.timer.start();
                }
                if self.timer.advance(dt) {
                    self.coordinator.resolve_transition()?;
                }
            }
            GameState::Waking | GameState::Dream => {
                self.coordinator.regen_energy(dt);
            }
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Take all pending progression events.
    pub fn drain_events(&mut self) -> Vec<ProgressionEvent> {
        self.coordinator.drain_events()
    }

    /// Current game state.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.coordinator.state()
    }

    /// The progression core.
    #[must_use]
    pub fn coordinator(&self) -> &ProgressionCoordinator {
        &self.coordinator
    }

    /// Save the session.
    #[must_use]
    pub fn snapshot(&self) -> SaveState {
        self.coordinator.snapshot()
    }

    /// The transition hold timer.
    #[must_use]
    pub fn timer(&self) -> &TransitionTimer {
        &self.timer
    }

    /// Seconds of cooldown left on `id`; zero when ready.
    #[must_use]
    pub fn cooldown_remaining(&self, id: &AbilityId) -> f32 {
        self.cooldowns.get(id).copied().unwrap_or(0.0)
    }

    /// Memory resonance timers.
    #[must_use]
    pub fn resonance(&self) -> &Resonance {
        &self.resonance
    }

    /// Whether resonance has revealed `gate`.
    #[must_use]
    pub fn is_revealed(&self, gate: &str) -> bool {
        self.revealed.contains(gate)
    }

    /// Frames elapsed; used as the collection tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

fn applied_if(changed: bool) -> InputOutcome {
    if changed {
        InputOutcome::Applied
    } else {
        InputOutcome::Ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shatter_core::memory::{AbilityDefinition, MemoryRecord};
    use shatter_core::{MemoryId, ShatterError};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog {
            memories: vec![
                MemoryRecord::core("core_key", "Key", 1),
                MemoryRecord::core("core_hidden", "Hidden", 2),
                MemoryRecord::skill(
                    "skill_dash",
                    "Dash",
                    AbilityDefinition::new("dash", "Dash", 10.0)
                        .usable_while_awake()
                        .with_cooldown(1.0),
                ),
            ],
        }
    }

    fn config() -> HostConfig {
        let mut config = HostConfig::default();
        config.session.transition_duration_secs = 1.0;
        config.gates = vec![
            MemoryGate::new("portal", GateKind::DreamExit).requiring("core_key"),
            MemoryGate::new("cache", GateKind::HiddenTrigger).requiring("core_key"),
            MemoryGate::new("shrine", GateKind::HiddenTrigger)
                .requiring("core_key")
                .hidden_until_resonance(),
        ];
        config
    }

    fn started() -> GameSession {
        let mut session = GameSession::new(config(), catalog()).expect("session");
        session.handle(HostInput::StartGame).expect("start");
        session
    }

    fn run(session: &mut GameSession, frames: usize, dt: f32) {
        for _ in 0..frames {
            session.update(dt).expect("update");
        }
    }

    #[test]
    fn sleep_point_resolves_after_hold() {
        let mut session = started();
        let outcome = session
            .handle(HostInput::SleepPointUsed { gate: "bed".to_string() })
            .expect("sleep");
        assert_eq!(outcome, InputOutcome::Applied);
        assert_eq!(session.state(), GameState::Transition);

        run(&mut session, 1, 0.6);
        assert_eq!(session.state(), GameState::Transition);
        run(&mut session, 1, 0.6);
        assert_eq!(session.state(), GameState::Dream);
        assert!(session.coordinator().stats().is_dream_context());
    }

    #[test]
    fn dream_exit_waits_for_its_memory() {
        let mut session = started();
        session
            .handle(HostInput::SleepPointUsed { gate: "bed".to_string() })
            .expect("sleep");
        run(&mut session, 2, 0.6);

        let exit = HostInput::DreamExitReached { gate: "portal".to_string() };
        assert_eq!(
            session.handle(exit.clone()).expect("exit"),
            InputOutcome::Blocked(BlockReason::GateLocked)
        );
        session.handle(HostInput::touch("core_key")).expect("touch");
        assert_eq!(session.handle(exit).expect("exit"), InputOutcome::Applied);
    }

    #[test]
    fn sleep_point_is_refused_in_dream() {
        let mut session = started();
        session
            .handle(HostInput::SleepPointUsed { gate: "bed".to_string() })
            .expect("sleep");
        run(&mut session, 2, 0.6);
        assert_eq!(
            session
                .handle(HostInput::SleepPointUsed { gate: "bed".to_string() })
                .expect("sleep"),
            InputOutcome::Blocked(BlockReason::WrongWorld)
        );
    }

    #[test]
    fn hidden_memory_needs_its_gate_open() {
        let mut session = started();
        let touch = HostInput::touch_hidden("core_hidden", "cache");
        assert_eq!(
            session.handle(touch.clone()).expect("touch"),
            InputOutcome::Blocked(BlockReason::GateLocked)
        );
        session.handle(HostInput::touch("core_key")).expect("touch");
        assert_eq!(session.handle(touch.clone()).expect("touch"), InputOutcome::Applied);
        assert_eq!(session.handle(touch).expect("touch"), InputOutcome::Ignored);
    }

    #[test]
    fn ability_cooldown_blocks_until_elapsed() {
        let mut session = started();
        session.handle(HostInput::touch("skill_dash")).expect("touch");
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(0)).expect("press"),
            InputOutcome::Applied
        );
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(0)).expect("press"),
            InputOutcome::Blocked(BlockReason::OnCooldown)
        );
        run(&mut session, 2, 0.6);
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(0)).expect("press"),
            InputOutcome::Applied
        );
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(3)).expect("press"),
            InputOutcome::Blocked(BlockReason::EmptySlot)
        );
    }

    #[test]
    fn pause_toggle_round_trips_and_quit_cancels_timer() {
        let mut session = started();
        session.handle(HostInput::PauseToggled).expect("pause");
        assert_eq!(session.state(), GameState::Paused);
        session.handle(HostInput::PauseToggled).expect("resume");
        assert_eq!(session.state(), GameState::Waking);

        session.handle(HostInput::PauseToggled).expect("pause");
        session.handle(HostInput::QuitToMenu).expect("quit");
        assert_eq!(session.state(), GameState::Menu);
        assert!(!session.timer().is_running());
    }

    #[test]
    fn superseding_request_restarts_hold() {
        let mut session = started();
        session.request_transition(GameState::Dream).expect("request");
        run(&mut session, 1, 0.9);
        session.request_transition(GameState::Waking).expect("supersede");
        run(&mut session, 1, 0.5);
        assert_eq!(session.state(), GameState::Transition);
        run(&mut session, 1, 0.6);
        assert_eq!(session.state(), GameState::Waking);
    }

    #[test]
    fn rejected_input_leaves_state_alone() {
        let mut session = GameSession::new(config(), catalog()).expect("session");
        assert!(matches!(
            session.handle(HostInput::FlashbackDismissed),
            Err(ShatterError::IllegalTransition { .. })
        ));
        assert_eq!(
            session.handle(HostInput::touch("core_key")).expect("touch"),
            InputOutcome::Ignored
        );
        assert!(!session.coordinator().store().is_collected(&MemoryId::from("core_key")));
    }

    #[test]
    fn resonance_reveals_hidden_gate_once_requirement_met() {
        let mut session = started();
        let touch = HostInput::touch_hidden("core_hidden", "shrine");
        assert_eq!(
            session.handle(touch.clone()).expect("touch"),
            InputOutcome::Blocked(BlockReason::Hidden)
        );

        assert_eq!(
            session.handle(HostInput::ResonanceActivated).expect("resonate"),
            InputOutcome::Applied
        );
        assert!(!session.is_revealed("shrine"));
        assert_eq!(
            session.handle(HostInput::ResonanceActivated).expect("resonate"),
            InputOutcome::Blocked(BlockReason::OnCooldown)
        );

        session.handle(HostInput::touch("core_key")).expect("touch");
        run(&mut session, 1, 0.1);
        assert!(session.is_revealed("shrine"));
        assert_eq!(session.handle(touch).expect("touch"), InputOutcome::Applied);
    }

    #[test]
    fn resonance_window_closes_and_cooldown_elapses() {
        let mut session = started();
        session.handle(HostInput::ResonanceActivated).expect("resonate");
        run(&mut session, 6, 1.0);
        assert!(!session.resonance().is_active());

        session.handle(HostInput::touch("core_key")).expect("touch");
        run(&mut session, 1, 0.1);
        assert!(!session.is_revealed("shrine"));

        run(&mut session, 4, 1.0);
        assert_eq!(
            session.handle(HostInput::ResonanceActivated).expect("resonate"),
            InputOutcome::Applied
        );
        assert!(session.is_revealed("shrine"));
    }

    #[test]
    fn disabled_player_cannot_collect_or_use_abilities() {
        let mut session = started();
        session.handle(HostInput::touch("skill_dash")).expect("touch");
        assert_eq!(
            session.handle(HostInput::PlayerDisabled).expect("disable"),
            InputOutcome::Applied
        );
        assert_eq!(
            session.handle(HostInput::touch("core_key")).expect("touch"),
            InputOutcome::Blocked(BlockReason::PlayerUnavailable)
        );
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(0)).expect("press"),
            InputOutcome::Blocked(BlockReason::PlayerUnavailable)
        );
        assert_eq!(
            session.handle(HostInput::ResonanceActivated).expect("resonate"),
            InputOutcome::Blocked(BlockReason::PlayerUnavailable)
        );

        session.handle(HostInput::PlayerEnabled).expect("enable");
        assert_eq!(
            session.handle(HostInput::touch("core_key")).expect("touch"),
            InputOutcome::Applied
        );
    }

    #[test]
    fn combat_survives_pause_and_ends_on_request() {
        let mut session = started();
        assert_eq!(
            session.handle(HostInput::CombatEnded).expect("end"),
            InputOutcome::Ignored
        );
        session.handle(HostInput::CombatStarted).expect("start");
        session.handle(HostInput::PauseToggled).expect("pause");
        session.handle(HostInput::PauseToggled).expect("resume");
        assert_eq!(
            session.coordinator().player_state(),
            shatter_core::PlayerState::InCombat
        );
        assert_eq!(
            session.handle(HostInput::AbilitySlotPressed(0)).expect("press"),
            InputOutcome::Blocked(BlockReason::EmptySlot)
        );
        assert_eq!(
            session.handle(HostInput::CombatEnded).expect("end"),
            InputOutcome::Applied
        );
    }

    #[test]
    fn restore_resumes_pending_transition() {
        let mut session = started();
        session.handle(HostInput::touch("core_key")).expect("touch");
        session
            .handle(HostInput::SleepPointUsed { gate: "bed".to_string() })
            .expect("sleep");
        let save = session.snapshot();

        let mut restored = GameSession::restore(config(), catalog(), &save).expect("restore");
        assert_eq!(restored.state(), GameState::Transition);
        run(&mut restored, 1, 1.0);
        assert_eq!(restored.state(), GameState::Dream);
    }
}
