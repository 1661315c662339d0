//! Headless scripted playthrough.
//!
//! ```text
//! shatter-playthrough [HOST_CONFIG.toml] [CATALOG.toml]
//! ```
//!
//! Without arguments the bundled demo config and catalog are used. The run
//! walks a short session through both worlds, logs every progression event
//! and the HUD at each step, then saves, reloads and restores it.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use shatter_core::ProgressionEvent;
use shatter_core::memory::MemoryCatalog;
use shatter_core::persistence::SaveStore;
use shatter_host::config::HostConfig;
use shatter_host::telemetry::init_tracing;
use shatter_host::{GameSession, HostInput, HudSnapshot, demo};
use tracing::info;

const FRAME_SECS: f32 = 1.0 / 30.0;
const SAVE_SLOT: u32 = 1;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);

    let config = match args.next() {
        Some(path) => HostConfig::from_file(&path)
            .with_context(|| format!("loading host config {}", path.display()))?,
        None => demo::demo_host_config().context("parsing bundled host config")?,
    };
    let catalog = match args.next() {
        Some(path) => MemoryCatalog::from_file(&path)
            .with_context(|| format!("loading catalog {}", path.display()))?,
        None => demo::demo_catalog().context("parsing bundled catalog")?,
    };

    init_tracing(&config.core.general.log_level, config.session.log_format);
    info!(memories = catalog.len(), gates = config.gates.len(), "Starting playthrough");

    let mut session =
        GameSession::new(config.clone(), catalog.clone()).context("creating session")?;

    let script = [
        HostInput::StartGame,
        HostInput::touch("core_lighthouse"),
        HostInput::touch("peri_letter"),
        HostInput::touch("skill_lantern"),
        HostInput::AbilitySlotPressed(0),
        HostInput::ResonanceActivated,
        HostInput::touch_hidden("peri_photo", "tide_pool"),
        HostInput::SleepPointUsed {
            gate: "bedroom".to_string(),
        },
    ];
    run_script(&mut session, &script)?;
    wait_for_transition(&mut session)?;

    let script = [
        HostInput::touch("skill_veil_step"),
        HostInput::EnergyPickup(30.0),
        HostInput::CombatStarted,
        HostInput::AbilitySlotPressed(1),
        HostInput::DamageTaken(25.0),
        HostInput::CombatEnded,
        HostInput::MemoryViewed("peri_letter".into()),
        HostInput::FlashbackDismissed,
        HostInput::PauseToggled,
        HostInput::PauseToggled,
        HostInput::DreamExitReached {
            gate: "lighthouse_portal".to_string(),
        },
    ];
    run_script(&mut session, &script)?;
    wait_for_transition(&mut session)?;
    run_script(&mut session, &[HostInput::touch("core_storm")])?;

    let save = session.snapshot();
    let store = SaveStore::open_in_memory(&config.core.persistence).context("opening save store")?;
    store.save_slot(SAVE_SLOT, &save).context("saving")?;
    let loaded = store
        .load_slot(SAVE_SLOT)
        .context("loading")?
        .context("save slot is empty")?;
    let restored = GameSession::restore(config, catalog, &loaded).context("restoring")?;

    // Cooldowns and resonance are host-side and not saved.
    let before = without_cooldowns(HudSnapshot::capture(&session));
    let after = without_cooldowns(HudSnapshot::capture(&restored));
    if before != after {
        bail!("restored HUD differs: {before:?} vs {after:?}");
    }
    info!(
        progress = after.story_progress,
        journal_edges = restored.coordinator().journal().edge_count(),
        "Playthrough complete; save round-trip verified"
    );
    Ok(())
}

fn run_script(session: &mut GameSession, inputs: &[HostInput]) -> Result<()> {
    for input in inputs {
        let kind = input.kind();
        let outcome = session
            .handle(input.clone())
            .with_context(|| format!("handling {kind}"))?;
        info!(input = kind, ?outcome, "Input applied");
        session.update(FRAME_SECS).context("frame update")?;
        log_events(session);
    }
    log_hud(session);
    Ok(())
}

fn wait_for_transition(session: &mut GameSession) -> Result<()> {
    while session.timer().is_running() {
        session.update(FRAME_SECS).context("frame update")?;
    }
    log_events(session);
    log_hud(session);
    Ok(())
}

fn log_events(session: &mut GameSession) {
    for event in session.drain_events() {
        match &event {
            ProgressionEvent::MemoryCollected { record, .. } => {
                info!(memory = %record.id, title = %record.title, "Memory collected");
            }
            ProgressionEvent::AbilityUnlocked { ability, .. } => {
                info!(ability = %ability.id, name = %ability.name, "Ability unlocked");
            }
            ProgressionEvent::StateChanged(change) => {
                info!(from = %change.from, to = %change.to, "State changed");
            }
            ProgressionEvent::WorldChangesTriggered { memory, changes } => {
                info!(
                    memory = %memory,
                    unlocked_areas = ?changes.unlocked_area_ids,
                    "World changes triggered"
                );
            }
            ProgressionEvent::MemoryViewed {
                memory,
                connection_hints,
                ..
            } => {
                info!(memory = %memory, hints = ?connection_hints, "Memory viewed");
            }
            ProgressionEvent::PlayerDied => info!("Player died"),
        }
    }
}

fn without_cooldowns(mut hud: HudSnapshot) -> HudSnapshot {
    for slot in &mut hud.slots {
        slot.cooldown_remaining = 0.0;
    }
    hud.resonance_cooldown = 0.0;
    hud.resonance_active = false;
    hud
}

fn log_hud(session: &GameSession) {
    let hud = HudSnapshot::capture(session);
    info!(
        state = %hud.state,
        player = %hud.player,
        health = hud.health,
        max_health = hud.max_health,
        energy = hud.energy,
        progress = hud.story_progress,
        slots = hud.slots.len(),
        "HUD"
    );
}
