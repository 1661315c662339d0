//! Integration Tests: End-to-End Progression Flows
//!
//! Whole-session scenarios driven only through the public coordinator API:
//! combat, story boosts, journal wiring, world transitions, ability slots,
//! and save/restore through SQLite slots.

use shatter_core::config::{PersistenceConfig, ShatterConfig};
use shatter_core::memory::{AbilityDefinition, AbilityUpgrade, MemoryCatalog, MemoryRecord};
use shatter_core::persistence::SaveStore;
use shatter_core::{
    AbilityId, CollectOutcome, GameState, GameTimestamp, MemoryId, ProgressionCoordinator,
    ProgressionEvent, ResumePolicy, ShatterError,
};

fn ts(tick: u64) -> GameTimestamp {
    GameTimestamp::now(tick)
}

fn id(raw: &str) -> MemoryId {
    MemoryId::from(raw)
}

fn definitions() -> Vec<MemoryRecord> {
    let mut records = vec![
        MemoryRecord::core("core_lighthouse", "The Lighthouse", 1),
        MemoryRecord::core("core_storm", "The Storm", 3),
        MemoryRecord::peripheral("peri_letter", "Unsent Letter", ["peri_photo"]),
        MemoryRecord::peripheral("peri_photo", "Faded Photo", Vec::<&str>::new()),
        MemoryRecord::skill(
            "skill_lantern",
            "Lantern",
            AbilityDefinition::new("lantern", "Lantern", 10.0).usable_while_awake(),
        ),
    ];
    for n in 0..5 {
        records.push(MemoryRecord::skill(
            format!("skill_dream_{n}"),
            format!("Dream Skill {n}"),
            AbilityDefinition::new(format!("dream_{n}"), format!("Dream {n}"), 15.0),
        ));
    }
    records
}

fn session() -> ProgressionCoordinator {
    ProgressionCoordinator::new(ShatterConfig::default(), definitions()).expect("session")
}

// ---------------------------------------------------------------------------
// Scenario A: mitigated damage
// ---------------------------------------------------------------------------

#[test]
fn damage_is_mitigated_by_defense() {
    let mut s = session();
    let dealt = s.take_damage(20.0);
    assert!((dealt - 17.5).abs() < 1e-5);
    assert!((s.stats().current_health() - 82.5).abs() < 1e-5);
}

// ---------------------------------------------------------------------------
// Scenario B: story boost applies once
// ---------------------------------------------------------------------------

#[test]
fn story_boost_applies_once_per_memory() {
    let mut s = session();
    s.collect(&id("core_storm"), ts(1)).expect("collect");
    assert!((s.stats().damage_multiplier() - 1.15).abs() < 1e-5);

    let again = s.collect(&id("core_storm"), ts(2)).expect("collect again");
    assert_eq!(again, CollectOutcome::AlreadyCollected);
    assert!((s.stats().damage_multiplier() - 1.15).abs() < 1e-5);
    assert_eq!(s.store().collected_at(&id("core_storm")).map(|t| t.tick), Some(1));
}

// ---------------------------------------------------------------------------
// Scenario C: journal edge appears once both ends are collected
// ---------------------------------------------------------------------------

#[test]
fn journal_links_late_peer() {
    let mut s = session();
    s.collect(&id("peri_letter"), ts(1)).expect("collect");
    assert!(s.journal().contains(&id("peri_letter")));
    assert_eq!(s.journal().edge_count(), 0);

    s.collect(&id("peri_photo"), ts(2)).expect("collect");
    assert_eq!(s.journal().edge_count(), 1);
    assert_eq!(s.journal().neighbors(&id("peri_photo")), vec![&id("peri_letter")]);
}

#[test]
fn journal_links_are_order_independent() {
    let mut s = session();
    s.collect(&id("peri_photo"), ts(1)).expect("collect");
    s.collect(&id("peri_letter"), ts(2)).expect("collect");
    assert!(s.journal().are_connected(&id("peri_letter"), &id("peri_photo")));
    assert_eq!(s.journal().edge_count(), 1);
}

// ---------------------------------------------------------------------------
// Scenario D: transitions
// ---------------------------------------------------------------------------

#[test]
fn dream_transition_requires_a_running_game() {
    let mut s = session();
    assert!(matches!(
        s.request_transition(GameState::Dream),
        Err(ShatterError::IllegalTransition {
            from: GameState::Menu,
            to: GameState::Dream
        })
    ));
    assert_eq!(s.state(), GameState::Menu);

    s.start_game().expect("start");
    s.request_transition(GameState::Dream).expect("request");
    assert_eq!(s.state(), GameState::Transition);
    s.resolve_transition().expect("resolve");
    assert_eq!(s.state(), GameState::Dream);
    assert!(s.stats().is_dream_context());

    let changes: Vec<_> = s
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            ProgressionEvent::StateChanged(change) => Some((change.from, change.to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (GameState::Menu, GameState::Waking),
            (GameState::Waking, GameState::Transition),
            (GameState::Transition, GameState::Dream),
        ]
    );
}

#[test]
fn repeated_transitions_do_not_drift_stats() {
    let mut s = session();
    s.start_game().expect("start");
    for _ in 0..10 {
        s.request_transition(GameState::Dream).expect("to dream");
        s.resolve_transition().expect("resolve");
        s.enter_dream_context();
        s.request_transition(GameState::Waking).expect("to waking");
        s.resolve_transition().expect("resolve");
        s.exit_dream_context();
    }
    assert!((s.stats().damage() - 10.0).abs() < 1e-5);
    assert!((s.stats().defense() - 5.0).abs() < 1e-5);
}

#[test]
fn pause_from_dream_resumes_into_dream_by_default() {
    let mut s = session();
    s.start_game().expect("start");
    s.request_transition(GameState::Dream).expect("request");
    s.resolve_transition().expect("resolve");
    s.pause().expect("pause");
    s.resume().expect("resume");
    assert_eq!(s.state(), GameState::Dream);
    assert!(s.stats().is_dream_context());
}

#[test]
fn legacy_resume_policy_wakes_the_player() {
    let mut config = ShatterConfig::default();
    config.state.resume_policy = ResumePolicy::AlwaysWaking;
    let mut s = ProgressionCoordinator::new(config, definitions()).expect("session");
    s.start_game().expect("start");
    s.request_transition(GameState::Dream).expect("request");
    s.resolve_transition().expect("resolve");
    s.pause().expect("pause");
    s.resume().expect("resume");
    assert_eq!(s.state(), GameState::Waking);
    assert!(!s.stats().is_dream_context());
}

// ---------------------------------------------------------------------------
// Scenario E: active ability slots
// ---------------------------------------------------------------------------

#[test]
fn dream_abilities_fill_slots_only_in_dream() {
    let mut s = session();
    s.start_game().expect("start");
    for n in 0..5 {
        s.collect(&id(&format!("skill_dream_{n}")), ts(n)).expect("collect");
    }
    assert_eq!(s.abilities().active_count(), 0);

    s.request_transition(GameState::Dream).expect("request");
    s.resolve_transition().expect("resolve");
    let active: Vec<_> = s
        .abilities()
        .active_set()
        .map(|a| a.id.as_str().to_string())
        .collect();
    assert_eq!(active, vec!["dream_0", "dream_1", "dream_2", "dream_3"]);
}

#[test]
fn ability_use_spends_energy_until_empty() {
    let mut s = session();
    s.start_game().expect("start");
    s.collect(&id("skill_lantern"), ts(1)).expect("collect");
    let lantern = AbilityId::from("lantern");

    // 50 starting energy covers five uses of a 10-cost ability.
    for _ in 0..5 {
        s.use_ability(&lantern).expect("use");
    }
    assert!(matches!(
        s.use_ability(&lantern),
        Err(ShatterError::InsufficientEnergy { .. })
    ));

    s.regen_energy(2.0);
    assert!((s.energy().current() - 10.0).abs() < 1e-4);
    s.use_ability(&lantern).expect("use after regen");
}

// ---------------------------------------------------------------------------
// Catalog → session
// ---------------------------------------------------------------------------

#[test]
fn session_from_catalog_rejects_duplicates() {
    let catalog = MemoryCatalog::from_toml(
        r#"
        [[memories]]
        id = "core_a"
        title = "A"
        [memories.payload]
        category = "core"
        story_phase = 1

        [[memories]]
        id = "core_a"
        title = "A again"
        [memories.payload]
        category = "core"
        story_phase = 2
        "#,
    )
    .expect("parse");
    let err = ProgressionCoordinator::from_catalog(ShatterConfig::default(), catalog);
    assert!(matches!(err, Err(ShatterError::DuplicateId(_))));
}

// ---------------------------------------------------------------------------
// Save / restore
// ---------------------------------------------------------------------------

fn played_session() -> ProgressionCoordinator {
    let mut s = session();
    s.start_game().expect("start");
    s.collect(&id("core_storm"), ts(30)).expect("collect");
    s.collect(&id("peri_letter"), ts(10)).expect("collect");
    s.collect(&id("peri_photo"), ts(20)).expect("collect");
    s.collect(&id("skill_lantern"), ts(40)).expect("collect");
    s.apply_upgrade(AbilityUpgrade {
        id: "lantern_plus".to_string(),
        target: AbilityId::from("lantern"),
        energy_cost_reduction: 5.0,
        cooldown_reduction: 1.0,
    })
    .expect("upgrade");
    s.add_boost("shrine", 0.1);
    s.request_transition(GameState::Dream).expect("request");
    s.resolve_transition().expect("resolve");
    s.take_damage(40.0);
    s
}

#[test]
fn restore_rebuilds_an_equivalent_session() {
    let original = played_session();
    let save = original.snapshot();

    let restored =
        ProgressionCoordinator::restore(ShatterConfig::default(), definitions(), &save).expect("restore");

    assert_eq!(restored.session_id(), original.session_id());
    assert_eq!(restored.state(), GameState::Dream);
    assert!(restored.stats().is_dream_context());
    assert_eq!(restored.stats().boosts(), original.stats().boosts());
    assert!((restored.stats().current_health() - original.stats().current_health()).abs() < 1e-4);
    assert!((restored.energy().current() - original.energy().current()).abs() < 1e-4);
    assert_eq!(restored.journal().edge_count(), original.journal().edge_count());
    assert_eq!(
        restored.abilities().get(&AbilityId::from("lantern")).map(|a| a.energy_cost),
        Some(5.0)
    );
    assert!(restored.events().is_empty());

    let timeline: Vec<_> = restored
        .journal()
        .by_timeline()
        .iter()
        .map(|n| n.record.id.as_str().to_string())
        .collect();
    assert_eq!(
        timeline,
        vec!["peri_letter", "peri_photo", "core_storm", "skill_lantern"]
    );
}

#[test]
fn restore_fails_on_unknown_memory() {
    let mut save = played_session().snapshot();
    save.collected[0].id = id("deleted_memory");
    let err = ProgressionCoordinator::restore(ShatterConfig::default(), definitions(), &save);
    assert!(matches!(err, Err(ShatterError::NotFound(_))));
}

#[test]
fn save_slots_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("saves.db");
    let config = PersistenceConfig::default();
    let save = played_session().snapshot();

    {
        let store = SaveStore::open(&path, &config).expect("open");
        store.save_slot(1, &save).expect("save");
    }

    let store = SaveStore::open(&path, &config).expect("reopen");
    let loaded = store.load_slot(1).expect("load").expect("slot present");
    assert_eq!(loaded, save);
    assert_eq!(store.list_slots().expect("list").len(), 1);

    let restored =
        ProgressionCoordinator::restore(ShatterConfig::default(), definitions(), &loaded).expect("restore");
    assert_eq!(restored.store().collected_ids().len(), 4);
}

#[test]
fn backup_copies_every_slot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = PersistenceConfig::default();
    let store = SaveStore::open(dir.path().join("saves.db"), &config).expect("open");
    store.save_slot(1, &played_session().snapshot()).expect("save");
    store.save_slot(2, &session().snapshot()).expect("save");

    let backup_path = dir.path().join("saves_backup.db");
    store.backup(&backup_path).expect("backup");
    let backup = SaveStore::open(&backup_path, &config).expect("open backup");
    assert_eq!(backup.list_slots().expect("list").len(), 2);
}
