use clicker_core::codec::xor_in_place;
use clicker_core::constants::OBFUSCATION_KEY;
use clicker_core::{
    LegacyFormat, LoadOutcome, ProgressionModel, PurchaseError, RestoreError, SaveState,
    SaveStore, Session, SessionOrigin, StoreConfig,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

fn temp_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "clicker-core-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|id| (*id).to_string()).collect()
}

#[test]
fn fresh_install_starts_from_defaults() {
    let dir = temp_path("fresh");
    let store = SaveStore::at(&dir).unwrap();
    assert!(matches!(store.load().unwrap(), LoadOutcome::Fresh));

    let session = Session::open(store).unwrap();
    assert_eq!(session.origin(), SessionOrigin::Fresh);
    let state = session.model().snapshot();
    assert_eq!(state.score, 0);
    assert!(!state.controls_visible);
    assert!(state.unlocked_achievements.is_empty());
    assert!(state.purchased_upgrades.is_empty());
    assert!(state.is_fresh());
}

#[test]
fn corrupt_save_is_recovered_and_overwritten_on_next_save() {
    let dir = temp_path("corrupt");
    let store = SaveStore::at(&dir).unwrap();
    std::fs::write(store.save_path(), [0xFF, 0xFE, 0x00, 0x42]).unwrap();

    let outcome = store.load().unwrap();
    assert!(outcome.is_corrupt());
    assert_eq!(outcome.into_state(), SaveState::default());

    let mut session = Session::open(store.clone()).unwrap();
    assert_eq!(session.origin(), SessionOrigin::Recovered);
    session.model_mut().add_score(5);
    session.save().unwrap();

    match store.load().unwrap() {
        LoadOutcome::Loaded(state) => assert_eq!(state.score, 5),
        other => panic!("expected a valid save, got {other:?}"),
    }
}

#[test]
fn saved_progress_reloads_identically() {
    let dir = temp_path("reload");
    let store = SaveStore::at(&dir).unwrap();
    let state = SaveState {
        score: 1_234,
        controls_visible: true,
        unlocked_achievements: ids(&["first_click"]),
        purchased_upgrades: [("auto_click".to_string(), true)].into_iter().collect(),
        mini_event_click_count: 0,
    };
    store.save(&state).unwrap();

    let reopened = SaveStore::at(&dir).unwrap();
    match reopened.load().unwrap() {
        LoadOutcome::Loaded(loaded) => assert_eq!(loaded, state),
        other => panic!("expected the saved state, got {other:?}"),
    }
}

#[test]
fn legacy_pipe_backup_is_restored_then_deleted() {
    let dir = temp_path("restore");
    let store = SaveStore::at(&dir).unwrap();
    let mut payload = b"50|1|first_click,ten_clicks".to_vec();
    xor_in_place(&mut payload, OBFUSCATION_KEY);
    store.write_backup(&payload).unwrap();

    let mut session = Session::open(store.clone()).unwrap();
    session.request_restore().unwrap();
    let report = session.confirm_restore().unwrap();

    assert_eq!(report.format, LegacyFormat::PipeV2);
    assert!(report.persisted);
    assert!(report.backup_removed);
    let model = session.model();
    assert_eq!(model.score(), 50);
    assert!(model.controls_visible());
    assert_eq!(
        model.achievements().unlocked(),
        &ids(&["first_click", "ten_clicks"])
    );
    assert!(!store.backup_path().exists());
    assert_eq!(store.load().unwrap().into_state(), model.snapshot());
}

#[test]
fn malformed_backup_changes_nothing() {
    let dir = temp_path("restore-bad");
    let store = SaveStore::at(&dir).unwrap();
    let before = SaveState::default()
        .with_score(600)
        .with_achievements(["first_click", "ten_clicks", "hundred_points", "manual_phase"])
        .with_upgrades(["hold_click"]);
    store.save(&before).unwrap();
    store.write_backup(b"\x00garbage|||").unwrap();

    let mut session = Session::open(store.clone()).unwrap();
    session.request_restore().unwrap();
    let err = session.confirm_restore().unwrap_err();
    assert!(matches!(err, RestoreError::Decode { .. }));
    assert_eq!(session.model().snapshot(), before);
    assert!(store.backup_path().exists());
    assert_eq!(store.load().unwrap().into_state(), before);
}

#[test]
fn missing_backup_reports_not_found() {
    let dir = temp_path("restore-missing");
    let mut session = Session::open(SaveStore::at(&dir).unwrap()).unwrap();
    session.request_restore().unwrap();
    assert!(matches!(
        session.confirm_restore(),
        Err(RestoreError::NotFound)
    ));
    assert!(session.model().snapshot().is_fresh());
}

#[test]
fn first_click_unlocks_once_with_a_single_notification() {
    let mut model = ProgressionModel::default();
    model.add_score(1);
    assert_eq!(model.achievements().unlocked(), &ids(&["first_click"]));
    let note = model.notification().expect("unlock notification");
    assert_eq!(note.achievement_id, "first_click");

    assert!(model.check_achievements().is_empty());
    model.tick(Duration::from_secs(4));
    assert!(model.notification().is_none());
    assert_eq!(model.achievements().unlocked().len(), 1);
}

#[test]
fn one_adjustment_can_cross_several_thresholds() {
    let mut model = ProgressionModel::default();
    model.add_score(150);
    assert_eq!(
        model.achievements().unlocked(),
        &ids(&["first_click", "ten_clicks", "hundred_points", "triple_unlock"])
    );
    model.add_score(-150);
    assert_eq!(model.achievements().unlocked().len(), 4);
}

#[test]
fn unaffordable_purchase_leaves_score_alone() {
    let mut model = ProgressionModel::from_state(SaveState::default().with_score(10));
    let err = model.purchase("auto_click").unwrap_err();
    assert!(matches!(err, PurchaseError::InsufficientScore { cost: 5_000, .. }));
    assert_eq!(model.score(), 10);
    assert!(!model.upgrades().is_purchased("auto_click"));
}

#[test]
fn config_relocates_files_and_changes_key() {
    let base = temp_path("config");
    let config = StoreConfig::from_json(r#"{"folder": "saves", "save_file": "slot.bin", "key": 9}"#)
        .unwrap();
    let store = SaveStore::from_base(&base, &config).unwrap();
    assert_eq!(store.save_path(), base.join("saves").join("slot.bin"));
    assert_eq!(store.backup_path(), base.join("saves").join("old.json"));

    let state = SaveState::default().with_score(3);
    store.save(&state).unwrap();
    let default_store = SaveStore::at_with(base.join("saves"), &StoreConfig {
        save_file: "slot.bin".to_string(),
        ..StoreConfig::default()
    })
    .unwrap();
    assert!(default_store.load().unwrap().is_corrupt());
    assert_eq!(store.load().unwrap().into_state(), state);
}
