//! Session archive on disk: save, reopen, export, import, clear

use std::fs;
use std::sync::Arc;

use chrono::Duration;
use serde_json::Value;
use sylvia_engine::{
    ChatMessage, Coach, FocusLogEntry, ManualClock, ModelAccess, PersistenceError, Session,
    SessionContext, SessionStore, SnapshotKey, ToolToggles,
};
use sylvia_providers::GeminiGateway;
use sylvia_types::ProgressPct;

use crate::common::t0;

fn sample_session() -> Session {
    let mut session = Session::fresh(t0());
    session.push_message(ChatMessage::user("I want to learn Rust", t0()));
    session.push_message(ChatMessage::assistant(
        "Great. What will you build?",
        t0() + Duration::seconds(2),
    ));
    session.record_goal();
    session.raise_progress(ProgressPct::saturating(20));
    session.record_focus_block(FocusLogEntry::new(
        25,
        "Focused block",
        t0() + Duration::minutes(25),
    ));
    session
}

#[test]
fn saved_sessions_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let session = sample_session();

    let key = {
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.save(&session, t0()).unwrap()
    };
    assert_eq!(key.as_str(), "20250314-090000");

    let store = SessionStore::open(dir.path()).unwrap();
    assert_eq!(store.len(), 1);
    let loaded = store.load(&key).unwrap();
    assert_eq!(loaded, session);
    assert_eq!(loaded.id(), session.id());

    let summary = &store.list()[0];
    assert_eq!(summary.message_count, 2);
    assert_eq!(summary.focus_blocks, 1);
    assert_eq!(summary.progress.value(), 20);
}

#[test]
fn listing_is_most_recent_first_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let session = sample_session();
    {
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.save(&session, t0()).unwrap();
        store.save(&session, t0()).unwrap();
        store
            .save(&session, t0() + Duration::seconds(30))
            .unwrap();
    }

    let store = SessionStore::open(dir.path()).unwrap();
    let keys: Vec<String> = store
        .list()
        .into_iter()
        .map(|s| s.key.as_str().to_string())
        .collect();
    assert_eq!(
        keys,
        vec!["20250314-090030", "20250314-090000-1", "20250314-090000"]
    );
}

#[test]
fn export_uses_the_documented_json_shape() {
    let mut store = SessionStore::in_memory();
    let key = store.save(&sample_session(), t0()).unwrap();

    let exported: Value = serde_json::from_slice(&store.export(&key).unwrap()).unwrap();

    for field in [
        "id",
        "createdAt",
        "messages",
        "goalsCount",
        "focusLog",
        "progressPct",
    ] {
        assert!(exported.get(field).is_some(), "missing {field}");
    }
    assert_eq!(exported["messages"][0]["role"], "user");
    assert_eq!(exported["messages"][1]["role"], "assistant");
    assert_eq!(exported["goalsCount"], 1);
    assert_eq!(exported["progressPct"], 20);
    assert_eq!(exported["focusLog"][0]["minutes"], 25);
    assert_eq!(exported["focusLog"][0]["label"], "Focused block");
}

#[test]
fn export_to_file_then_import_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::starting_at(t0()));
    let mut coach: Coach<GeminiGateway> = Coach::new(
        ModelAccess::unconfigured(),
        SessionStore::open(dir.path().join("sessions")).unwrap(),
        clock,
    );
    let original = sample_session();
    let mut ctx = SessionContext::with_session(original.clone(), ToolToggles::default());

    let key = coach.save(&ctx).unwrap();
    let export_path = dir.path().join("exports").join("session.json");
    fs::create_dir_all(export_path.parent().unwrap()).unwrap();
    coach.export_to(&key, &export_path).unwrap();

    coach.new_session(&mut ctx).unwrap();
    assert_ne!(ctx.session().id(), original.id());

    let bytes = fs::read(&export_path).unwrap();
    coach.import(&mut ctx, &bytes).unwrap();
    assert_eq!(ctx.session(), &original);
    assert_eq!(
        serde_json::to_value(ctx.session()).unwrap(),
        serde_json::from_slice::<Value>(&bytes).unwrap()
    );
}

#[test]
fn corrupt_snapshot_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.save(&sample_session(), t0()).unwrap();
    }
    fs::write(dir.path().join("20250101-000000.json"), b"{ truncated").unwrap();

    let store = SessionStore::open(dir.path()).unwrap();
    assert_eq!(store.len(), 1);
}

#[test]
fn renamed_snapshot_copies_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let key = {
        let mut store = SessionStore::open(dir.path()).unwrap();
        store.save(&sample_session(), t0()).unwrap()
    };
    let original = dir.path().join(format!("{key}.json"));
    let copy = dir.path().join("20250101-000000.json");
    fs::copy(&original, &copy).unwrap();

    let mut store = SessionStore::open(dir.path()).unwrap();
    assert_eq!(store.len(), 1);
    assert!(store.contains(&key));

    assert_eq!(store.clear().unwrap(), 1);
    assert!(!original.exists());
    assert!(SessionStore::open(dir.path()).unwrap().is_empty());
}

#[test]
fn unknown_key_is_not_found() {
    let store = SessionStore::in_memory();
    let key = SnapshotKey::parse("20250314-090000").unwrap();

    assert!(matches!(
        store.load(&key),
        Err(PersistenceError::NotFound(_))
    ));
    assert!(matches!(
        store.export(&key),
        Err(PersistenceError::NotFound(_))
    ));
}

#[test]
fn clear_removes_every_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SessionStore::open(dir.path()).unwrap();
    store.save(&sample_session(), t0()).unwrap();
    store
        .save(&sample_session(), t0() + Duration::seconds(1))
        .unwrap();

    assert_eq!(store.clear().unwrap(), 2);
    assert!(store.is_empty());
    assert!(SessionStore::open(dir.path()).unwrap().is_empty());
}
