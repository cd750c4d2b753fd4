//! Persistence across reopen for both backends.

use crate::{fetch, submit_all, USER};
use std::fs;
use stepline::{ErrorKind, RawUpdate, Stepline, SteplineBuilder};

fn trace() -> Vec<RawUpdate> {
    vec![
        RawUpdate::start("E1", "U1", 0, "init", 1000),
        RawUpdate::label("E1", "U1", 1, "compile", "os", "linux"),
        RawUpdate::end("E1", "U1", 2, 3000, "pass"),
    ]
}

fn reopen_preserves_events(builder: impl Fn() -> SteplineBuilder) {
    let before = {
        let db = builder().user(USER).open().unwrap();
        submit_all(&db, &trace());
        let event = fetch(&db, "E1", "U1");
        db.close().unwrap();
        event
    };

    let db = builder().user(USER).open().unwrap();
    assert_eq!(fetch(&db, "E1", "U1"), before);

    // Replaying the same batch after reopen changes nothing.
    submit_all(&db, &trace());
    assert_eq!(fetch(&db, "E1", "U1"), before);
}

#[test]
fn test_document_snapshot_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.snap");
    reopen_preserves_events(|| Stepline::builder().document().path(&path));
}

#[test]
fn test_relational_file_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.sqlite");
    reopen_preserves_events(|| Stepline::builder().relational().path(&path));
}

#[test]
fn test_flush_without_close_is_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.snap");
    let db = Stepline::builder().document().path(&path).open().unwrap();
    submit_all(&db, &trace());
    db.flush().unwrap();

    let other = Stepline::builder().document().path(&path).open().unwrap();
    assert!(other.event("E1", "U1").unwrap().is_some());
    assert_eq!(other.user(), "default");
}

#[test]
fn test_corrupted_snapshot_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.snap");
    {
        let db = Stepline::builder().document().path(&path).open().unwrap();
        submit_all(&db, &trace());
        db.close().unwrap();
    }

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x5A;
    fs::write(&path, bytes).unwrap();

    let err = Stepline::builder()
        .document()
        .path(&path)
        .open()
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Corruption));
}

#[test]
fn test_open_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("stepline.toml");
    fs::write(
        &config,
        "user = \"ci\"\n[backend]\nkind = \"relational\"\npath = \"events.sqlite\"\n",
    )
    .unwrap();

    {
        let db = Stepline::open_config_file(&config).unwrap();
        assert_eq!(db.user(), "ci");
        assert_eq!(db.backend(), "relational");
        submit_all(&db, &trace());
    }
    assert!(dir.path().join("events.sqlite").exists());
}
