//! Per-kind protocol rules.

use crate::{backends, fetch, submit_all};
use stepline::{ErrorKind, Label, LabelWrite, RawUpdate, UpdateKind, MAX_TIMESTAMP};

#[test]
fn test_label_then_step_upgrades_placeholder() {
    for db in backends() {
        submit_all(
            &db,
            &[
                RawUpdate::label("E1", "U1", 2, "test", "a", "x"),
                RawUpdate::step("E1", "U1", 2, "test", 5000),
            ],
        );
        let event = fetch(&db, "E1", "U1");
        let step = event.step(2).unwrap();
        assert_eq!(step.timestamp, 5000);
        assert_eq!(step.labels, vec![Label::new("a", "x")]);
    }
}

#[test]
fn test_concrete_timestamp_is_never_replaced() {
    for db in backends() {
        submit_all(
            &db,
            &[
                RawUpdate::step("E1", "U1", 1, "s", 10),
                RawUpdate::step("E1", "U1", 1, "s", 20),
                RawUpdate::label("E1", "U1", 1, "s", "k", "v"),
            ],
        );
        assert_eq!(fetch(&db, "E1", "U1").step(1).unwrap().timestamp, 10);
    }
}

#[test]
fn test_label_overwrite_keeps_one_label() {
    for db in backends() {
        let first = db
            .apply(&RawUpdate::label("E1", "U1", 1, "s", "a", "x"))
            .unwrap();
        let second = db
            .apply(&RawUpdate::label("E1", "U1", 1, "s", "a", "y"))
            .unwrap();
        assert_eq!(first.kind, UpdateKind::Label);
        assert_eq!(first.label, Some(LabelWrite::Inserted));
        assert_eq!(second.label, Some(LabelWrite::Overwritten));

        let event = fetch(&db, "E1", "U1");
        assert_eq!(event.step(1).unwrap().labels, vec![Label::new("a", "y")]);
    }
}

#[test]
fn test_unknown_type_rejected_without_writes() {
    for db in backends() {
        let mut update = RawUpdate::start("E1", "U1", 0, "init", 1000);
        update.update_type = "restart".into();

        let err = db.apply(&update).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnsupportedUpdateType));
        assert!(db.event("E1", "U1").unwrap().is_none());

        let ack = db.submit(&[update]);
        assert_eq!(ack.applied, 0);
        assert_eq!(ack.failed[0].kind, ErrorKind::UnsupportedUpdateType);
        assert!(db.event("E1", "U1").unwrap().is_none());
    }
}

#[test]
fn test_end_uses_reserved_step_name() {
    for db in backends() {
        submit_all(&db, &[RawUpdate::end("E1", "U1", 4, 10, "pass")]);
        let event = fetch(&db, "E1", "U1");
        assert_eq!(event.step(4).unwrap().name, "end");
        assert_eq!(event.creation_time, None);
    }
}

#[test]
fn test_names_with_separator_do_not_collide() {
    for db in backends() {
        submit_all(
            &db,
            &[
                RawUpdate::end("a-b", "c", 1, 10, "first"),
                RawUpdate::end("a", "b-c", 1, 10, "second"),
            ],
        );
        assert_eq!(fetch(&db, "a-b", "c").result.as_deref(), Some("first"));
        assert_eq!(fetch(&db, "a", "b-c").result.as_deref(), Some("second"));
    }
}

#[test]
fn test_submit_json_batch() {
    for db in backends() {
        let ack = db
            .submit_json(
                r#"[
                    {"eventName": "E1", "eventId": "U1", "updateType": "start",
                     "stepNumber": 0, "stepName": "init", "timestamp": 1000},
                    {"eventName": "E1", "eventId": "U1", "updateType": "nope"}
                ]"#,
            )
            .unwrap();
        assert_eq!(ack.received, 2);
        assert_eq!(ack.applied, 1);
        assert_eq!(ack.failed[0].index, 1);
        assert_eq!(fetch(&db, "E1", "U1").creation_time, Some(1000));
    }
}

#[test]
fn test_step_without_timestamp_is_upgraded_later() {
    for db in backends() {
        let ack = db
            .submit_json(
                r#"{"eventName": "E1", "eventId": "U1", "updateType": "step",
                    "stepNumber": 1, "stepName": "compile"}"#,
            )
            .unwrap();
        assert!(ack.is_complete());
        assert!(fetch(&db, "E1", "U1").step(1).unwrap().is_placeholder());

        submit_all(&db, &[RawUpdate::step("E1", "U1", 1, "compile", 2000)]);
        assert_eq!(fetch(&db, "E1", "U1").step(1).unwrap().timestamp, 2000);
    }
}

#[test]
fn test_start_without_time_keeps_creation_time_unset() {
    for db in backends() {
        submit_all(&db, &[RawUpdate::start("E1", "U1", 0, "init", -1)]);
        assert_eq!(fetch(&db, "E1", "U1").creation_time, None);
    }
}

#[test]
fn test_out_of_range_timestamp_rejected_alike() {
    let updates = [
        RawUpdate::step("E1", "U1", 1, "s", i64::MAX / 2),
        RawUpdate::end("E1", "U1", 2, MAX_TIMESTAMP + 1, "pass"),
        RawUpdate::step("E2", "U1", 1, "s", MAX_TIMESTAMP),
    ];
    let mut events = Vec::new();
    for db in backends() {
        let ack = db.submit(&updates);
        assert_eq!(ack.applied, 1, "backend {}", db.backend());
        let kinds: Vec<ErrorKind> = ack.failed.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::InvalidTimestamp; 2]);
        assert!(db.event("E1", "U1").unwrap().is_none());
        events.push(fetch(&db, "E2", "U1"));
    }
    assert_eq!(events[0], events[1]);
    assert_eq!(events[0].steps[0].timestamp, MAX_TIMESTAMP);
}
