//! The reference build trace and cross-backend parity.

use crate::{backends, fetch, submit_all, USER};
use stepline::{Event, Label, RawUpdate, Step, END_STEP_NAME};

fn build_trace() -> Vec<RawUpdate> {
    vec![
        RawUpdate::start("E1", "U1", 0, "init", 1000),
        RawUpdate::step("E1", "U1", 1, "compile", 2000),
        RawUpdate::label("E1", "U1", 1, "compile", "os", "linux"),
        RawUpdate::end("E1", "U1", 2, 3000, "pass"),
    ]
}

fn expected() -> Event {
    Event {
        id: format!("{}-E1-U1", USER),
        name: "E1".into(),
        result: Some("pass".into()),
        creation_time: Some(1000),
        steps: vec![
            Step {
                name: "init".into(),
                number: 0,
                timestamp: 1000,
                labels: vec![],
            },
            Step {
                name: "compile".into(),
                number: 1,
                timestamp: 2000,
                labels: vec![Label::new("os", "linux")],
            },
            Step {
                name: END_STEP_NAME.into(),
                number: 2,
                timestamp: 3000,
                labels: vec![],
            },
        ],
    }
}

#[test]
fn test_build_trace_reconciles_to_expected_event() {
    for db in backends() {
        submit_all(&db, &build_trace());
        assert_eq!(fetch(&db, "E1", "U1"), expected(), "backend {}", db.backend());
    }
}

#[test]
fn test_backends_agree_on_messy_sequence() {
    let updates = vec![
        RawUpdate::label("E2", "U9", 3, "test", "shard", "1"),
        RawUpdate::label("E2", "U9", 3, "test", "os", "mac"),
        RawUpdate::step("E2", "U9", 1, "fetch", -5),
        RawUpdate::end("E2", "U9", 7, 900, "fail"),
        RawUpdate::step("E2", "U9", 3, "test", 400),
        RawUpdate::label("E2", "U9", 3, "test", "shard", "2"),
        RawUpdate::step("E2", "U9", 1, "fetch", 100),
        RawUpdate::start("E2", "U9", 0, "init", 50),
        RawUpdate::step("E2", "U9", 3, "test", 999),
        RawUpdate::end("E2", "U9", 7, 950, "pass"),
    ];

    let events: Vec<Event> = backends()
        .iter()
        .map(|db| {
            submit_all(db, &updates);
            fetch(db, "E2", "U9")
        })
        .collect();
    assert_eq!(events[0], events[1]);

    let event = &events[0];
    assert_eq!(event.result.as_deref(), Some("pass"));
    assert_eq!(event.creation_time, Some(50));
    let numbers: Vec<i64> = event.steps.iter().map(|s| s.number).collect();
    assert_eq!(numbers, vec![3, 1, 7, 0]);
    let test = event.step(3).unwrap();
    assert_eq!(test.timestamp, 400);
    assert_eq!(test.labels, vec![Label::new("shard", "2"), Label::new("os", "mac")]);
    assert_eq!(event.step(1).unwrap().timestamp, 100);
    assert_eq!(event.step(7).unwrap().timestamp, 900);
}

#[test]
fn test_event_serializes_for_show() {
    for db in backends() {
        submit_all(&db, &build_trace());
        let json = serde_json::to_value(fetch(&db, "E1", "U1")).unwrap();
        assert_eq!(json["creationTime"], 1000);
        assert_eq!(json["steps"][1]["labels"][0]["value"], "linux");
    }
}
