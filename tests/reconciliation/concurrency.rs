//! Concurrent delivery of updates for the same event.

use crate::{backends, fetch};
use std::sync::Barrier;
use std::thread;
use stepline::{RawUpdate, Stepline};

const THREADS: usize = 8;

fn race(db: &Stepline, per_thread: impl Fn(usize) -> Vec<RawUpdate> + Sync) {
    let barrier = Barrier::new(THREADS);
    thread::scope(|scope| {
        for t in 0..THREADS {
            let barrier = &barrier;
            let per_thread = &per_thread;
            scope.spawn(move || {
                let updates = per_thread(t);
                barrier.wait();
                let ack = db.submit(&updates);
                assert!(ack.is_complete(), "thread {} failed: {:?}", t, ack.failed);
            });
        }
    });
}

#[test]
fn test_racing_creators_make_one_of_each() {
    for db in backends() {
        race(&db, |t| {
            vec![
                RawUpdate::label("E1", "U1", 1, "compile", "os", &format!("v{}", t)),
                RawUpdate::step("E1", "U1", 1, "compile", 2000),
                RawUpdate::start("E1", "U1", 0, "init", 1000),
                RawUpdate::label("E1", "U1", 1, "compile", &format!("k{}", t), "x"),
            ]
        });

        let event = fetch(&db, "E1", "U1");
        assert_eq!(event.creation_time, Some(1000));
        assert_eq!(event.steps.len(), 2, "backend {}", db.backend());

        let compile = event.step(1).unwrap();
        assert_eq!(compile.timestamp, 2000);
        assert_eq!(compile.labels.len(), THREADS + 1);
        let os: Vec<_> = compile.labels.iter().filter(|l| l.key == "os").collect();
        assert_eq!(os.len(), 1);
        assert!(os[0].value.starts_with('v'));
    }
}

#[test]
fn test_parallel_events_are_independent() {
    for db in backends() {
        race(&db, |t| {
            let id = t.to_string();
            (0..5)
                .map(|n| RawUpdate::step("E1", &id, n, "s", n * 10))
                .chain(std::iter::once(RawUpdate::end("E1", &id, 5, 60, "pass")))
                .collect()
        });

        for t in 0..THREADS {
            let event = fetch(&db, "E1", &t.to_string());
            assert_eq!(event.steps.len(), 6);
            assert_eq!(event.result.as_deref(), Some("pass"));
        }
    }
}
