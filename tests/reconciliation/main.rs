//! Reconciliation Test Suite
//!
//! End-to-end tests through the `Stepline` facade, run against both storage
//! backends.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test reconciliation
//!
//! # Ordering properties only
//! cargo test --test reconciliation ordering::
//! ```

use stepline::{Event, RawUpdate, Stepline};

// Test modules
pub mod concurrency;
pub mod durability;
pub mod ordering;
pub mod protocol;
pub mod scenario;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// User every test instance runs as
pub const USER: &str = "morel";

/// One in-memory instance per backend
pub fn backends() -> Vec<Stepline> {
    vec![
        Stepline::builder()
            .user(USER)
            .document()
            .in_memory()
            .open()
            .expect("Failed to open document backend"),
        Stepline::builder()
            .user(USER)
            .relational()
            .in_memory()
            .open()
            .expect("Failed to open relational backend"),
    ]
}

/// Apply `updates` and require every one of them to succeed
pub fn submit_all(db: &Stepline, updates: &[RawUpdate]) {
    let ack = db.submit(updates);
    assert!(
        ack.is_complete(),
        "{} backend rejected updates: {:?}",
        db.backend(),
        ack.failed
    );
}

/// Read an event that must exist
pub fn fetch(db: &Stepline, event_name: &str, event_id: &str) -> Event {
    db.event(event_name, event_id)
        .expect("event read failed")
        .unwrap_or_else(|| panic!("event {}/{} missing on {}", event_name, event_id, db.backend()))
}

/// Steps sorted by number, for comparisons that ignore arrival order
pub fn by_number(mut event: Event) -> Event {
    event.steps.sort_by_key(|s| s.number);
    event
}
