//! Relational schema
//!
//! ```text
//! events(event_id PK, event_name, creation_time NULL, event_result NULL)
//! steps(step_id PK, step_name, event_id FK, creation_time NULL, step_number)
//!     UNIQUE(event_id, step_number)
//! labels(label_id PK, step_id FK, key, value)
//! ```
//!
//! Times are RFC 3339 text. A `NULL` step time is a placeholder step.

use rusqlite::Connection;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS events (
    event_id      TEXT PRIMARY KEY,
    event_name    TEXT NOT NULL,
    creation_time TEXT,
    event_result  TEXT
);

CREATE TABLE IF NOT EXISTS steps (
    step_id       TEXT PRIMARY KEY,
    step_name     TEXT NOT NULL,
    event_id      TEXT NOT NULL REFERENCES events(event_id),
    creation_time TEXT,
    step_number   INTEGER NOT NULL,
    UNIQUE (event_id, step_number)
);

CREATE TABLE IF NOT EXISTS labels (
    label_id TEXT PRIMARY KEY,
    step_id  TEXT NOT NULL REFERENCES steps(step_id),
    key      TEXT NOT NULL,
    value    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS labels_by_step ON labels(step_id);
";

/// Create the tables and index if they are missing
///
/// Safe to run on every connect.
pub fn bootstrap_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    info!("Relational schema ready");
    Ok(())
}
