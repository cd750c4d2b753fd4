//! [`StorageAdapter`] over SQLite
//!
//! The connection sits behind a mutex and every operation runs in its own
//! `IMMEDIATE` transaction, so the existence checks and conflict-tolerant
//! inserts of one operation never interleave with another writer.

use super::schema::bootstrap_schema;
use super::time::{from_calendar_time, to_calendar_time};
use crate::adapter::StorageAdapter;
use parking_lot::Mutex;
use rusqlite::{
    params, Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior,
};
use std::path::Path;
use std::time::Duration;
use stepline_core::{
    Error, Event, EventKey, Label, LabelKey, LabelWrite, Result, Step, StepKey,
    PLACEHOLDER_TIMESTAMP,
};
use tracing::{debug, error, info};

/// Connection settings for [`RelationalAdapter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationalOptions {
    /// How long a statement waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl Default for RelationalOptions {
    fn default() -> Self {
        RelationalOptions {
            busy_timeout: Duration::from_millis(5_000),
        }
    }
}

/// SQLite-backed storage adapter
pub struct RelationalAdapter {
    /// `None` once disconnected
    conn: Mutex<Option<Connection>>,
}

impl RelationalAdapter {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>, options: RelationalOptions) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::StorageUnavailable(format!("{}: {}", dir.display(), e)))?;
        }
        let conn = Connection::open(path).map_err(sql_err)?;
        let adapter = Self::with_connection(conn, options)?;
        info!(path = %path.display(), "Connected relational backend");
        Ok(adapter)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        Self::with_connection(conn, RelationalOptions::default())
    }

    fn with_connection(conn: Connection, options: RelationalOptions) -> Result<Self> {
        conn.busy_timeout(options.busy_timeout).map_err(sql_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(sql_err)?;
        bootstrap_schema(&conn).map_err(sql_err)?;
        Ok(RelationalAdapter {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run `f` in one transaction, committing only if it succeeds
    fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or_else(closed)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(sql_err)?;
        let out = f(&tx)?;
        tx.commit().map_err(sql_err)?;
        Ok(out)
    }
}

impl std::fmt::Debug for RelationalAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalAdapter")
            .field("open", &self.conn.lock().is_some())
            .finish()
    }
}

fn closed() -> Error {
    Error::StorageUnavailable("relational backend is disconnected".into())
}

/// Map an engine error onto the storage error taxonomy
fn sql_err(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                Error::StorageUnavailable(e.to_string())
            }
            ErrorCode::ConstraintViolation => Error::Conflict(e.to_string()),
            _ => Error::Storage(e.to_string()),
        },
        _ => Error::Storage(e.to_string()),
    }
}

fn stored_time(text: Option<String>) -> Result<i64> {
    match text {
        Some(text) => from_calendar_time(&text),
        None => Ok(PLACEHOLDER_TIMESTAMP),
    }
}

fn event_exists(tx: &Transaction<'_>, key: &EventKey) -> Result<bool> {
    tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM events WHERE event_id = ?1)",
        [key.as_str()],
        |row| row.get(0),
    )
    .map_err(sql_err)
}

fn read_labels(tx: &Transaction<'_>, step_id: &str) -> Result<Vec<Label>> {
    let mut stmt = tx
        .prepare_cached("SELECT key, value FROM labels WHERE step_id = ?1 ORDER BY rowid")
        .map_err(sql_err)?;
    let rows = stmt
        .query_map([step_id], |row| Ok(Label::new(row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
        .map_err(sql_err)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(sql_err)
}

impl StorageAdapter for RelationalAdapter {
    fn backend(&self) -> &'static str {
        "relational"
    }

    fn ensure_event(&self, key: &EventKey, name: &str) -> Result<()> {
        self.with_tx(|tx| {
            let created = tx
                .execute(
                    "INSERT INTO events (event_id, event_name) VALUES (?1, ?2)
                     ON CONFLICT(event_id) DO NOTHING",
                    params![key.as_str(), name],
                )
                .map_err(sql_err)?;
            if created > 0 {
                debug!(event = %key, "Inserted event row");
            }
            Ok(())
        })
    }

    fn set_event_creation_time(&self, key: &EventKey, timestamp: i64) -> Result<()> {
        let time = to_calendar_time(timestamp)?;
        self.with_tx(|tx| {
            let changed = tx
                .execute(
                    "UPDATE events SET creation_time = ?2 WHERE event_id = ?1",
                    params![key.as_str(), time],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(Error::NotFound(format!("event {}", key)));
            }
            Ok(())
        })
    }

    fn set_event_result(&self, key: &EventKey, result: &str) -> Result<()> {
        self.with_tx(|tx| {
            let changed = tx
                .execute(
                    "UPDATE events SET event_result = ?2 WHERE event_id = ?1",
                    params![key.as_str(), result],
                )
                .map_err(sql_err)?;
            if changed == 0 {
                return Err(Error::NotFound(format!("event {}", key)));
            }
            Ok(())
        })
    }

    fn ensure_step(&self, step: &StepKey, timestamp: i64) -> Result<()> {
        let time = if timestamp == PLACEHOLDER_TIMESTAMP {
            None
        } else {
            Some(to_calendar_time(timestamp)?)
        };
        self.with_tx(|tx| {
            if !event_exists(tx, step.event())? {
                return Err(Error::NotFound(format!("event {}", step.event())));
            }
            let created = tx
                .execute(
                    "INSERT INTO steps (step_id, step_name, event_id, creation_time, step_number)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT DO NOTHING",
                    params![
                        step.id(),
                        step.name(),
                        step.event().as_str(),
                        time,
                        step.number()
                    ],
                )
                .map_err(sql_err)?;
            if created > 0 {
                debug!(step = %step, timestamp, "Inserted step row");
                return Ok(());
            }
            if let Some(time) = &time {
                let upgraded = tx
                    .execute(
                        "UPDATE steps SET creation_time = ?3
                         WHERE event_id = ?1 AND step_number = ?2 AND creation_time IS NULL",
                        params![step.event().as_str(), step.number(), time],
                    )
                    .map_err(sql_err)?;
                if upgraded > 0 {
                    debug!(step = %step, timestamp, "Upgraded placeholder timestamp");
                }
            }
            Ok(())
        })
    }

    fn get_step(&self, step: &StepKey) -> Result<Option<Step>> {
        self.with_tx(|tx| {
            let row = tx
                .query_row(
                    "SELECT step_id, step_name, creation_time FROM steps
                     WHERE event_id = ?1 AND step_number = ?2",
                    params![step.event().as_str(), step.number()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(sql_err)?;
            let Some((step_id, name, time)) = row else {
                return Ok(None);
            };
            Ok(Some(Step {
                name,
                number: step.number(),
                timestamp: stored_time(time)?,
                labels: read_labels(tx, &step_id)?,
            }))
        })
    }

    fn upsert_label(&self, step: &StepKey, key: &str, value: &str) -> Result<LabelWrite> {
        self.with_tx(|tx| {
            let step_id: Option<String> = tx
                .query_row(
                    "SELECT step_id FROM steps WHERE event_id = ?1 AND step_number = ?2",
                    params![step.event().as_str(), step.number()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(sql_err)?;
            let Some(step_id) = step_id else {
                return Err(Error::NotFound(format!(
                    "step {} of event {}",
                    step.number(),
                    step.event()
                )));
            };

            // Keyed by the stored step id, not the caller's, so a step number
            // reached under another name still has one row per label key.
            let label_id = LabelKey::from_step_id(&step_id, key);
            let existed: bool = tx
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM labels WHERE label_id = ?1)",
                    [label_id.as_str()],
                    |row| row.get(0),
                )
                .map_err(sql_err)?;
            tx.execute(
                "INSERT INTO labels (label_id, step_id, key, value)
                 SELECT ?1, step_id, ?2, ?3 FROM steps WHERE step_id = ?4
                 ON CONFLICT(label_id) DO UPDATE SET value = excluded.value",
                params![label_id.as_str(), key, value, step_id],
            )
            .map_err(sql_err)?;

            Ok(if existed {
                LabelWrite::Overwritten
            } else {
                LabelWrite::Inserted
            })
        })
    }

    fn get_event(&self, key: &EventKey) -> Result<Option<Event>> {
        self.with_tx(|tx| {
            let row = tx
                .query_row(
                    "SELECT event_name, creation_time, event_result FROM events
                     WHERE event_id = ?1",
                    [key.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(sql_err)?;
            let Some((name, creation_time, result)) = row else {
                return Ok(None);
            };

            let mut stmt = tx
                .prepare_cached(
                    "SELECT step_id, step_name, step_number, creation_time FROM steps
                     WHERE event_id = ?1 ORDER BY rowid",
                )
                .map_err(sql_err)?;
            let rows = stmt
                .query_map([key.as_str()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })
                .map_err(sql_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(sql_err)?;

            let mut steps = Vec::with_capacity(rows.len());
            for (step_id, step_name, number, time) in rows {
                steps.push(Step {
                    name: step_name,
                    number,
                    timestamp: stored_time(time)?,
                    labels: read_labels(tx, &step_id)?,
                });
            }

            Ok(Some(Event {
                id: key.as_str().to_string(),
                name,
                result,
                creation_time: creation_time
                    .as_deref()
                    .map(from_calendar_time)
                    .transpose()?,
                steps,
            }))
        })
    }

    fn flush(&self) -> Result<()> {
        // Every operation commits before returning.
        self.conn.lock().as_ref().map(|_| ()).ok_or_else(closed)
    }

    fn disconnect(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| sql_err(e))?;
        info!("Disconnected relational backend");
        Ok(())
    }
}

impl Drop for RelationalAdapter {
    fn drop(&mut self) {
        if let Err(e) = self.disconnect() {
            error!(error = %e, "Failed to release relational backend");
        }
    }
}
